pub mod guard;
pub mod handlers;
pub mod session;

pub use guard::{authorize, Authorization};
pub use session::{SessionContext, SessionUser};
