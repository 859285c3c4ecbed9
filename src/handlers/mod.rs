pub mod home_handlers;
pub mod page_context;
pub mod password_reset_handlers;
pub mod profile_handlers;

pub use home_handlers::index_handler;
pub use password_reset_handlers::{
    new_password_handler, new_password_page, request_reset_handler, reset_page,
};
pub use profile_handlers::{edit_user_handler, edit_user_page};
