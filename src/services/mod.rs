pub mod auth_service;
pub mod clock;
pub mod email_service;
pub mod mail_dispatcher;
pub mod password_hasher;
pub mod password_reset_service;
pub mod token_issuer;
pub mod user_service;
pub mod validation;

pub use auth_service::{AuthService, AuthServiceError, LoginRequest};
pub use clock::{Clock, SystemClock};
pub use email_service::{create_email_service, EmailError, EmailService, OutgoingEmail};
pub use mail_dispatcher::MailDispatcher;
pub use password_hasher::PasswordHasher;
pub use password_reset_service::{PasswordResetError, PasswordResetService, ResetRequestOutcome};
pub use token_issuer::{TokenIssuer, RESET_TOKEN_TTL_SECS};
pub use user_service::{UserService, UserServiceError};
