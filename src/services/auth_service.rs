use crate::models::user::User;
use crate::repositories::user_repository::UserRepository;
use crate::services::password_hasher::PasswordHasher;
use crate::services::validation::{is_valid_email, is_valid_password, normalize_email};
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum AuthServiceError {
    #[error("Please enter a valid email address.")]
    InvalidEmail,
    #[error("Password has to be valid.")]
    InvalidPassword,
    #[error("Invalid email or password.")]
    InvalidCredentials,
    #[error("Repository error: {0}")]
    RepositoryError(#[from] crate::repositories::user_repository::RepositoryError),
}

pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

pub struct AuthService {
    user_repository: Arc<dyn UserRepository>,
    hasher: PasswordHasher,
}

impl AuthService {
    pub fn new(user_repository: Arc<dyn UserRepository>) -> Self {
        Self {
            user_repository,
            hasher: PasswordHasher::new(),
        }
    }

    pub async fn authenticate(&self, request: LoginRequest) -> Result<User, AuthServiceError> {
        let email = normalize_email(&request.email);
        if !is_valid_email(&email) {
            return Err(AuthServiceError::InvalidEmail);
        }
        if !is_valid_password(&request.password) {
            return Err(AuthServiceError::InvalidPassword);
        }
        let password = request.password.trim();

        // Unknown email and wrong password are reported the same way and cost
        // the same hash work
        let Some(user) = self.user_repository.find_by_email(&email).await? else {
            self.hasher.verify_dummy(password);
            return Err(AuthServiceError::InvalidCredentials);
        };

        if !self.hasher.verify(password, &user.password_hash) {
            return Err(AuthServiceError::InvalidCredentials);
        }

        Ok(user)
    }
}
