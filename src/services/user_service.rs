use crate::models::user::User;
use crate::repositories::user_repository::{RepositoryError, UserRepository};
use crate::services::password_hasher::{HashError, PasswordHasher};
use crate::services::validation::{is_valid_email, is_valid_password, normalize_email};
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    #[error("Please enter a valid email.")]
    InvalidEmail,
    #[error("Please enter a password with only numbers and text and at least 5 characters.")]
    WeakPassword,
    #[error("Passwords have to match!")]
    PasswordMismatch,
    #[error("E-Mail exists already, please pick a different one.")]
    EmailTaken,
    #[error("No account with that userID found.")]
    UserNotFound,
    #[error("You cannot change the email. This is a demo.")]
    EmailImmutable,
    #[error("Please enter the existing password.")]
    ExistingPasswordRequired,
    #[error("Please enter a new password.")]
    NewPasswordRequired,
    #[error("Wrong existing password.")]
    WrongExistingPassword,
    #[error("Passwords have to be different!")]
    PasswordUnchanged,
    #[error(transparent)]
    Hashing(#[from] HashError),
    #[error("Repository error: {0}")]
    RepositoryError(#[from] RepositoryError),
}

impl UserServiceError {
    /// True for errors caused by the submitted input rather than the server.
    pub fn is_user_facing(&self) -> bool {
        !matches!(
            self,
            UserServiceError::Hashing(_) | UserServiceError::RepositoryError(_)
        )
    }
}

pub struct CreateUserRequest {
    pub email: String,
    pub user_name: String,
    pub password: String,
    pub password_confirm: Option<String>,
}

pub struct UpdatePasswordRequest {
    pub user_id: i64,
    pub new_password: String,
    pub new_password_confirm: Option<String>,
}

/// A profile edit submission. `email` is the value the form posted back and
/// must equal the stored address.
pub struct UpdateProfileRequest {
    pub user_id: i64,
    pub email: String,
    pub user_name: String,
    pub password: Option<String>,
    pub new_password: Option<String>,
}

pub struct UserService {
    repository: Arc<dyn UserRepository>,
    hasher: PasswordHasher,
}

impl UserService {
    pub fn new(repository: Arc<dyn UserRepository>) -> Self {
        Self {
            repository,
            hasher: PasswordHasher::new(),
        }
    }

    pub async fn create_user(&self, request: CreateUserRequest) -> Result<User, UserServiceError> {
        let email = normalize_email(&request.email);
        if !is_valid_email(&email) {
            return Err(UserServiceError::InvalidEmail);
        }

        if self.repository.find_by_email(&email).await?.is_some() {
            return Err(UserServiceError::EmailTaken);
        }

        if !is_valid_password(&request.password) {
            return Err(UserServiceError::WeakPassword);
        }

        if let Some(ref confirm) = request.password_confirm {
            if request.password != *confirm {
                return Err(UserServiceError::PasswordMismatch);
            }
        }

        let password_hash = self.hasher.hash(&request.password)?;

        match self
            .repository
            .create_user(&email, request.user_name.trim(), &password_hash)
            .await
        {
            Ok(user) => Ok(user),
            Err(RepositoryError::AlreadyExists) => Err(UserServiceError::EmailTaken),
            Err(e) => Err(UserServiceError::RepositoryError(e)),
        }
    }

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, UserServiceError> {
        Ok(self
            .repository
            .find_by_email(&normalize_email(email))
            .await?)
    }

    pub async fn find_user_by_id(&self, id: i64) -> Result<Option<User>, UserServiceError> {
        Ok(self.repository.find_by_id(id).await?)
    }

    pub async fn list_users(
        &self,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<User>, UserServiceError> {
        Ok(self.repository.list_users(limit, offset).await?)
    }

    pub async fn delete_user(&self, id: i64) -> Result<(), UserServiceError> {
        match self.repository.delete_user(id).await {
            Ok(()) => Ok(()),
            Err(RepositoryError::NotFound) => Err(UserServiceError::UserNotFound),
            Err(e) => Err(UserServiceError::RepositoryError(e)),
        }
    }

    /// Administrative password change; no knowledge of the old password needed.
    pub async fn update_password(
        &self,
        request: UpdatePasswordRequest,
    ) -> Result<(), UserServiceError> {
        if let Some(ref confirm) = request.new_password_confirm {
            if request.new_password != *confirm {
                return Err(UserServiceError::PasswordMismatch);
            }
        }

        if !is_valid_password(&request.new_password) {
            return Err(UserServiceError::WeakPassword);
        }

        let password_hash = self.hasher.hash(&request.new_password)?;

        match self
            .repository
            .update_password(request.user_id, &password_hash)
            .await
        {
            Ok(()) => Ok(()),
            Err(RepositoryError::NotFound) => Err(UserServiceError::UserNotFound),
            Err(e) => Err(UserServiceError::RepositoryError(e)),
        }
    }

    /// Checks the field combination of a profile edit before anything is loaded.
    pub fn validate_profile_form(
        password: Option<&str>,
        new_password: Option<&str>,
    ) -> Result<(), UserServiceError> {
        let password = password.unwrap_or("");
        let new_password = new_password.map(str::trim).unwrap_or("");

        if !new_password.is_empty() && password.is_empty() {
            return Err(UserServiceError::ExistingPasswordRequired);
        }
        if new_password.is_empty() && !password.is_empty() {
            return Err(UserServiceError::NewPasswordRequired);
        }
        if !new_password.is_empty() && !is_valid_password(new_password) {
            return Err(UserServiceError::WeakPassword);
        }
        Ok(())
    }

    /// Updates the display name and, when a new password is supplied, the
    /// password. The email address can never change here.
    pub async fn update_profile(
        &self,
        request: UpdateProfileRequest,
    ) -> Result<User, UserServiceError> {
        Self::validate_profile_form(
            request.password.as_deref(),
            request.new_password.as_deref(),
        )?;

        let user = self
            .repository
            .find_by_id(request.user_id)
            .await?
            .ok_or(UserServiceError::UserNotFound)?;

        if normalize_email(&request.email) != user.email {
            return Err(UserServiceError::EmailImmutable);
        }

        let new_password = request
            .new_password
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty());

        let password_hash = match new_password {
            Some(new_password) => {
                let existing = request.password.as_deref().unwrap_or("");
                if !self.hasher.verify(existing, &user.password_hash) {
                    return Err(UserServiceError::WrongExistingPassword);
                }
                if new_password == existing {
                    return Err(UserServiceError::PasswordUnchanged);
                }
                Some(self.hasher.hash(new_password)?)
            }
            None => None,
        };

        match self
            .repository
            .update_profile(user.id, request.user_name.trim(), password_hash)
            .await
        {
            Ok(user) => Ok(user),
            Err(RepositoryError::NotFound) => Err(UserServiceError::UserNotFound),
            Err(e) => Err(UserServiceError::RepositoryError(e)),
        }
    }

    pub fn verify_password(&self, password: &str, password_hash: &str) -> bool {
        self.hasher.verify(password, password_hash)
    }
}
