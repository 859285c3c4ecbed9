use crate::repositories::user_repository::RepositoryError;
use crate::services::{PasswordResetError, UserServiceError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

/// Failures that end a request without a page of their own.
///
/// Validation and not-found outcomes are normally handled inside the handlers
/// (re-rendered form or redirect with a notice); what reaches this type is the
/// hard-failure path.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Not authorized")]
    Unauthorized,

    #[error("Invalid security token")]
    Forbidden,

    #[error("Not found")]
    NotFound,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid or expired password reset link.")]
    InvalidResetToken,

    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Validation(_) | AppError::InvalidResetToken => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::Database(_) | AppError::Session(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("Request failed: {}", self);
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        (status, message).into_response()
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Database(e) => AppError::Database(e),
            RepositoryError::NotFound => AppError::NotFound,
            RepositoryError::AlreadyExists => AppError::Internal(err.to_string()),
        }
    }
}

impl From<UserServiceError> for AppError {
    fn from(err: UserServiceError) -> Self {
        match err {
            UserServiceError::RepositoryError(e) => e.into(),
            UserServiceError::Hashing(e) => AppError::Internal(e.to_string()),
            UserServiceError::UserNotFound => AppError::NotFound,
            other => AppError::Validation(other.to_string()),
        }
    }
}

impl From<PasswordResetError> for AppError {
    fn from(err: PasswordResetError) -> Self {
        match err {
            PasswordResetError::InvalidToken => AppError::InvalidResetToken,
            PasswordResetError::WeakPassword => AppError::Validation(err.to_string()),
            PasswordResetError::RepositoryError(e) => e.into(),
            PasswordResetError::Token(e) => AppError::Internal(e.to_string()),
            PasswordResetError::Hashing(e) => AppError::Internal(e.to_string()),
        }
    }
}
