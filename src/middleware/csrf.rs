use crate::error::AppError;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::{debug, warn};
use uuid::Uuid;

pub const CSRF_TOKEN_KEY: &str = "csrf_token";

/// Form tokens older than this are refused and replaced.
const CSRF_TOKEN_MAX_AGE_SECS: i64 = 86_400;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CsrfToken {
    pub value: String,
    pub created_at: i64,
}

impl CsrfToken {
    pub fn new() -> Self {
        Self {
            value: Uuid::new_v4().to_string(),
            created_at: chrono::Utc::now().timestamp(),
        }
    }

    pub fn is_expired(&self) -> bool {
        chrono::Utc::now().timestamp() - self.created_at > CSRF_TOKEN_MAX_AGE_SECS
    }
}

impl Default for CsrfToken {
    fn default() -> Self {
        Self::new()
    }
}

pub async fn generate_csrf_token(
    session: &Session,
) -> Result<String, tower_sessions::session::Error> {
    let token = CsrfToken::new();
    let value = token.value.clone();
    session.insert(CSRF_TOKEN_KEY, token).await?;
    debug!("Generated new CSRF token");
    Ok(value)
}

/// Token to embed in the next rendered form.
pub async fn get_or_create_csrf_token(
    session: &Session,
) -> Result<String, tower_sessions::session::Error> {
    match session.get::<CsrfToken>(CSRF_TOKEN_KEY).await? {
        Some(existing) if !existing.is_expired() => Ok(existing.value),
        _ => generate_csrf_token(session).await,
    }
}

/// Checks the hidden `csrf_token` field of a submitted form.
///
/// A match rotates the stored token, so each rendered form is good for one
/// submission.
pub async fn validate_csrf_form_field(session: &Session, form_token: &str) -> Result<(), AppError> {
    let stored = session.get::<CsrfToken>(CSRF_TOKEN_KEY).await?;

    let stored = match stored {
        Some(token) if !token.is_expired() => token,
        Some(_) => {
            warn!("CSRF token expired during form validation");
            return Err(AppError::Forbidden);
        }
        None => {
            warn!("No CSRF token in session for form validation");
            return Err(AppError::Forbidden);
        }
    };

    if form_token != stored.value {
        warn!("CSRF form token mismatch");
        return Err(AppError::Forbidden);
    }

    generate_csrf_token(session).await?;
    Ok(())
}
