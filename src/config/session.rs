use std::env;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use sha2::{Digest, Sha512};
use time::Duration;
use tower_sessions::{
    cookie::{Key, SameSite},
    service::SignedCookie,
    Expiry, SessionManagerLayer,
};
use tower_sessions_sqlx_store::SqliteStore;
use tracing::warn;

/// Signed session layer backed by the SQLite store.
pub type SessionLayer = SessionManagerLayer<SqliteStore, SignedCookie>;

const MIN_SECRET_BYTES: usize = 64;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SessionConfigError {
    #[error("Production requires HTTPS. Set FORCE_HTTPS=true")]
    HttpsRequired,
    #[error("SESSION_SECRET must be set in production")]
    MissingSecret,
    #[error("SESSION_SECRET must be at least 64 bytes in production")]
    ShortSecret,
    #[error("SESSION_SECRET looks like a placeholder value")]
    PlaceholderSecret,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub secure: bool,
    pub same_site: SameSite,
    pub expiry: Duration,
    pub name: String,
}

impl SessionConfig {
    pub fn from_env() -> Self {
        if is_production() {
            SessionConfig {
                secure: true,
                same_site: SameSite::Strict,
                expiry: Duration::hours(2),
                name: "__Host-shop-session".to_string(),
            }
        } else {
            SessionConfig {
                secure: false,
                same_site: SameSite::Lax,
                expiry: Duration::days(7),
                name: "shop-session".to_string(),
            }
        }
    }

    pub fn create_layer(&self, store: SqliteStore) -> SessionLayer {
        SessionManagerLayer::new(store)
            .with_secure(self.secure)
            .with_http_only(true)
            .with_same_site(self.same_site)
            .with_name(self.name.clone())
            .with_expiry(Expiry::OnInactivity(self.expiry))
            .with_signed(load_session_key())
    }
}

/// Refuses to start a production deployment with an unsafe cookie setup.
pub fn validate_production_config() -> Result<(), SessionConfigError> {
    if !is_production() {
        return Ok(());
    }

    if !env_flag_enabled("FORCE_HTTPS") {
        return Err(SessionConfigError::HttpsRequired);
    }

    let secret = env::var("SESSION_SECRET").map_err(|_| SessionConfigError::MissingSecret)?;
    if decode_secret_bytes(&secret).len() < MIN_SECRET_BYTES {
        return Err(SessionConfigError::ShortSecret);
    }

    let lowered = secret.to_ascii_lowercase();
    if ["example", "changeme", "default"]
        .iter()
        .any(|placeholder| lowered.contains(placeholder))
    {
        return Err(SessionConfigError::PlaceholderSecret);
    }

    Ok(())
}

pub fn is_production() -> bool {
    env::var("ENVIRONMENT")
        .map(|value| value == "production")
        .unwrap_or(false)
}

fn env_flag_enabled(key: &str) -> bool {
    env::var(key)
        .map(|value| matches!(value.as_str(), "1" | "true" | "TRUE" | "True"))
        .unwrap_or(false)
}

fn load_session_key() -> Key {
    match env::var("SESSION_SECRET") {
        Ok(secret) if !secret.is_empty() => {
            let bytes = decode_secret_bytes(&secret);
            if bytes.len() >= MIN_SECRET_BYTES {
                Key::from(&bytes[..MIN_SECRET_BYTES])
            } else {
                Key::from(Sha512::digest(&bytes).as_slice())
            }
        }
        _ => {
            warn!("SESSION_SECRET not set; generating an ephemeral session key");
            Key::generate()
        }
    }
}

fn decode_secret_bytes(secret: &str) -> Vec<u8> {
    STANDARD
        .decode(secret.as_bytes())
        .unwrap_or_else(|_| secret.as_bytes().to_vec())
}
