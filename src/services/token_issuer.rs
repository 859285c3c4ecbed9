use chrono::{DateTime, Duration, Utc};
use rand::{rngs::OsRng, RngCore};

/// Reset tokens stay valid for exactly one hour after issuance.
pub const RESET_TOKEN_TTL_SECS: i64 = 3600;

const TOKEN_BYTES: usize = 32;

#[derive(Debug, thiserror::Error)]
#[error("Secure random source unavailable: {0}")]
pub struct TokenError(String);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub value: String,
    pub expires_at: DateTime<Utc>,
}

impl IssuedToken {
    pub fn expires_at_millis(&self) -> i64 {
        self.expires_at.timestamp_millis()
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TokenIssuer;

impl TokenIssuer {
    pub fn new() -> Self {
        Self
    }

    /// 32 bytes from the operating system CSPRNG, hex encoded (64 chars).
    ///
    /// There is no fallback source: if the OS cannot provide randomness the
    /// error is returned to the caller.
    pub fn issue(&self, issued_at: DateTime<Utc>) -> Result<IssuedToken, TokenError> {
        let mut bytes = [0u8; TOKEN_BYTES];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| TokenError(e.to_string()))?;

        Ok(IssuedToken {
            value: hex::encode(bytes),
            expires_at: issued_at + Duration::seconds(RESET_TOKEN_TTL_SECS),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_is_64_hex_chars() {
        let token = TokenIssuer::new().issue(Utc::now()).unwrap();
        assert_eq!(token.value.len(), 64);
        assert!(token.value.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_tokens_are_unique() {
        let issuer = TokenIssuer::new();
        let now = Utc::now();
        let first = issuer.issue(now).unwrap();
        let second = issuer.issue(now).unwrap();
        assert_ne!(first.value, second.value);
    }

    #[test]
    fn test_expiry_is_one_hour_after_issue() {
        let issued_at = Utc::now();
        let token = TokenIssuer::new().issue(issued_at).unwrap();
        assert_eq!(
            token.expires_at_millis() - issued_at.timestamp_millis(),
            3_600_000
        );
    }
}
