use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher as _, SaltString},
    Algorithm, Argon2, Params, PasswordVerifier, Version,
};
use once_cell::sync::Lazy;

/// Digest checked against when a login names no account.
static DUMMY_DIGEST: Lazy<Option<String>> =
    Lazy::new(|| PasswordHasher::new().hash("no-such-account").ok());

#[derive(Debug, thiserror::Error)]
#[error("Password hashing failed: {0}")]
pub struct HashError(String);

/// Salted one-way password hashing with a fixed work factor.
///
/// Every digest is produced with the same Argon2id parameters, so the cost of
/// a hash never depends on configuration.
#[derive(Clone)]
pub struct PasswordHasher {
    argon2: Argon2<'static>,
}

impl PasswordHasher {
    pub fn new() -> Self {
        Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, Params::DEFAULT),
        }
    }

    pub fn hash(&self, plaintext: &str) -> Result<String, HashError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(plaintext.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| HashError(e.to_string()))
    }

    /// Returns false on mismatch and on digests that fail to parse.
    pub fn verify(&self, plaintext: &str, digest: &str) -> bool {
        match PasswordHash::new(digest) {
            Ok(parsed_hash) => self
                .argon2
                .verify_password(plaintext.as_bytes(), &parsed_hash)
                .is_ok(),
            Err(_) => false,
        }
    }

    /// Does the work of a real `verify` without an account to check against.
    /// Always a mismatch.
    pub fn verify_dummy(&self, plaintext: &str) -> bool {
        if let Some(digest) = DUMMY_DIGEST.as_deref() {
            let _ = self.verify(plaintext, digest);
        }
        false
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new()
    }
}
