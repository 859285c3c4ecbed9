use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+$")
        .expect("email pattern is valid")
});

pub const MIN_PASSWORD_LEN: usize = 5;

/// Trims and lower-cases an address so lookups are case-insensitive.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn is_valid_email(email: &str) -> bool {
    email.len() <= 255 && EMAIL_RE.is_match(email)
}

/// At least five characters, ASCII letters and digits only.
pub fn is_valid_password(password: &str) -> bool {
    password.len() >= MIN_PASSWORD_LEN && password.chars().all(|c| c.is_ascii_alphanumeric())
}
