use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub user_name: String,
    pub password_hash: String,
    pub reset_token: Option<String>,
    /// Unix milliseconds; set together with `reset_token`.
    pub reset_token_expires_at: Option<i64>,
    pub created_at: Option<String>,
}

impl User {
    pub fn has_pending_reset(&self) -> bool {
        self.reset_token.is_some() && self.reset_token_expires_at.is_some()
    }
}
