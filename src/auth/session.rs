use crate::models::User;
use serde::{Deserialize, Serialize};
use tower_sessions::{session, Session};

const LOGGED_IN_KEY: &str = "is_logged_in";
const USER_KEY: &str = "user";
const FLASH_ERROR_KEY: &str = "flash_error";
const FLASH_INFO_KEY: &str = "flash_info";

/// Snapshot of the authenticated user cached in the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: i64,
    pub email: String,
    pub user_name: String,
}

impl From<&User> for SessionUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            user_name: user.user_name.clone(),
        }
    }
}

/// Explicit view of the per-request session state.
///
/// Handlers load it, pass it to the operations that need an identity, and
/// write back whatever the operation returned. Nothing else touches the
/// `is_logged_in` / `user` keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionContext {
    identity: Option<SessionUser>,
}

impl SessionContext {
    pub fn anonymous() -> Self {
        Self { identity: None }
    }

    pub fn logged_in(user: SessionUser) -> Self {
        Self {
            identity: Some(user),
        }
    }

    /// An identity exists only when the flag is set and a snapshot is cached.
    pub async fn load(session: &Session) -> Result<Self, session::Error> {
        let logged_in = session
            .get::<bool>(LOGGED_IN_KEY)
            .await?
            .unwrap_or(false);
        if !logged_in {
            return Ok(Self::anonymous());
        }

        Ok(Self {
            identity: session.get::<SessionUser>(USER_KEY).await?,
        })
    }

    pub async fn store(&self, session: &Session) -> Result<(), session::Error> {
        match &self.identity {
            Some(user) => {
                session.insert(LOGGED_IN_KEY, true).await?;
                session.insert(USER_KEY, user).await?;
            }
            None => {
                session.remove::<bool>(LOGGED_IN_KEY).await?;
                session.remove::<SessionUser>(USER_KEY).await?;
            }
        }
        Ok(())
    }

    pub fn identity(&self) -> Option<&SessionUser> {
        self.identity.as_ref()
    }

    pub fn is_logged_in(&self) -> bool {
        self.identity.is_some()
    }

    /// Context carrying a refreshed snapshot of the same user.
    pub fn with_user(&self, user: &User) -> Self {
        Self::logged_in(SessionUser::from(user))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashKind {
    Error,
    Info,
}

impl FlashKind {
    fn key(self) -> &'static str {
        match self {
            FlashKind::Error => FLASH_ERROR_KEY,
            FlashKind::Info => FLASH_INFO_KEY,
        }
    }
}

/// Stores a one-shot notice for the next rendered page.
pub async fn flash(session: &Session, kind: FlashKind, message: &str) {
    if let Err(e) = session.insert(kind.key(), message).await {
        tracing::warn!("Failed to store flash message: {}", e);
    }
}

/// Reads and clears a notice.
pub async fn take_flash(session: &Session, kind: FlashKind) -> Option<String> {
    session.remove::<String>(kind.key()).await.ok().flatten()
}
