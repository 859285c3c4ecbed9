use crate::auth::session::{take_flash, FlashKind, SessionContext, SessionUser};
use crate::error::AppError;
use crate::middleware::csrf::get_or_create_csrf_token;
use tower_sessions::Session;

/// Data every page layout needs: who is logged in, pending notices and the
/// form token.
pub struct PageContext {
    pub user: Option<SessionUser>,
    pub csrf_token: String,
    pub error: Option<String>,
    pub info: Option<String>,
}

impl PageContext {
    /// Loads the identity and consumes any flashed notices.
    pub async fn load(session: &Session) -> Result<Self, AppError> {
        let context = SessionContext::load(session).await?;
        Ok(Self {
            user: context.identity().cloned(),
            csrf_token: get_or_create_csrf_token(session).await?,
            error: take_flash(session, FlashKind::Error).await,
            info: take_flash(session, FlashKind::Info).await,
        })
    }

    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error = Some(message.into());
        self
    }
}
