use crate::models::user::User;
use crate::repositories::user_repository::{RepositoryError, UserRepository};
use crate::services::clock::Clock;
use crate::services::email_service::OutgoingEmail;
use crate::services::mail_dispatcher::MailDispatcher;
use crate::services::password_hasher::{HashError, PasswordHasher};
use crate::services::token_issuer::{TokenError, TokenIssuer};
use crate::services::validation::{is_valid_password, normalize_email};
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum PasswordResetError {
    /// Wrong, expired, already used, or not belonging to the submitted user.
    /// The cases are deliberately indistinguishable.
    #[error("Invalid or expired password reset link.")]
    InvalidToken,
    #[error("Please enter a password with only numbers and text and at least 5 characters.")]
    WeakPassword,
    #[error(transparent)]
    Token(#[from] TokenError),
    #[error(transparent)]
    Hashing(#[from] HashError),
    #[error("Repository error: {0}")]
    RepositoryError(#[from] RepositoryError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResetRequestOutcome {
    /// A token was stored and the email queued.
    Issued,
    /// No account uses the address; nothing was written.
    UnknownAccount,
}

pub struct PasswordResetService {
    repository: Arc<dyn UserRepository>,
    mailer: MailDispatcher,
    clock: Arc<dyn Clock>,
    issuer: TokenIssuer,
    hasher: PasswordHasher,
    base_url: String,
}

impl PasswordResetService {
    pub fn new(
        repository: Arc<dyn UserRepository>,
        mailer: MailDispatcher,
        clock: Arc<dyn Clock>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            repository,
            mailer,
            clock,
            issuer: TokenIssuer::new(),
            hasher: PasswordHasher::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn reset_link(&self, token: &str) -> String {
        format!("{}/reset/{}", self.base_url, token)
    }

    /// Issues a fresh token for the account and queues the reset email.
    ///
    /// A second request replaces any earlier token, so only the newest link
    /// works. The email is handed to the dispatcher after the token is
    /// persisted and is never awaited.
    pub async fn request_reset(
        &self,
        email: &str,
    ) -> Result<ResetRequestOutcome, PasswordResetError> {
        let email = normalize_email(email);

        let user = match self.repository.find_by_email(&email).await? {
            Some(user) => user,
            None => {
                tracing::info!("Password reset requested for unknown account");
                return Ok(ResetRequestOutcome::UnknownAccount);
            }
        };

        let token = self.issuer.issue(self.clock.now())?;
        self.repository
            .store_reset_token(user.id, &token.value, token.expires_at_millis())
            .await?;

        tracing::info!(user_id = user.id, "Issued password reset token");

        self.mailer.dispatch(OutgoingEmail::password_reset(
            &user.email,
            &self.reset_link(&token.value),
        ));

        Ok(ResetRequestOutcome::Issued)
    }

    /// Looks up the user holding `token` while it is still unexpired.
    pub async fn validate_reset_token(&self, token: &str) -> Result<User, PasswordResetError> {
        self.repository
            .find_by_reset_token(token, self.clock.now_millis())
            .await?
            .ok_or(PasswordResetError::InvalidToken)
    }

    /// Sets a new password and consumes the token in one conditional update.
    ///
    /// Of any number of concurrent redemptions of the same token, exactly one
    /// succeeds; the rest see `InvalidToken`.
    pub async fn redeem(
        &self,
        user_id: i64,
        token: &str,
        new_password: &str,
    ) -> Result<User, PasswordResetError> {
        if !is_valid_password(new_password) {
            return Err(PasswordResetError::WeakPassword);
        }
        let new_password = new_password.trim();

        let password_hash = self.hasher.hash(new_password)?;

        let user = self
            .repository
            .redeem_reset_token(user_id, token, self.clock.now_millis(), &password_hash)
            .await?
            .ok_or(PasswordResetError::InvalidToken)?;

        tracing::info!(user_id = user.id, "Password reset completed");
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::user_repository::MockUserRepository;
    use crate::services::clock::SystemClock;
    use crate::test_utils::test_helpers::RecordingEmailService;
    use mockall::predicate::*;
    use std::time::Duration;

    fn service_with(
        repo: MockUserRepository,
    ) -> (PasswordResetService, Arc<RecordingEmailService>) {
        let recorder = Arc::new(RecordingEmailService::default());
        let (mailer, _worker) = MailDispatcher::spawn(recorder.clone(), Duration::from_secs(1));
        let service = PasswordResetService::new(
            Arc::new(repo),
            mailer,
            Arc::new(SystemClock),
            "http://shop.test/",
        );
        (service, recorder)
    }

    #[tokio::test]
    async fn test_unknown_email_writes_nothing() {
        let mut mock_repo = MockUserRepository::new();
        mock_repo
            .expect_find_by_email()
            .with(eq("nobody@b.com"))
            .times(1)
            .returning(|_| Box::pin(async move { Ok(None) }));
        mock_repo.expect_store_reset_token().times(0);

        let (service, recorder) = service_with(mock_repo);
        let outcome = service.request_reset("Nobody@B.com").await.unwrap();

        assert_eq!(outcome, ResetRequestOutcome::UnknownAccount);
        tokio::task::yield_now().await;
        assert!(recorder.sent().is_empty());
    }

    #[tokio::test]
    async fn test_weak_password_is_rejected_before_hashing() {
        let mut mock_repo = MockUserRepository::new();
        mock_repo.expect_redeem_reset_token().times(0);

        let (service, _) = service_with(mock_repo);
        let result = service.redeem(1, "token", "abc").await;

        assert!(matches!(result, Err(PasswordResetError::WeakPassword)));
    }

    #[tokio::test]
    async fn test_failed_compare_and_clear_is_invalid_token() {
        let mut mock_repo = MockUserRepository::new();
        mock_repo
            .expect_redeem_reset_token()
            .withf(|id, token, _, hash| {
                *id == 7 && token == "stale" && hash != "newpass1"
            })
            .times(1)
            .returning(|_, _, _, _| Box::pin(async move { Ok(None) }));

        let (service, _) = service_with(mock_repo);
        let result = service.redeem(7, "stale", "newpass1").await;

        assert!(matches!(result, Err(PasswordResetError::InvalidToken)));
    }

    #[tokio::test]
    async fn test_reset_link_strips_trailing_slash() {
        let (service, _) = service_with(MockUserRepository::new());
        assert_eq!(service.reset_link("abc"), "http://shop.test/reset/abc");
    }

    #[derive(Clone, Default)]
    struct LogBuffer(Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_issued_token_is_not_logged() {
        let logs = LogBuffer::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let stored_token = Arc::new(std::sync::Mutex::new(String::new()));
        let captured = stored_token.clone();
        let mut mock_repo = MockUserRepository::new();
        mock_repo.expect_find_by_email().times(1).returning(|_| {
            Box::pin(async move {
                Ok(Some(User {
                    id: 7,
                    email: "a@b.com".to_string(),
                    user_name: "Al".to_string(),
                    password_hash: "hash".to_string(),
                    reset_token: None,
                    reset_token_expires_at: None,
                    created_at: None,
                }))
            })
        });
        mock_repo
            .expect_store_reset_token()
            .times(1)
            .returning(move |_, token, _| {
                *captured.lock().unwrap() = token.to_string();
                Box::pin(async move { Ok(()) })
            });

        let (service, _) = service_with(mock_repo);
        let outcome = service.request_reset("a@b.com").await.unwrap();
        assert_eq!(outcome, ResetRequestOutcome::Issued);

        let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        let token = stored_token.lock().unwrap().clone();
        assert!(output.contains("Issued password reset token"));
        assert!(!output.contains(&token[..8]));
    }
}
