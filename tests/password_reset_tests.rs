use chrono::{Duration, TimeZone, Utc};
use shopauth::{
    repositories::{SqliteUserRepository, UserRepository},
    services::{
        Clock, EmailService, MailDispatcher, PasswordHasher, PasswordResetError,
        PasswordResetService, ResetRequestOutcome, RESET_TOKEN_TTL_SECS,
    },
    test_utils::test_helpers::{self, FailingEmailService, ManualClock, RecordingEmailService},
};
use sqlx::SqlitePool;
use std::sync::Arc;

struct Harness {
    service: PasswordResetService,
    repository: Arc<SqliteUserRepository>,
    clock: Arc<ManualClock>,
    user_id: i64,
}

async fn harness_with(pool: SqlitePool, email_service: Arc<dyn EmailService>) -> Harness {
    let user_id = test_helpers::insert_test_user(&pool, "a@b.com", "Al", "oldpass1")
        .await
        .unwrap();
    let repository = Arc::new(SqliteUserRepository::new(pool));
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap(),
    ));
    let (mailer, _worker) =
        MailDispatcher::spawn(email_service, std::time::Duration::from_secs(1));

    Harness {
        service: PasswordResetService::new(
            repository.clone(),
            mailer,
            clock.clone(),
            "http://shop.test",
        ),
        repository,
        clock,
        user_id,
    }
}

async fn harness() -> (Harness, Arc<RecordingEmailService>) {
    let pool = test_helpers::create_test_db().await.unwrap();
    let recorder = Arc::new(RecordingEmailService::default());
    (harness_with(pool, recorder.clone()).await, recorder)
}

async fn wait_for_mail(recorder: &RecordingEmailService, count: usize) {
    for _ in 0..100 {
        if recorder.sent().len() >= count {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
}

impl Harness {
    async fn issue_token(&self) -> String {
        let outcome = self.service.request_reset("a@b.com").await.unwrap();
        assert_eq!(outcome, ResetRequestOutcome::Issued);

        self.repository
            .find_by_id(self.user_id)
            .await
            .unwrap()
            .and_then(|user| user.reset_token)
            .expect("token stored")
    }
}

#[tokio::test]
async fn test_unknown_email_leaves_store_unchanged() {
    let (h, recorder) = harness().await;
    let before = h.repository.list_users(None, None).await.unwrap();

    let outcome = h.service.request_reset("nobody@b.com").await.unwrap();

    assert_eq!(outcome, ResetRequestOutcome::UnknownAccount);
    let after = h.repository.list_users(None, None).await.unwrap();
    assert_eq!(before.len(), after.len());
    assert!(after.iter().all(|user| user.reset_token.is_none()));
    tokio::task::yield_now().await;
    assert!(recorder.sent().is_empty());
}

#[tokio::test]
async fn test_issued_token_is_hex_and_mailed() {
    let (h, recorder) = harness().await;

    let token = h.issue_token().await;
    assert_eq!(token.len(), 64);
    assert!(token.chars().all(|c| c.is_ascii_hexdigit()));

    let stored = h.repository.find_by_id(h.user_id).await.unwrap().unwrap();
    let issued_at = h.clock.now_millis();
    assert_eq!(
        stored.reset_token_expires_at,
        Some(issued_at + RESET_TOKEN_TTL_SECS * 1000)
    );

    wait_for_mail(&recorder, 1).await;
    let sent = recorder.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "a@b.com");
    assert_eq!(sent[0].subject, "Password reset");
    assert!(sent[0]
        .html_body
        .contains(&format!("http://shop.test/reset/{}", token)));
}

#[tokio::test]
async fn test_token_expires_after_exactly_one_hour() {
    let (h, _) = harness().await;
    let token = h.issue_token().await;

    h.clock.advance(Duration::seconds(RESET_TOKEN_TTL_SECS - 1));
    let user = h.service.validate_reset_token(&token).await.unwrap();
    assert_eq!(user.id, h.user_id);

    h.clock.advance(Duration::seconds(1));
    assert!(matches!(
        h.service.validate_reset_token(&token).await,
        Err(PasswordResetError::InvalidToken)
    ));
    assert!(matches!(
        h.service.redeem(h.user_id, &token, "newpass1").await,
        Err(PasswordResetError::InvalidToken)
    ));
}

#[tokio::test]
async fn test_wrong_token_is_indistinguishable_from_expired() {
    let (h, _) = harness().await;
    h.issue_token().await;

    let result = h.service.validate_reset_token(&"0".repeat(64)).await;
    assert!(matches!(result, Err(PasswordResetError::InvalidToken)));
}

#[tokio::test]
async fn test_redeem_is_single_use() {
    let (h, _) = harness().await;
    let token = h.issue_token().await;

    let user = h.service.redeem(h.user_id, &token, "newpass1").await.unwrap();
    assert!(user.reset_token.is_none());
    assert!(user.reset_token_expires_at.is_none());
    assert!(PasswordHasher::new().verify("newpass1", &user.password_hash));

    let second = h.service.redeem(h.user_id, &token, "newpass2").await;
    assert!(matches!(second, Err(PasswordResetError::InvalidToken)));

    let stored = h.repository.find_by_id(h.user_id).await.unwrap().unwrap();
    assert!(PasswordHasher::new().verify("newpass1", &stored.password_hash));
}

#[tokio::test]
async fn test_redeem_for_other_user_fails() {
    let (h, _) = harness().await;
    let token = h.issue_token().await;

    let result = h.service.redeem(h.user_id + 1, &token, "newpass1").await;
    assert!(matches!(result, Err(PasswordResetError::InvalidToken)));
    assert!(h.service.validate_reset_token(&token).await.is_ok());
}

#[tokio::test]
async fn test_new_request_replaces_old_token() {
    let (h, _) = harness().await;
    let first = h.issue_token().await;
    let second = h.issue_token().await;

    assert_ne!(first, second);
    assert!(h.service.validate_reset_token(&first).await.is_err());
    assert!(h.service.validate_reset_token(&second).await.is_ok());
}

#[tokio::test]
async fn test_concurrent_redemptions_succeed_exactly_once() {
    let (pool, _db_file) = test_helpers::create_test_db_file(4).await.unwrap();
    let h = harness_with(pool, Arc::new(RecordingEmailService::default())).await;
    let token = h.issue_token().await;

    let (first, second) = tokio::join!(
        h.service.redeem(h.user_id, &token, "racer111"),
        h.service.redeem(h.user_id, &token, "racer222"),
    );

    let successes = [first.is_ok(), second.is_ok()]
        .iter()
        .filter(|ok| **ok)
        .count();
    assert_eq!(successes, 1);
    for result in [first, second] {
        if let Err(err) = result {
            assert!(matches!(err, PasswordResetError::InvalidToken));
        }
    }
}

#[tokio::test]
async fn test_mail_failure_does_not_roll_back_token() {
    let pool = test_helpers::create_test_db().await.unwrap();
    let h = harness_with(pool, Arc::new(FailingEmailService)).await;

    let token = h.issue_token().await;
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    assert!(h.service.validate_reset_token(&token).await.is_ok());
}

#[tokio::test]
async fn test_weak_new_password_keeps_token() {
    let (h, _) = harness().await;
    let token = h.issue_token().await;

    let result = h.service.redeem(h.user_id, &token, "no!").await;
    assert!(matches!(result, Err(PasswordResetError::WeakPassword)));
    assert!(h.service.validate_reset_token(&token).await.is_ok());
}

#[tokio::test]
async fn test_padded_new_password_is_rejected() {
    let (h, _) = harness().await;
    let token = h.issue_token().await;

    let result = h.service.redeem(h.user_id, &token, " newpass1").await;
    assert!(matches!(result, Err(PasswordResetError::WeakPassword)));
    assert!(h.service.validate_reset_token(&token).await.is_ok());
}
