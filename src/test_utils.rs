pub mod test_helpers {
    use crate::services::clock::Clock;
    use crate::services::email_service::{EmailError, EmailService, OutgoingEmail};
    use async_trait::async_trait;
    use chrono::{DateTime, Duration, Utc};
    use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
    use std::sync::Mutex;
    use tempfile::NamedTempFile;

    /// Create a new in-memory SQLite database for testing
    pub async fn create_test_db() -> Result<SqlitePool, sqlx::Error> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(":memory:")
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(pool)
    }

    /// Create a temporary file-based SQLite database for testing
    /// Useful when several connections must see the same data
    pub async fn create_test_db_file(
        max_connections: u32,
    ) -> Result<(SqlitePool, NamedTempFile), sqlx::Error> {
        let temp_file = NamedTempFile::new().map_err(sqlx::Error::Io)?;
        let db_path = temp_file
            .path()
            .to_str()
            .ok_or_else(|| sqlx::Error::Configuration("Invalid database path".into()))?;
        let database_url = format!("sqlite://{}", db_path);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(&database_url)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok((pool, temp_file))
    }

    /// Insert a test user with hashed password
    pub async fn insert_test_user(
        pool: &SqlitePool,
        email: &str,
        user_name: &str,
        password: &str,
    ) -> Result<i64, sqlx::Error> {
        let password_hash = crate::services::password_hasher::PasswordHasher::new()
            .hash(password)
            .map_err(|e| sqlx::Error::Configuration(e.to_string().into()))?;

        let result =
            sqlx::query("INSERT INTO users (email, user_name, password_hash) VALUES (?, ?, ?)")
                .bind(email)
                .bind(user_name)
                .bind(password_hash)
                .execute(pool)
                .await?;

        Ok(result.last_insert_rowid())
    }

    /// Captures every email instead of sending it.
    #[derive(Default)]
    pub struct RecordingEmailService {
        sent: Mutex<Vec<OutgoingEmail>>,
        delay: Option<std::time::Duration>,
    }

    impl RecordingEmailService {
        pub fn with_delay(delay: std::time::Duration) -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                delay: Some(delay),
            }
        }

        pub fn sent(&self) -> Vec<OutgoingEmail> {
            self.sent
                .lock()
                .map(|sent| sent.clone())
                .unwrap_or_default()
        }
    }

    #[async_trait]
    impl EmailService for RecordingEmailService {
        async fn send(&self, email: &OutgoingEmail) -> Result<(), EmailError> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if let Ok(mut sent) = self.sent.lock() {
                sent.push(email.clone());
            }
            Ok(())
        }
    }

    /// Every send fails.
    pub struct FailingEmailService;

    #[async_trait]
    impl EmailService for FailingEmailService {
        async fn send(&self, _email: &OutgoingEmail) -> Result<(), EmailError> {
            Err(EmailError::SendFailed("connection refused".to_string()))
        }
    }

    /// Clock that only moves when told to.
    pub struct ManualClock {
        now: Mutex<DateTime<Utc>>,
    }

    impl ManualClock {
        pub fn new(start: DateTime<Utc>) -> Self {
            Self {
                now: Mutex::new(start),
            }
        }

        pub fn advance(&self, by: Duration) {
            if let Ok(mut now) = self.now.lock() {
                *now += by;
            }
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            self.now.lock().map(|now| *now).unwrap_or_else(|_| Utc::now())
        }
    }
}

// Note: This is test-only code. Panic on error is acceptable in tests.
#[cfg(test)]
pub async fn create_test_pool() -> sqlx::SqlitePool {
    match test_helpers::create_test_db().await {
        Ok(pool) => pool,
        Err(e) => panic!("Failed to create test pool: {}", e),
    }
}
