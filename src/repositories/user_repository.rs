use crate::models::user::User;
use async_trait::async_trait;
use sqlx::SqlitePool;

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("User not found")]
    NotFound,
    #[error("User already exists")]
    AlreadyExists,
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

const USER_COLUMNS: &str =
    "id, email, user_name, password_hash, reset_token, reset_token_expires_at, created_at";

/// Credential store for user records.
///
/// Every timestamp argument is in unix milliseconds.
#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait UserRepository: Send + Sync {
    async fn create_user(
        &self,
        email: &str,
        user_name: &str,
        password_hash: &str,
    ) -> RepositoryResult<User>;
    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<User>>;
    async fn find_by_id(&self, id: i64) -> RepositoryResult<Option<User>>;
    /// Returns the user holding `token` only while its expiry is strictly after `now`.
    async fn find_by_reset_token(&self, token: &str, now: i64) -> RepositoryResult<Option<User>>;
    async fn store_reset_token(&self, id: i64, token: &str, expires_at: i64)
        -> RepositoryResult<()>;
    /// Compare-and-clear: sets the new hash and clears the reset fields in one
    /// statement, only if `id`, `token` and the unexpired window all match.
    async fn redeem_reset_token(
        &self,
        id: i64,
        token: &str,
        now: i64,
        password_hash: &str,
    ) -> RepositoryResult<Option<User>>;
    async fn update_profile(
        &self,
        id: i64,
        user_name: &str,
        password_hash: Option<String>,
    ) -> RepositoryResult<User>;
    async fn update_password(&self, id: i64, password_hash: &str) -> RepositoryResult<()>;
    async fn delete_user(&self, id: i64) -> RepositoryResult<()>;
    async fn list_users(
        &self,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> RepositoryResult<Vec<User>>;
}

pub struct SqliteUserRepository {
    pool: SqlitePool,
}

impl SqliteUserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for SqliteUserRepository {
    async fn create_user(
        &self,
        email: &str,
        user_name: &str,
        password_hash: &str,
    ) -> RepositoryResult<User> {
        let query = format!(
            "INSERT INTO users (email, user_name, password_hash) VALUES (?, ?, ?) RETURNING {}",
            USER_COLUMNS
        );
        let result = sqlx::query_as::<_, User>(&query)
            .bind(email)
            .bind(user_name)
            .bind(password_hash)
            .fetch_one(&self.pool)
            .await;

        match result {
            Ok(user) => Ok(user),
            Err(e) => {
                if e.to_string().contains("UNIQUE") {
                    Err(RepositoryError::AlreadyExists)
                } else {
                    Err(RepositoryError::Database(e))
                }
            }
        }
    }

    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<User>> {
        let query = format!("SELECT {} FROM users WHERE email = ?", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    async fn find_by_id(&self, id: i64) -> RepositoryResult<Option<User>> {
        let query = format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    async fn find_by_reset_token(&self, token: &str, now: i64) -> RepositoryResult<Option<User>> {
        let query = format!(
            "SELECT {} FROM users WHERE reset_token = ? AND reset_token_expires_at > ?",
            USER_COLUMNS
        );
        let user = sqlx::query_as::<_, User>(&query)
            .bind(token)
            .bind(now)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    async fn store_reset_token(
        &self,
        id: i64,
        token: &str,
        expires_at: i64,
    ) -> RepositoryResult<()> {
        let result = sqlx::query(
            "UPDATE users SET reset_token = ?, reset_token_expires_at = ? WHERE id = ?",
        )
        .bind(token)
        .bind(expires_at)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn redeem_reset_token(
        &self,
        id: i64,
        token: &str,
        now: i64,
        password_hash: &str,
    ) -> RepositoryResult<Option<User>> {
        let query = format!(
            r#"
            UPDATE users
            SET password_hash = ?, reset_token = NULL, reset_token_expires_at = NULL
            WHERE id = ?
              AND reset_token = ?
              AND reset_token_expires_at > ?
            RETURNING {}
            "#,
            USER_COLUMNS
        );
        let user = sqlx::query_as::<_, User>(&query)
            .bind(password_hash)
            .bind(id)
            .bind(token)
            .bind(now)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    async fn update_profile(
        &self,
        id: i64,
        user_name: &str,
        password_hash: Option<String>,
    ) -> RepositoryResult<User> {
        let query = format!(
            r#"
            UPDATE users
            SET user_name = ?, password_hash = COALESCE(?, password_hash)
            WHERE id = ?
            RETURNING {}
            "#,
            USER_COLUMNS
        );
        sqlx::query_as::<_, User>(&query)
            .bind(user_name)
            .bind(password_hash)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    async fn update_password(&self, id: i64, password_hash: &str) -> RepositoryResult<()> {
        let result = sqlx::query(
            "UPDATE users SET password_hash = ?, reset_token = NULL, reset_token_expires_at = NULL WHERE id = ?",
        )
            .bind(password_hash)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn delete_user(&self, id: i64) -> RepositoryResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn list_users(
        &self,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> RepositoryResult<Vec<User>> {
        let limit = limit.unwrap_or(100);
        let offset = offset.unwrap_or(0);

        let query = format!(
            "SELECT {} FROM users ORDER BY id ASC LIMIT ? OFFSET ?",
            USER_COLUMNS
        );
        let users = sqlx::query_as::<_, User>(&query)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        Ok(users)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::create_test_pool;

    async fn repo_with_user() -> (SqliteUserRepository, User) {
        let repo = SqliteUserRepository::new(create_test_pool().await);
        let user = repo.create_user("a@b.com", "Al", "hash").await.unwrap();
        (repo, user)
    }

    #[tokio::test]
    async fn test_duplicate_email_is_already_exists() {
        let (repo, _) = repo_with_user().await;
        let result = repo.create_user("a@b.com", "Other", "hash").await;
        assert!(matches!(result, Err(RepositoryError::AlreadyExists)));
    }

    #[tokio::test]
    async fn test_reset_token_lookup_respects_expiry() {
        let (repo, user) = repo_with_user().await;
        repo.store_reset_token(user.id, "tok", 1_000).await.unwrap();

        assert!(repo.find_by_reset_token("tok", 999).await.unwrap().is_some());
        assert!(repo.find_by_reset_token("tok", 1_000).await.unwrap().is_none());
        assert!(repo.find_by_reset_token("other", 0).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_redeem_clears_token_once() {
        let (repo, user) = repo_with_user().await;
        repo.store_reset_token(user.id, "tok", 1_000).await.unwrap();

        let redeemed = repo
            .redeem_reset_token(user.id, "tok", 500, "new-hash")
            .await
            .unwrap()
            .expect("first redemption succeeds");
        assert_eq!(redeemed.password_hash, "new-hash");
        assert!(!redeemed.has_pending_reset());

        let again = repo
            .redeem_reset_token(user.id, "tok", 500, "other-hash")
            .await
            .unwrap();
        assert!(again.is_none());
    }

    #[tokio::test]
    async fn test_redeem_requires_matching_user() {
        let (repo, user) = repo_with_user().await;
        repo.store_reset_token(user.id, "tok", 1_000).await.unwrap();

        let result = repo
            .redeem_reset_token(user.id + 1, "tok", 500, "new-hash")
            .await
            .unwrap();
        assert!(result.is_none());
        assert!(repo.find_by_reset_token("tok", 500).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_update_profile_keeps_hash_without_new_password() {
        let (repo, user) = repo_with_user().await;

        let updated = repo.update_profile(user.id, "Alice", None).await.unwrap();
        assert_eq!(updated.user_name, "Alice");
        assert_eq!(updated.password_hash, "hash");

        let updated = repo
            .update_profile(user.id, "Alice", Some("new-hash".to_string()))
            .await
            .unwrap();
        assert_eq!(updated.password_hash, "new-hash");
    }

    #[tokio::test]
    async fn test_update_password_discards_pending_reset() {
        let (repo, user) = repo_with_user().await;
        repo.store_reset_token(user.id, "tok", 1_000).await.unwrap();

        repo.update_password(user.id, "admin-hash").await.unwrap();

        let stored = repo.find_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(stored.password_hash, "admin-hash");
        assert!(!stored.has_pending_reset());
    }

    #[tokio::test]
    async fn test_delete_missing_user_is_not_found() {
        let repo = SqliteUserRepository::new(create_test_pool().await);
        assert!(matches!(
            repo.delete_user(42).await,
            Err(RepositoryError::NotFound)
        ));
    }
}
