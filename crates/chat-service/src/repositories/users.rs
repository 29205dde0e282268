//! PostgreSQL credential store.

use super::CredentialStore;
use crate::errors::ChatError;
use crate::models::User;
use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

/// Credential store backed by the `users` table.
#[derive(Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    #[instrument(skip_all, fields(nickname = %user.nickname))]
    async fn insert_user(&self, user: &User) -> Result<(), ChatError> {
        sqlx::query(
            r#"
            INSERT INTO users (nickname, hashed_password)
            VALUES ($1, $2)
            "#,
        )
        .bind(&user.nickname)
        .bind(&user.hashed_password)
        .execute(&self.pool)
        .await
        .map_err(|e| match e.as_database_error() {
            Some(db_err) if db_err.is_unique_violation() => ChatError::UserAlreadyExists,
            _ => ChatError::Repo(format!("Failed to insert user: {e}")),
        })?;

        Ok(())
    }

    #[instrument(skip_all, fields(nickname = %nickname))]
    async fn select_user(&self, nickname: &str) -> Result<User, ChatError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT nickname, hashed_password
            FROM users
            WHERE nickname = $1
            "#,
        )
        .bind(nickname)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| ChatError::Repo(format!("Failed to fetch user: {e}")))?;

        user.ok_or(ChatError::UserNotFound)
    }
}
