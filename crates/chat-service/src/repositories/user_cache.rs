//! Redis credential cache.
//!
//! # Key Pattern
//!
//! - `user:{nickname}` - JSON `{"nickname": .., "hashed_password": ..}`,
//!   written with `SET .. EX <ttl>`
//!
//! The `MultiplexedConnection` is cheap to clone and safe for concurrent use,
//! so each operation clones it instead of locking.

use super::CredentialCache;
use crate::errors::ChatError;
use crate::models::User;
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client};
use std::time::Duration;
use tracing::{error, instrument, warn};

/// Credential cache backed by Redis.
#[derive(Clone)]
pub struct RedisCredentialCache {
    connection: MultiplexedConnection,
    ttl: Duration,
}

impl RedisCredentialCache {
    /// Connect to Redis.
    ///
    /// # Errors
    ///
    /// Returns `ChatError::Repo` if the URL is invalid or the server is unreachable.
    pub async fn connect(redis_url: &str, ttl: Duration) -> Result<Self, ChatError> {
        // redis_url may carry credentials; never log it.
        let client = Client::open(redis_url).map_err(|e| {
            error!(target: "chat.directory", error = %e, "Failed to open Redis client");
            ChatError::Repo(format!("Failed to open Redis client: {e}"))
        })?;

        let connection = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| {
                error!(target: "chat.directory", error = %e, "Failed to connect to Redis");
                ChatError::Repo(format!("Failed to connect to Redis: {e}"))
            })?;

        Ok(Self::new(connection, ttl))
    }

    pub fn new(connection: MultiplexedConnection, ttl: Duration) -> Self {
        Self { connection, ttl }
    }
}

pub(crate) fn cache_key(nickname: &str) -> String {
    format!("user:{nickname}")
}

#[async_trait]
impl CredentialCache for RedisCredentialCache {
    #[instrument(skip_all, fields(nickname = %user.nickname))]
    async fn set_user(&self, user: &User) -> Result<(), ChatError> {
        let mut conn = self.connection.clone();
        let value = serde_json::to_string(user)
            .map_err(|e| ChatError::Repo(format!("Failed to encode cached user: {e}")))?;

        conn.set_ex::<_, _, ()>(cache_key(&user.nickname), value, self.ttl.as_secs())
            .await
            .map_err(|e| {
                warn!(target: "chat.directory", error = %e, "Failed to write user to cache");
                ChatError::Repo(format!("Failed to write user to cache: {e}"))
            })
    }

    #[instrument(skip_all, fields(nickname = %nickname))]
    async fn get_user(&self, nickname: &str) -> Result<Option<User>, ChatError> {
        let mut conn = self.connection.clone();

        let value: Option<String> = conn.get(cache_key(nickname)).await.map_err(|e| {
            warn!(target: "chat.directory", error = %e, "Failed to read user from cache");
            ChatError::Repo(format!("Failed to read user from cache: {e}"))
        })?;

        value
            .map(|json| {
                serde_json::from_str::<User>(&json).map_err(|e| {
                    warn!(target: "chat.directory", error = %e, "Cached user is undecodable");
                    ChatError::Repo(format!("Failed to decode cached user: {e}"))
                })
            })
            .transpose()
    }
}
