//! Credential storage.
//!
//! Two collaborators sit behind the user directory:
//! - [`CredentialStore`] - durable source of truth (PostgreSQL or in-memory)
//! - [`CredentialCache`] - time-bounded cache in front of it (Redis or in-memory)
//!
//! Both are safe for concurrent use without extra locking at the directory layer.

pub mod memory;
pub mod user_cache;
pub mod users;

use crate::errors::ChatError;
use crate::models::User;
use async_trait::async_trait;

pub use memory::{InMemoryCredentialCache, InMemoryCredentialStore};
pub use user_cache::RedisCredentialCache;
pub use users::PgCredentialStore;

/// Durable credential store.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Insert a new record.
    ///
    /// Fails with `UserAlreadyExists` on a duplicate nickname and `Repo` on
    /// any other failure.
    async fn insert_user(&self, user: &User) -> Result<(), ChatError>;

    /// Read a record. Fails with `UserNotFound` when absent.
    async fn select_user(&self, nickname: &str) -> Result<User, ChatError>;
}

/// Time-bounded credential cache.
#[async_trait]
pub trait CredentialCache: Send + Sync {
    /// Write (or overwrite) a record with the cache TTL.
    async fn set_user(&self, user: &User) -> Result<(), ChatError>;

    /// Read a record. A plain miss is `Ok(None)`; `Err` means the cache
    /// itself failed.
    async fn get_user(&self, nickname: &str) -> Result<Option<User>, ChatError>;
}
