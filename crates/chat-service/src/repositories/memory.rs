//! In-memory credential store and cache for the development backend.

use super::{CredentialCache, CredentialStore};
use crate::errors::ChatError;
use crate::models::User;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

/// Lock-protected map with the same duplicate and not-found semantics as
/// the PostgreSQL store.
#[derive(Default)]
pub struct InMemoryCredentialStore {
    users: RwLock<HashMap<String, User>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn insert_user(&self, user: &User) -> Result<(), ChatError> {
        let mut users = self.users.write().await;
        if users.contains_key(&user.nickname) {
            return Err(ChatError::UserAlreadyExists);
        }
        users.insert(user.nickname.clone(), user.clone());
        Ok(())
    }

    async fn select_user(&self, nickname: &str) -> Result<User, ChatError> {
        self.users
            .read()
            .await
            .get(nickname)
            .cloned()
            .ok_or(ChatError::UserNotFound)
    }
}

struct CachedUser {
    user: User,
    expires_at: Instant,
}

/// TTL cache. Expired entries read as a miss and are purged on access.
pub struct InMemoryCredentialCache {
    entries: RwLock<HashMap<String, CachedUser>>,
    ttl: Duration,
}

impl InMemoryCredentialCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }
}

#[async_trait]
impl CredentialCache for InMemoryCredentialCache {
    async fn set_user(&self, user: &User) -> Result<(), ChatError> {
        self.entries.write().await.insert(
            user.nickname.clone(),
            CachedUser {
                user: user.clone(),
                expires_at: Instant::now() + self.ttl,
            },
        );
        Ok(())
    }

    async fn get_user(&self, nickname: &str) -> Result<Option<User>, ChatError> {
        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.get(nickname) {
                None => return Ok(None),
                Some(entry) if entry.expires_at > now => return Ok(Some(entry.user.clone())),
                Some(_) => {}
            }
        }

        let mut entries = self.entries.write().await;
        if entries
            .get(nickname)
            .is_some_and(|entry| entry.expires_at <= now)
        {
            entries.remove(nickname);
        }
        Ok(None)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_store_duplicate_and_missing() {
        let store = InMemoryCredentialStore::new();
        store.insert_user(&User::new("user01", "h1")).await.unwrap();

        let dup = store.insert_user(&User::new("user01", "h2")).await;
        assert!(matches!(dup, Err(ChatError::UserAlreadyExists)));
        assert_eq!(store.select_user("user01").await.unwrap().hashed_password, "h1");

        let missing = store.select_user("nobody").await;
        assert!(matches!(missing, Err(ChatError::UserNotFound)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cache_entry_expires() {
        let cache = InMemoryCredentialCache::new(Duration::from_secs(1800));
        let user = User::new("user01", "hash");
        cache.set_user(&user).await.unwrap();

        tokio::time::advance(Duration::from_secs(1799)).await;
        assert_eq!(cache.get_user("user01").await.unwrap(), Some(user));

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(cache.get_user("user01").await.unwrap(), None);
        assert!(cache.entries.read().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rewrite_refreshes_expiry() {
        let cache = InMemoryCredentialCache::new(Duration::from_secs(10));
        let user = User::new("user01", "hash");

        cache.set_user(&user).await.unwrap();
        tokio::time::advance(Duration::from_secs(8)).await;
        cache.set_user(&user).await.unwrap();
        tokio::time::advance(Duration::from_secs(8)).await;

        assert_eq!(cache.get_user("user01").await.unwrap(), Some(user));
    }
}
