//! Counting credential store and cache.
//!
//! Both mocks keep records in memory, count every call, and can be switched
//! into failure mode to exercise the user directory's error paths.
//!
//! # Example
//!
//! ```rust,ignore
//! let store = Arc::new(MockCredentialStore::new());
//! let cache = Arc::new(MockCredentialCache::new());
//! let directory = UserDirectory::new(store.clone(), cache.clone());
//!
//! store.seed(User::new("user01", "hash"));
//! directory.get_user("user01").await?;
//! directory.get_user("user01").await?;
//! assert_eq!(store.select_calls(), 1);
//! ```

use async_trait::async_trait;
use chat_service::errors::ChatError;
use chat_service::models::User;
use chat_service::repositories::{CredentialCache, CredentialStore};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

/// Mock durable store.
#[derive(Default)]
pub struct MockCredentialStore {
    users: Mutex<HashMap<String, User>>,
    insert_calls: AtomicUsize,
    select_calls: AtomicUsize,
    fail: AtomicBool,
}

impl MockCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record without counting a call.
    pub fn seed(&self, user: User) {
        self.users
            .lock()
            .unwrap()
            .insert(user.nickname.clone(), user);
    }

    /// Make every subsequent call fail with `Repo`.
    pub fn set_failing(&self, failing: bool) {
        self.fail.store(failing, Ordering::SeqCst);
    }

    pub fn insert_calls(&self) -> usize {
        self.insert_calls.load(Ordering::SeqCst)
    }

    pub fn select_calls(&self) -> usize {
        self.select_calls.load(Ordering::SeqCst)
    }

    pub fn contains(&self, nickname: &str) -> bool {
        self.users.lock().unwrap().contains_key(nickname)
    }
}

#[async_trait]
impl CredentialStore for MockCredentialStore {
    async fn insert_user(&self, user: &User) -> Result<(), ChatError> {
        self.insert_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(ChatError::Repo("mock store unavailable".to_string()));
        }

        let mut users = self.users.lock().unwrap();
        if users.contains_key(&user.nickname) {
            return Err(ChatError::UserAlreadyExists);
        }
        users.insert(user.nickname.clone(), user.clone());
        Ok(())
    }

    async fn select_user(&self, nickname: &str) -> Result<User, ChatError> {
        self.select_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(ChatError::Repo("mock store unavailable".to_string()));
        }

        self.users
            .lock()
            .unwrap()
            .get(nickname)
            .cloned()
            .ok_or(ChatError::UserNotFound)
    }
}

/// Mock cache. Entries never expire.
#[derive(Default)]
pub struct MockCredentialCache {
    entries: Mutex<HashMap<String, User>>,
    set_calls: AtomicUsize,
    get_calls: AtomicUsize,
    fail_get: AtomicBool,
    fail_set: AtomicBool,
}

impl MockCredentialCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record without counting a call.
    pub fn seed(&self, user: User) {
        self.entries
            .lock()
            .unwrap()
            .insert(user.nickname.clone(), user);
    }

    /// Make `get_user` fail with `Repo`.
    pub fn set_failing_get(&self, failing: bool) {
        self.fail_get.store(failing, Ordering::SeqCst);
    }

    /// Make `set_user` fail with `Repo`.
    pub fn set_failing_set(&self, failing: bool) {
        self.fail_set.store(failing, Ordering::SeqCst);
    }

    pub fn set_calls(&self) -> usize {
        self.set_calls.load(Ordering::SeqCst)
    }

    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    /// Current cached record, read without counting a call.
    pub fn peek(&self, nickname: &str) -> Option<User> {
        self.entries.lock().unwrap().get(nickname).cloned()
    }
}

#[async_trait]
impl CredentialCache for MockCredentialCache {
    async fn set_user(&self, user: &User) -> Result<(), ChatError> {
        self.set_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_set.load(Ordering::SeqCst) {
            return Err(ChatError::Repo("mock cache unavailable".to_string()));
        }

        self.entries
            .lock()
            .unwrap()
            .insert(user.nickname.clone(), user.clone());
        Ok(())
    }

    async fn get_user(&self, nickname: &str) -> Result<Option<User>, ChatError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_get.load(Ordering::SeqCst) {
            return Err(ChatError::Repo("mock cache unavailable".to_string()));
        }

        Ok(self.entries.lock().unwrap().get(nickname).cloned())
    }
}
