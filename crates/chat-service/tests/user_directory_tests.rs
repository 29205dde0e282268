//! Cache-aside behavior of `UserDirectory` against counting mocks.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use chat_service::errors::ChatError;
use chat_service::models::User;
use chat_service::services::UserDirectory;
use chat_test_utils::{MockCredentialCache, MockCredentialStore};
use std::sync::Arc;

fn directory() -> (UserDirectory, Arc<MockCredentialStore>, Arc<MockCredentialCache>) {
    let store = Arc::new(MockCredentialStore::new());
    let cache = Arc::new(MockCredentialCache::new());
    let directory = UserDirectory::new(store.clone(), cache.clone());
    (directory, store, cache)
}

/// The second lookup is served from the backfilled cache.
#[tokio::test]
async fn test_repeated_lookup_reads_store_once() {
    let (directory, store, cache) = directory();
    store.seed(User::new("user01", "hash"));

    let first = directory.get_user("user01").await.unwrap();
    let second = directory.get_user("user01").await.unwrap();

    assert_eq!(first, second);
    assert_eq!(store.select_calls(), 1);
    assert_eq!(cache.set_calls(), 1);
    assert_eq!(cache.get_calls(), 2);
}

/// A freshly added record is readable without touching the store.
#[tokio::test]
async fn test_add_then_get_is_served_from_cache() {
    let (directory, store, cache) = directory();
    let user = User::new("user01", "hash");

    directory.add_user(user.clone()).await.unwrap();
    let found = directory.get_user("user01").await.unwrap();

    assert_eq!(found, user);
    assert_eq!(store.insert_calls(), 1);
    assert_eq!(store.select_calls(), 0);
    assert_eq!(cache.peek("user01"), Some(user));
}

/// A duplicate registration leaves the cache untouched.
#[tokio::test]
async fn test_duplicate_add_does_not_touch_cache() {
    let (directory, store, cache) = directory();
    store.seed(User::new("user01", "original"));

    let result = directory.add_user(User::new("user01", "imposter")).await;

    assert!(matches!(result, Err(ChatError::UserAlreadyExists)));
    assert_eq!(cache.set_calls(), 0);
    assert!(cache.peek("user01").is_none());
}

/// Absence in both tiers is `UserNotFound`, never `Repo`.
#[tokio::test]
async fn test_unknown_user_is_not_found() {
    let (directory, store, cache) = directory();

    let result = directory.get_user("nobody").await;

    assert!(matches!(result, Err(ChatError::UserNotFound)));
    assert_eq!(store.select_calls(), 1);
    assert_eq!(cache.set_calls(), 0);
}

/// A cache read error fails the lookup without consulting the store.
#[tokio::test]
async fn test_cache_read_error_skips_store() {
    let (directory, store, cache) = directory();
    store.seed(User::new("user01", "hash"));
    cache.set_failing_get(true);

    let result = directory.get_user("user01").await;

    assert!(matches!(result, Err(ChatError::Repo(_))));
    assert_eq!(store.select_calls(), 0);
}

/// A failed backfill after a durable hit is reported as `Repo`.
#[tokio::test]
async fn test_backfill_failure_is_repo() {
    let (directory, store, cache) = directory();
    store.seed(User::new("user01", "hash"));
    cache.set_failing_set(true);

    let result = directory.get_user("user01").await;

    assert!(matches!(result, Err(ChatError::Repo(_))));
    assert_eq!(store.select_calls(), 1);
    assert_eq!(cache.set_calls(), 1);
}

/// A cache write failure after the insert committed is `Repo`, and the
/// durable record stays.
#[tokio::test]
async fn test_cache_write_failure_after_insert_is_repo() {
    let (directory, store, cache) = directory();
    cache.set_failing_set(true);

    let result = directory.add_user(User::new("user01", "hash")).await;

    assert!(matches!(result, Err(ChatError::Repo(_))));
    assert!(store.contains("user01"));

    // Once the cache recovers the record is reachable through the store.
    cache.set_failing_set(false);
    let found = directory.get_user("user01").await.unwrap();
    assert_eq!(found.hashed_password, "hash");
    assert_eq!(store.select_calls(), 1);
}

/// Durable failures surface as `Repo` and never reach the cache.
#[tokio::test]
async fn test_store_failure_is_repo() {
    let (directory, store, cache) = directory();
    store.set_failing(true);

    let add = directory.add_user(User::new("user01", "hash")).await;
    let get = directory.get_user("user02").await;

    assert!(matches!(add, Err(ChatError::Repo(_))));
    assert!(matches!(get, Err(ChatError::Repo(_))));
    assert_eq!(cache.set_calls(), 0);
}
