//! Cache-aside user directory.
//!
//! Composes a durable [`CredentialStore`] and a [`CredentialCache`]:
//!
//! - `add_user`: durable write first, then cache write.
//! - `get_user`: cache first; on a miss read durable and backfill the cache.
//!
//! The durable store is the source of truth. A cache failure after the
//! durable operation committed is still reported as `Repo` so callers never
//! mistake infrastructure trouble for a clean result.

use crate::errors::ChatError;
use crate::models::User;
use crate::observability::metrics;
use crate::repositories::{CredentialCache, CredentialStore};
use std::sync::Arc;
use tracing::{instrument, warn};

/// Read-through / write-through credential directory.
#[derive(Clone)]
pub struct UserDirectory {
    durable: Arc<dyn CredentialStore>,
    cache: Arc<dyn CredentialCache>,
}

impl UserDirectory {
    pub fn new(durable: Arc<dyn CredentialStore>, cache: Arc<dyn CredentialCache>) -> Self {
        Self { durable, cache }
    }

    /// Store a new credential record.
    ///
    /// # Errors
    ///
    /// - `UserAlreadyExists` if the nickname is taken (cache untouched)
    /// - `Repo` on a durable failure, or on a cache failure after the durable
    ///   write committed
    #[instrument(skip_all, fields(nickname = %user.nickname))]
    pub async fn add_user(&self, user: User) -> Result<User, ChatError> {
        match self.durable.insert_user(&user).await {
            Ok(()) => {}
            Err(ChatError::UserAlreadyExists) => return Err(ChatError::UserAlreadyExists),
            Err(e) => return Err(into_repo(e)),
        }

        if let Err(e) = self.cache.set_user(&user).await {
            warn!(
                target: "chat.directory",
                nickname = %user.nickname,
                error = %e,
                "Cache write failed after durable insert committed"
            );
            return Err(into_repo(e));
        }

        Ok(user)
    }

    /// Look up a credential record.
    ///
    /// # Errors
    ///
    /// - `UserNotFound` when neither tier holds the nickname
    /// - `Repo` on a cache operational error (durable is not consulted), a
    ///   durable failure, or a failed backfill after a durable hit
    #[instrument(skip_all, fields(nickname = %nickname))]
    pub async fn get_user(&self, nickname: &str) -> Result<User, ChatError> {
        match self.cache.get_user(nickname).await {
            Ok(Some(user)) => {
                metrics::record_user_lookup("cache");
                return Ok(user);
            }
            Ok(None) => {}
            Err(e) => {
                metrics::record_user_lookup("error");
                warn!(target: "chat.directory", nickname = %nickname, error = %e, "Cache read failed");
                return Err(into_repo(e));
            }
        }

        let user = match self.durable.select_user(nickname).await {
            Ok(user) => user,
            Err(ChatError::UserNotFound) => {
                metrics::record_user_lookup("miss");
                return Err(ChatError::UserNotFound);
            }
            Err(e) => {
                metrics::record_user_lookup("error");
                return Err(into_repo(e));
            }
        };

        metrics::record_user_lookup("store");

        if let Err(e) = self.cache.set_user(&user).await {
            warn!(
                target: "chat.directory",
                nickname = %nickname,
                error = %e,
                "Cache backfill failed after durable read"
            );
            return Err(into_repo(e));
        }

        Ok(user)
    }
}

fn into_repo(e: ChatError) -> ChatError {
    match e {
        ChatError::Repo(msg) => ChatError::Repo(msg),
        other => ChatError::Repo(other.to_string()),
    }
}
