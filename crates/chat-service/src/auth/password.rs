//! Password hashing with bcrypt.
//!
//! bcrypt is CPU-bound for hundreds of milliseconds at production costs, so
//! both operations run on the blocking pool instead of a runtime worker.

use crate::errors::ChatError;
use tokio::task;
use tracing::{error, instrument};

/// Hash `password` with the given bcrypt cost.
///
/// The cost is range-checked when configuration is loaded.
#[instrument(skip_all)]
pub async fn hash_password(password: &str, cost: u32) -> Result<String, ChatError> {
    let password = password.to_owned();
    task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(join_failed)?
        .map_err(|e| ChatError::Crypto(format!("Password hashing failed: {e}")))
}

/// Verify `password` against a stored bcrypt hash.
#[instrument(skip_all)]
pub async fn verify_password(password: &str, hash: &str) -> Result<bool, ChatError> {
    let password = password.to_owned();
    let hash = hash.to_owned();
    task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(join_failed)?
        .map_err(|e| ChatError::Crypto(format!("Password verification failed: {e}")))
}

fn join_failed(e: task::JoinError) -> ChatError {
    error!(target: "chat.errors", error = %e, "Password task did not complete");
    ChatError::Internal
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hash_and_verify() {
        let hash = hash_password("Passw0rd!", 4).await.unwrap();

        assert!(hash.starts_with("$2"));
        assert!(verify_password("Passw0rd!", &hash).await.unwrap());
        assert!(!verify_password("Passw0rd?", &hash).await.unwrap());
    }

    #[tokio::test]
    async fn test_verify_against_malformed_hash_is_crypto_error() {
        let result = verify_password("Passw0rd!", "not-a-bcrypt-hash").await;
        assert!(matches!(result, Err(ChatError::Crypto(_))));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_hashing_leaves_the_runtime_responsive() {
        let ticker = tokio::spawn(async {
            let mut ticks = 0u32;
            loop {
                tokio::time::sleep(std::time::Duration::from_millis(1)).await;
                ticks += 1;
                if ticks == 3 {
                    return ticks;
                }
            }
        });

        // Cost 10 takes far longer than three 1 ms ticks.
        let hash = hash_password("Passw0rd!", 10).await.unwrap();

        assert!(ticker.is_finished(), "runtime thread was blocked by bcrypt");
        assert!(hash.starts_with("$2"));
    }
}
