//! Registration and sign-in.
//!
//! # Steps
//!
//! Register: validate nickname and password, hash with bcrypt, store via the
//! user directory.
//!
//! Sign in: look up via the user directory, verify the bcrypt hash.

use crate::auth::password;
use crate::errors::ChatError;
use crate::models::User;
use crate::observability::metrics;
use crate::services::user_directory::UserDirectory;
use crate::services::validation;
use common::secret::{ExposeSecret, SecretString};
use tracing::instrument;

/// Register a new user.
///
/// # Errors
///
/// - `InvalidNickname` / `InvalidPassword` when validation fails
/// - `UserAlreadyExists` when the nickname is taken
/// - `Crypto` if hashing fails, `Internal` if the hashing task dies,
///   `Repo` on storage failure
#[instrument(skip_all, fields(nickname = %nickname))]
pub async fn register_user(
    directory: &UserDirectory,
    nickname: &str,
    password: &SecretString,
    bcrypt_cost: u32,
) -> Result<User, ChatError> {
    if !validation::is_valid_nickname(nickname) {
        metrics::record_registration("invalid");
        return Err(ChatError::InvalidNickname);
    }
    if !validation::is_valid_password(password.expose_secret()) {
        metrics::record_registration("invalid");
        return Err(ChatError::InvalidPassword);
    }

    let hashed_password = password::hash_password(password.expose_secret(), bcrypt_cost).await?;

    let result = directory
        .add_user(User::new(nickname, hashed_password))
        .await;

    match &result {
        Ok(_) => {
            metrics::record_registration("success");
            tracing::info!(target: "chat.directory", nickname = %nickname, "User registered");
        }
        Err(ChatError::UserAlreadyExists) => metrics::record_registration("conflict"),
        Err(_) => metrics::record_registration("error"),
    }

    result
}

/// Check a user's password.
///
/// # Errors
///
/// - `UserNotFound` for an unknown nickname
/// - `WrongPassword` when the hash does not match
/// - `Repo` on storage failure, `Crypto` if the stored hash is unreadable,
///   `Internal` if the verification task dies
#[instrument(skip_all, fields(nickname = %nickname))]
pub async fn sign_in_user(
    directory: &UserDirectory,
    nickname: &str,
    password: &SecretString,
) -> Result<User, ChatError> {
    let user = directory.get_user(nickname).await?;

    if !password::verify_password(password.expose_secret(), &user.hashed_password).await? {
        tracing::debug!(target: "chat.directory", nickname = %nickname, "Wrong password");
        return Err(ChatError::WrongPassword);
    }

    Ok(user)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::repositories::{InMemoryCredentialCache, InMemoryCredentialStore};
    use std::sync::Arc;
    use std::time::Duration;

    const TEST_COST: u32 = 4;

    fn directory() -> UserDirectory {
        UserDirectory::new(
            Arc::new(InMemoryCredentialStore::new()),
            Arc::new(InMemoryCredentialCache::new(Duration::from_secs(60))),
        )
    }

    fn secret(s: &str) -> SecretString {
        SecretString::from(s)
    }

    #[tokio::test]
    async fn test_register_then_sign_in() {
        let directory = directory();

        let user = register_user(&directory, "user01", &secret("Passw0rd!"), TEST_COST)
            .await
            .unwrap();
        assert_eq!(user.nickname, "user01");
        assert_ne!(user.hashed_password, "Passw0rd!");

        let signed_in = sign_in_user(&directory, "user01", &secret("Passw0rd!"))
            .await
            .unwrap();
        assert_eq!(signed_in, user);
    }

    #[tokio::test]
    async fn test_register_rejects_invalid_input() {
        let directory = directory();

        let bad_nick = register_user(&directory, "ab", &secret("Passw0rd!"), TEST_COST).await;
        assert!(matches!(bad_nick, Err(ChatError::InvalidNickname)));

        let bad_pass = register_user(&directory, "user01", &secret("password"), TEST_COST).await;
        assert!(matches!(bad_pass, Err(ChatError::InvalidPassword)));
    }

    #[tokio::test]
    async fn test_register_twice_is_conflict() {
        let directory = directory();
        register_user(&directory, "user01", &secret("Passw0rd!"), TEST_COST)
            .await
            .unwrap();

        let again = register_user(&directory, "user01", &secret("0therPass!"), TEST_COST).await;
        assert!(matches!(again, Err(ChatError::UserAlreadyExists)));
    }

    #[tokio::test]
    async fn test_sign_in_wrong_password_and_unknown_user() {
        let directory = directory();
        register_user(&directory, "user01", &secret("Passw0rd!"), TEST_COST)
            .await
            .unwrap();

        let wrong = sign_in_user(&directory, "user01", &secret("Passw0rd?")).await;
        assert!(matches!(wrong, Err(ChatError::WrongPassword)));

        let unknown = sign_in_user(&directory, "user02", &secret("Passw0rd!")).await;
        assert!(matches!(unknown, Err(ChatError::UserNotFound)));
    }
}
