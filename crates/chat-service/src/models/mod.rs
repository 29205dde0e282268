use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

/// Credential record (maps to the users table and to the cached JSON value).
///
/// Immutable once created: only create and read exist.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub nickname: String,
    pub hashed_password: String,
}

impl User {
    pub fn new(nickname: impl Into<String>, hashed_password: impl Into<String>) -> Self {
        Self {
            nickname: nickname.into(),
            hashed_password: hashed_password.into(),
        }
    }
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("nickname", &self.nickname)
            .field("hashed_password", &"[REDACTED]")
            .finish()
    }
}

/// Registration request body.
#[derive(Debug, Deserialize)]
pub struct RegisterUserRequest {
    pub nickname: String,
    pub password: common::secret::SecretString,
}

/// Sign-in request body.
#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    pub password: common::secret::SecretString,
}

/// Registration response payload.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub nickname: String,
    pub hashed_password: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            nickname: user.nickname,
            hashed_password: user.hashed_password,
        }
    }
}

/// Sign-in response payload.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token_string: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_user_debug_redacts_hash() {
        let user = User::new("user01", "$2b$04$abcdefghijklmnopqrstuv");
        let debug = format!("{user:?}");

        assert!(debug.contains("user01"));
        assert!(!debug.contains("$2b$04$"));
    }

    #[test]
    fn test_user_serializes_as_flat_record() {
        let user = User::new("user01", "hash");
        let json = serde_json::to_value(&user).unwrap();

        assert_eq!(
            json,
            serde_json::json!({"nickname": "user01", "hashed_password": "hash"})
        );
    }

    #[test]
    fn test_register_request_redacts_password() {
        let json = r#"{"nickname":"user01","password":"Passw0rd!"}"#;
        let req: RegisterUserRequest = serde_json::from_str(json).unwrap();

        assert_eq!(req.nickname, "user01");
        assert!(!format!("{req:?}").contains("Passw0rd!"));
    }
}
