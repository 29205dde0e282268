//! Chat token issuing and verification.
//!
//! Tokens are HS256 JWTs signed with a secret that lives only in this
//! process. Restarting the service invalidates every outstanding token.
//!
//! All verification failures collapse to `ChatError::AuthFailure` with a
//! generic message; the concrete cause is logged at debug level.

use crate::errors::ChatError;
use common::jwt::{check_token_size, ChatClaims};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use ring::rand::{SecureRandom, SystemRandom};
use std::fmt;
use std::time::Duration;
use tracing::instrument;

/// Length of the randomly generated HMAC secret.
pub const SECRET_LEN_BYTES: usize = 64;

/// Signing and verification keys for chat tokens.
#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl fmt::Debug for TokenKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenKeys")
            .field("secret", &"[REDACTED]")
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl TokenKeys {
    /// Generate a fresh random secret.
    ///
    /// # Errors
    ///
    /// Returns `ChatError::Crypto` if the system RNG fails.
    pub fn generate(ttl: Duration) -> Result<Self, ChatError> {
        let rng = SystemRandom::new();
        let mut secret = [0u8; SECRET_LEN_BYTES];
        rng.fill(&mut secret)
            .map_err(|e| ChatError::Crypto(format!("Secret generation failed: {e}")))?;
        Ok(Self::from_secret(&secret, ttl))
    }

    /// Build keys from a known secret.
    pub fn from_secret(secret: &[u8], ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a token whose `nickname` claim is `nickname`.
    ///
    /// # Errors
    ///
    /// Returns `ChatError::Crypto` if signing fails.
    #[instrument(skip_all)]
    pub fn issue(&self, nickname: &str) -> Result<String, ChatError> {
        let now = chrono::Utc::now().timestamp();
        let ttl_secs = i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX);
        let claims = ChatClaims::new(
            nickname.to_string(),
            now.saturating_add(ttl_secs),
            Some(now),
        );

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| ChatError::Crypto(format!("Token signing failed: {e}")))
    }

    /// Verify a token and return the identity it carries.
    ///
    /// # Errors
    ///
    /// Returns `ChatError::AuthFailure` when the token is oversized, malformed,
    /// signed with another key, expired, or has no usable `nickname` claim.
    #[instrument(skip_all)]
    pub fn verify(&self, token: &str) -> Result<String, ChatError> {
        check_token_size(token).map_err(|e| ChatError::AuthFailure(e.to_string()))?;

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;

        let token_data = decode::<ChatClaims>(token, &self.decoding, &validation).map_err(|e| {
            tracing::debug!(target: "chat.handshake", error = %e, "Token verification failed");
            ChatError::AuthFailure("The chat token is invalid or expired".to_string())
        })?;

        let identity = token_data
            .claims
            .identity()
            .map_err(|e| ChatError::AuthFailure(e.to_string()))?;

        Ok(identity.to_string())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"unit-test-secret-unit-test-secret-unit-test-secret-unit-test-sec";

    fn keys() -> TokenKeys {
        TokenKeys::from_secret(SECRET, Duration::from_secs(3600))
    }

    fn sign_raw(claims: &serde_json::Value, secret: &[u8]) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(secret),
        )
        .unwrap()
    }

    #[test]
    fn test_issue_then_verify_returns_nickname() {
        let keys = keys();
        let token = keys.issue("user01").unwrap();

        assert_eq!(keys.verify(&token).unwrap(), "user01");
    }

    #[test]
    fn test_generated_keys_differ() {
        let a = TokenKeys::generate(Duration::from_secs(60)).unwrap();
        let b = TokenKeys::generate(Duration::from_secs(60)).unwrap();

        let token = a.issue("user01").unwrap();
        assert!(a.verify(&token).is_ok());
        assert!(matches!(b.verify(&token), Err(ChatError::AuthFailure(_))));
    }

    #[test]
    fn test_verify_rejects_wrong_key() {
        let exp = chrono::Utc::now().timestamp() + 600;
        let token = sign_raw(
            &serde_json::json!({"nickname": "user01", "exp": exp}),
            b"some-other-secret",
        );

        assert!(matches!(keys().verify(&token), Err(ChatError::AuthFailure(_))));
    }

    #[test]
    fn test_verify_rejects_expired_token() {
        let exp = chrono::Utc::now().timestamp() - 3600;
        let token = sign_raw(&serde_json::json!({"nickname": "user01", "exp": exp}), SECRET);

        assert!(matches!(keys().verify(&token), Err(ChatError::AuthFailure(_))));
    }

    #[test]
    fn test_verify_rejects_missing_nickname() {
        let exp = chrono::Utc::now().timestamp() + 600;
        let token = sign_raw(&serde_json::json!({"sub": "user01", "exp": exp}), SECRET);

        assert!(matches!(keys().verify(&token), Err(ChatError::AuthFailure(_))));
    }

    #[test]
    fn test_verify_rejects_non_string_nickname() {
        let exp = chrono::Utc::now().timestamp() + 600;
        let token = sign_raw(&serde_json::json!({"nickname": 7, "exp": exp}), SECRET);

        assert!(matches!(keys().verify(&token), Err(ChatError::AuthFailure(_))));
    }

    #[test]
    fn test_verify_rejects_blank_nickname() {
        let exp = chrono::Utc::now().timestamp() + 600;
        let token = sign_raw(&serde_json::json!({"nickname": "", "exp": exp}), SECRET);

        assert!(matches!(keys().verify(&token), Err(ChatError::AuthFailure(_))));
    }

    #[test]
    fn test_verify_rejects_garbage_and_oversized() {
        let keys = keys();
        assert!(matches!(keys.verify("not-a-jwt"), Err(ChatError::AuthFailure(_))));

        let huge = "a".repeat(common::jwt::MAX_TOKEN_SIZE_BYTES + 1);
        assert!(matches!(keys.verify(&huge), Err(ChatError::AuthFailure(_))));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let debug = format!("{:?}", keys());
        assert!(debug.contains("REDACTED"));
    }
}
