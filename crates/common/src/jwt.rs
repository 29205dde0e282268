//! Chat token claims shared by the issuer and the handshake verifier.
//!
//! The token itself is an HS256 JWT signed with a per-process secret. This
//! module only owns the parts that do not depend on key material:
//! - Size limit checked before any parsing (DoS prevention)
//! - The typed claim set (`nickname`, `exp`, `iat`)
//! - Fail-closed extraction of the chat identity from decoded claims
//!
//! # Usage
//!
//! ```rust
//! use common::jwt::{check_token_size, ChatClaims};
//!
//! let claims = ChatClaims::new("user01".to_string(), 1_900_000_000, Some(1_800_000_000));
//! assert_eq!(claims.identity().ok(), Some("user01"));
//! assert!(check_token_size("header.payload.signature").is_ok());
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Maximum allowed token size in bytes (8KB).
///
/// A chat token is ~150 bytes. Anything larger than this is rejected before
/// base64 decoding or signature verification.
pub const MAX_TOKEN_SIZE_BYTES: usize = 8192;

/// Name of the claim carrying the chat identity.
pub const NICKNAME_CLAIM: &str = "nickname";

// =============================================================================
// Error Types
// =============================================================================

/// Errors raised while inspecting a chat token.
///
/// Messages are intentionally generic; details are logged at debug level.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// Token size exceeds maximum allowed.
    #[error("The chat token is invalid or expired")]
    TokenTooLarge,

    /// Token decoded but carries no usable `nickname` claim.
    #[error("The chat token is invalid or expired")]
    MissingNickname,
}

// =============================================================================
// Claims Types
// =============================================================================

/// Claims carried by a chat token.
///
/// - `nickname`: chat identity the connection is registered under
/// - `exp`: expiration timestamp (Unix epoch seconds)
/// - `iat`: issued-at timestamp, optional so that tokens minted without it
///   still decode
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatClaims {
    /// Chat identity.
    pub nickname: String,

    /// Expiration timestamp (Unix epoch seconds).
    pub exp: i64,

    /// Issued-at timestamp (Unix epoch seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
}

impl ChatClaims {
    /// Creates a new `ChatClaims` instance.
    #[must_use]
    pub fn new(nickname: String, exp: i64, iat: Option<i64>) -> Self {
        Self { nickname, exp, iat }
    }

    /// Returns the chat identity, rejecting blank nicknames.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::MissingNickname` when the claim is empty or
    /// whitespace only.
    pub fn identity(&self) -> Result<&str, TokenError> {
        if self.nickname.trim().is_empty() {
            tracing::debug!(target: "common.jwt", "Token rejected: blank nickname claim");
            return Err(TokenError::MissingNickname);
        }
        Ok(&self.nickname)
    }
}

// =============================================================================
// Functions
// =============================================================================

/// Reject oversized tokens before any parsing.
///
/// # Errors
///
/// Returns `TokenError::TokenTooLarge` if `token` exceeds
/// [`MAX_TOKEN_SIZE_BYTES`].
pub fn check_token_size(token: &str) -> Result<(), TokenError> {
    if token.len() > MAX_TOKEN_SIZE_BYTES {
        tracing::debug!(
            target: "common.jwt",
            token_size = token.len(),
            max_size = MAX_TOKEN_SIZE_BYTES,
            "Token rejected: size exceeds maximum allowed"
        );
        return Err(TokenError::TokenTooLarge);
    }
    Ok(())
}
