//! Console chat error types.
//!
//! All errors map to HTTP status codes via the `IntoResponse` impl. Messages
//! returned to clients are generic for infrastructure failures; the detailed
//! cause is logged server-side.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Console chat error type.
///
/// Maps to HTTP status codes:
/// - UserNotFound: 404 Not Found
/// - UserAlreadyExists: 409 Conflict
/// - InvalidRequest, InvalidNickname, InvalidPassword: 400 Bad Request
/// - WrongPassword, AuthFailure: 401 Unauthorized
/// - Repo, Transport, Crypto, Internal: 500 Internal Server Error
#[derive(Debug, Error)]
pub enum ChatError {
    /// No credential record exists for the identity.
    #[error("could not find required user")]
    UserNotFound,

    /// A credential record already exists for the identity.
    #[error("user with this nickname already exists")]
    UserAlreadyExists,

    /// Cache or durable store failure (not a plain miss).
    #[error("Repository error: {0}")]
    Repo(String),

    /// Handshake token invalid, unverifiable, or missing the identity claim.
    #[error("Authentication failed: {0}")]
    AuthFailure(String),

    /// Read or write failure on an established connection.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Request body missing or not the expected JSON shape.
    #[error("invalid request body: {0}")]
    InvalidRequest(String),

    #[error("invalid nickname")]
    InvalidNickname,

    #[error("invalid password")]
    InvalidPassword,

    #[error("wrong password")]
    WrongPassword,

    /// Hashing, key generation, or token signing failed.
    #[error("Cryptographic error: {0}")]
    Crypto(String),

    #[error("Internal server error")]
    Internal,
}

impl ChatError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ChatError::UserNotFound => StatusCode::NOT_FOUND,
            ChatError::UserAlreadyExists => StatusCode::CONFLICT,
            ChatError::InvalidRequest(_)
            | ChatError::InvalidNickname
            | ChatError::InvalidPassword => StatusCode::BAD_REQUEST,
            ChatError::WrongPassword | ChatError::AuthFailure(_) => StatusCode::UNAUTHORIZED,
            ChatError::Repo(_)
            | ChatError::Transport(_)
            | ChatError::Crypto(_)
            | ChatError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns a client-safe error message (no internal details).
    pub fn client_message(&self) -> String {
        match self {
            ChatError::Repo(_) => "something wrong with user repo".to_string(),
            ChatError::AuthFailure(_) => "invalid or expired token".to_string(),
            ChatError::Transport(_) | ChatError::Crypto(_) | ChatError::Internal => {
                "an internal error occurred".to_string()
            }
            ChatError::UserNotFound
            | ChatError::UserAlreadyExists
            | ChatError::InvalidRequest(_)
            | ChatError::InvalidNickname
            | ChatError::InvalidPassword
            | ChatError::WrongPassword => self.to_string(),
        }
    }
}

/// Response envelope shared by every JSON endpoint.
///
/// Exactly one of `data` and `error` is non-null.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            data: Some(data),
            error: None,
        }
    }
}

impl IntoResponse for ChatError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(target: "chat.errors", error = %self, "Request failed");
        } else {
            tracing::debug!(target: "chat.errors", error = %self, "Request rejected");
        }

        let body: ApiResponse<()> = ApiResponse {
            data: None,
            error: Some(self.client_message()),
        };

        (status, Json(body)).into_response()
    }
}
