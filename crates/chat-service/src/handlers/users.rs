//! Registration and sign-in endpoints.
//!
//! - `POST /console-chat/users` - register, returns the stored record
//! - `GET /console-chat/users/:user_nickname` - sign in, returns a chat token

use crate::errors::{ApiResponse, ChatError};
use crate::models::{RegisterUserRequest, SignInRequest, TokenResponse, UserResponse};
use crate::routes::AppState;
use crate::services::user_service;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use std::sync::Arc;
use tracing::instrument;

/// Handler for POST /console-chat/users
#[instrument(skip_all, name = "chat.users.register")]
pub async fn register_user(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RegisterUserRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<UserResponse>>, ChatError> {
    let Json(request) = payload.map_err(|e| ChatError::InvalidRequest(e.body_text()))?;

    let user = user_service::register_user(
        &state.directory,
        &request.nickname,
        &request.password,
        state.config.bcrypt_cost,
    )
    .await?;

    Ok(Json(ApiResponse::ok(UserResponse::from(user))))
}

/// Handler for GET /console-chat/users/:user_nickname
///
/// The password travels in the JSON body.
#[instrument(skip_all, name = "chat.users.sign_in")]
pub async fn sign_in_user(
    State(state): State<Arc<AppState>>,
    Path(user_nickname): Path<String>,
    payload: Result<Json<SignInRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<TokenResponse>>, ChatError> {
    let Json(request) = payload.map_err(|e| ChatError::InvalidRequest(e.body_text()))?;

    let user = user_service::sign_in_user(&state.directory, &user_nickname, &request.password)
        .await?;
    let token_string = state.tokens.issue(&user.nickname)?;

    Ok(Json(ApiResponse::ok(TokenResponse { token_string })))
}
