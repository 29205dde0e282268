//! HTTP routes for the chat service.
//!
//! Defines the Axum router and application state.

use crate::auth::TokenKeys;
use crate::config::Config;
use crate::handlers;
use crate::hub::ChatHub;
use crate::services::UserDirectory;
use axum::{
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::task::TaskTracker;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Timeout for plain HTTP requests. Upgraded WebSockets outlive it.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Live chat connections.
    pub hub: Arc<ChatHub>,

    /// Cache-aside credential lookups.
    pub directory: UserDirectory,

    /// Chat token signing keys for this process.
    pub tokens: Arc<TokenKeys>,

    /// Upgraded chat sessions, awaited during graceful shutdown.
    pub connections: TaskTracker,

    /// Service configuration.
    pub config: Config,
}

/// Build the application routes.
///
/// - `POST /console-chat/users` - register
/// - `GET /console-chat/users/:user_nickname` - sign in, returns a chat token
/// - `GET /console-chat/chat` - WebSocket chat
/// - `/health` - liveness check
/// - `/metrics` - Prometheus scrape endpoint
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let chat_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/console-chat/users", post(handlers::register_user))
        .route(
            "/console-chat/users/:user_nickname",
            get(handlers::sign_in_user),
        )
        .route("/console-chat/chat", get(handlers::chat_upgrade))
        .with_state(state);

    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    chat_routes
        .merge(metrics_routes)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
}
