//! WebSocket entry point for chat connections.

use crate::chat;
use crate::routes::AppState;
use axum::extract::ws::{WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures::StreamExt;
use std::sync::Arc;

/// Handler for GET /console-chat/chat
///
/// Upgrades the connection; the first frame must carry a chat token.
#[tracing::instrument(skip_all, name = "chat.ws.upgrade")]
pub async fn chat_upgrade(State(state): State<Arc<AppState>>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Runs one session, tracked so shutdown can wait for it to finish.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (sink, stream) = socket.split();
    let session = chat::serve_connection(
        sink,
        stream,
        Arc::clone(&state.hub),
        Arc::clone(&state.tokens),
        state.config.handshake_timeout,
    );
    state.connections.track_future(session).await;
}
