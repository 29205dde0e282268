//! `PeerSink` for the write half of an axum WebSocket.

use super::PeerSink;
use crate::errors::ChatError;
use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use futures::stream::SplitSink;
use futures::SinkExt;

#[async_trait]
impl PeerSink for SplitSink<WebSocket, Message> {
    async fn send_text(&mut self, text: String) -> Result<(), ChatError> {
        self.send(Message::Text(text))
            .await
            .map_err(|e| ChatError::Transport(format!("WebSocket write failed: {e}")))
    }

    async fn close(&mut self) -> Result<(), ChatError> {
        self.send(Message::Close(None))
            .await
            .map_err(|e| ChatError::Transport(format!("WebSocket close failed: {e}")))
    }
}
