//! WebSocket chat client for E2E tests.

use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

/// Default wait for an expected frame.
pub const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// A chat client speaking the raw text protocol.
pub struct TestChatClient {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl TestChatClient {
    /// Open a WebSocket without sending anything.
    pub async fn connect(ws_url: &str) -> Result<Self, anyhow::Error> {
        let (ws, _response) = connect_async(ws_url)
            .await
            .map_err(|e| anyhow::anyhow!("WebSocket connect failed: {}", e))?;
        Ok(Self { ws })
    }

    /// Open a WebSocket and send `token` as the handshake frame.
    pub async fn connect_with_token(ws_url: &str, token: &str) -> Result<Self, anyhow::Error> {
        let mut client = Self::connect(ws_url).await?;
        client.send_text(token).await?;
        Ok(client)
    }

    pub async fn send_text(&mut self, text: &str) -> Result<(), anyhow::Error> {
        self.ws
            .send(Message::Text(text.to_string()))
            .await
            .map_err(|e| anyhow::anyhow!("WebSocket send failed: {}", e))
    }

    /// Next text frame, skipping control frames. Fails after [`RECV_TIMEOUT`].
    pub async fn recv_text(&mut self) -> Result<String, anyhow::Error> {
        tokio::time::timeout(RECV_TIMEOUT, async {
            loop {
                match self.ws.next().await {
                    Some(Ok(Message::Text(text))) => return Ok(text),
                    Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => {}
                    Some(Ok(other)) => anyhow::bail!("Expected text frame, got {:?}", other),
                    Some(Err(e)) => anyhow::bail!("WebSocket read failed: {}", e),
                    None => anyhow::bail!("WebSocket closed"),
                }
            }
        })
        .await
        .map_err(|_| anyhow::anyhow!("No text frame within {:?}", RECV_TIMEOUT))?
    }

    /// Assert that no text frame arrives within `window`.
    pub async fn expect_silence(&mut self, window: Duration) -> Result<(), anyhow::Error> {
        match tokio::time::timeout(window, self.ws.next()).await {
            Err(_) => Ok(()),
            Ok(Some(Ok(Message::Text(text)))) => {
                anyhow::bail!("Expected silence, received {:?}", text)
            }
            Ok(_) => Ok(()),
        }
    }

    /// Wait for the server to close the connection.
    pub async fn expect_closed(&mut self) -> Result<(), anyhow::Error> {
        tokio::time::timeout(RECV_TIMEOUT, async {
            loop {
                match self.ws.next().await {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => return Ok(()),
                    Some(Ok(Message::Text(text))) => {
                        anyhow::bail!("Expected close, received {:?}", text)
                    }
                    Some(Ok(_)) => {}
                }
            }
        })
        .await
        .map_err(|_| anyhow::anyhow!("Connection not closed within {:?}", RECV_TIMEOUT))?
    }

    /// Collect text frames until the server closes the connection.
    pub async fn texts_until_closed(&mut self) -> Result<Vec<String>, anyhow::Error> {
        tokio::time::timeout(RECV_TIMEOUT, async {
            let mut texts = Vec::new();
            loop {
                match self.ws.next().await {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => return texts,
                    Some(Ok(Message::Text(text))) => texts.push(text),
                    Some(Ok(_)) => {}
                }
            }
        })
        .await
        .map_err(|_| anyhow::anyhow!("Connection not closed within {:?}", RECV_TIMEOUT))
    }

    /// Send a close frame and wait for the server to finish the close.
    pub async fn close(mut self) -> Result<(), anyhow::Error> {
        self.ws
            .close(None)
            .await
            .map_err(|e| anyhow::anyhow!("WebSocket close failed: {}", e))?;
        while let Some(Ok(_)) = self.ws.next().await {}
        Ok(())
    }
}
