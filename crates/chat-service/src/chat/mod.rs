//! Chat session lifecycle: handshake, admission to the hub, message pump.

pub mod format;
pub mod handshake;
pub mod pump;

use crate::auth::TokenKeys;
use crate::hub::{ChatHub, PeerSink};
use crate::observability::metrics;
use axum::extract::ws::Message;
use futures::Stream;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Drive one freshly upgraded connection to completion.
///
/// A connection whose handshake fails is closed and never reaches the hub.
#[instrument(skip_all)]
pub async fn serve_connection<K, S>(
    mut sink: K,
    mut stream: S,
    hub: Arc<ChatHub>,
    keys: Arc<TokenKeys>,
    handshake_timeout: Duration,
) where
    K: PeerSink + 'static,
    S: Stream<Item = Result<Message, axum::Error>> + Send + Unpin + 'static,
{
    let identity = match handshake::read_identity(&mut stream, &keys, handshake_timeout).await {
        Ok(identity) => identity,
        Err(e) => {
            metrics::record_handshake("rejected");
            warn!(target: "chat.handshake", error = %e, "Handshake rejected");
            if let Err(e) = sink.close().await {
                debug!(target: "chat.handshake", error = %e, "Close after rejected handshake failed");
            }
            return;
        }
    };

    metrics::record_handshake("accepted");
    let admission = hub.add(&identity, Box::new(sink)).await;
    info!(
        target: "chat.handshake",
        nickname = %identity,
        connection_id = %admission.connection_id,
        "Connection admitted"
    );

    hub.broadcast(&identity, &format::join_notice(&identity))
        .await;

    pump::run(hub, identity, admission, stream).await;
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::errors::ChatError;
    use async_trait::async_trait;
    use futures::stream;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::sync::mpsc;
    use tokio_util::sync::CancellationToken;
    use tokio_util::task::TaskTracker;

    struct ChannelSink {
        tx: mpsc::UnboundedSender<String>,
        closed: Arc<AtomicBool>,
    }

    #[async_trait]
    impl PeerSink for ChannelSink {
        async fn send_text(&mut self, text: String) -> Result<(), ChatError> {
            self.tx
                .send(text)
                .map_err(|e| ChatError::Transport(e.to_string()))
        }

        async fn close(&mut self) -> Result<(), ChatError> {
            self.closed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    fn sink() -> (ChannelSink, mpsc::UnboundedReceiver<String>, Arc<AtomicBool>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let closed = Arc::new(AtomicBool::new(false));
        (
            ChannelSink {
                tx,
                closed: Arc::clone(&closed),
            },
            rx,
            closed,
        )
    }

    fn keys() -> Arc<TokenKeys> {
        Arc::new(TokenKeys::from_secret(b"session-test-secret", Duration::from_secs(60)))
    }

    #[tokio::test]
    async fn test_rejected_handshake_closes_and_never_registers() {
        let hub = Arc::new(ChatHub::new(Duration::from_secs(1)));
        let (sink, _rx, closed) = sink();
        let input = stream::iter(vec![Ok(Message::Text("garbage".to_string()))]);

        serve_connection(sink, input, Arc::clone(&hub), keys(), Duration::from_secs(1)).await;

        assert!(closed.load(Ordering::SeqCst));
        assert!(hub.is_empty().await);
    }

    #[tokio::test]
    async fn test_admitted_connection_announces_join_and_leave() {
        let hub = Arc::new(ChatHub::new(Duration::from_secs(1)));
        let keys = keys();

        let (listener, mut listener_rx, _) = sink();
        hub.add("user01", Box::new(listener)).await;

        let token = keys.issue("user02").unwrap();
        let (joiner, _joiner_rx, closed) = sink();
        let input = stream::iter(vec![
            Ok(Message::Text(token)),
            Ok(Message::Text("Pong".to_string())),
        ]);

        serve_connection(joiner, input, Arc::clone(&hub), keys, Duration::from_secs(1)).await;

        // Leaving closes the sink the hub held for this connection.
        assert!(closed.load(Ordering::SeqCst));
        assert_eq!(listener_rx.recv().await.unwrap(), "user02 joins the chat");
        assert_eq!(listener_rx.recv().await.unwrap(), "user02: Pong");
        assert_eq!(listener_rx.recv().await.unwrap(), "user02 leaves the chat");
        assert!(!hub.contains("user02").await);
    }

    /// Never finishes a write; records when it is closed.
    struct StalledSink {
        closed: Arc<AtomicBool>,
    }

    #[async_trait]
    impl PeerSink for StalledSink {
        async fn send_text(&mut self, _text: String) -> Result<(), ChatError> {
            std::future::pending::<()>().await;
            Ok(())
        }

        async fn close(&mut self) -> Result<(), ChatError> {
            self.closed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    type Frame = Result<Message, axum::Error>;

    #[tokio::test]
    async fn test_timed_out_peer_is_disconnected_and_announced() {
        let hub = Arc::new(ChatHub::new(Duration::from_millis(50)));
        let keys = keys();

        let (listener, mut listener_rx, _) = sink();
        hub.add("user02", Box::new(listener)).await;

        let closed = Arc::new(AtomicBool::new(false));
        let stalled = StalledSink {
            closed: Arc::clone(&closed),
        };
        let (frames_tx, frames_rx) = futures::channel::mpsc::unbounded::<Frame>();
        frames_tx
            .unbounded_send(Ok(Message::Text(keys.issue("user01").unwrap())))
            .unwrap();
        let session = tokio::spawn(serve_connection(
            stalled,
            frames_rx,
            Arc::clone(&hub),
            keys,
            Duration::from_secs(1),
        ));
        assert_eq!(listener_rx.recv().await.unwrap(), "user01 joins the chat");

        let summary = hub.broadcast("user02", "user02: hi").await;
        assert_eq!(summary.pruned, vec!["user01".to_string()]);

        tokio::time::timeout(Duration::from_secs(1), session)
            .await
            .expect("session should end once its peer is pruned")
            .unwrap();
        assert_eq!(listener_rx.recv().await.unwrap(), "user01 leaves the chat");

        // The reader is gone, so later frames are never relayed.
        let _ = frames_tx.unbounded_send(Ok(Message::Text("ghost".to_string())));
        tokio::task::yield_now().await;
        assert!(listener_rx.try_recv().is_err());
        assert!(!hub.contains("user01").await);

        tokio::time::timeout(Duration::from_secs(1), async {
            while !closed.load(Ordering::SeqCst) {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("pruned sink should be closed");
    }

    #[tokio::test]
    async fn test_shutdown_drains_tracked_sessions() {
        let shutdown = CancellationToken::new();
        let hub = Arc::new(ChatHub::new(Duration::from_secs(1)).with_shutdown(shutdown.clone()));
        let keys = keys();
        let tracker = TaskTracker::new();

        let (listener, mut listener_rx, _) = sink();
        hub.add("user01", Box::new(listener)).await;

        let (joiner, _joiner_rx, closed) = sink();
        let (frames_tx, frames_rx) = futures::channel::mpsc::unbounded::<Frame>();
        frames_tx
            .unbounded_send(Ok(Message::Text(keys.issue("user02").unwrap())))
            .unwrap();
        tracker.spawn(serve_connection(
            joiner,
            frames_rx,
            Arc::clone(&hub),
            keys,
            Duration::from_secs(1),
        ));
        assert_eq!(listener_rx.recv().await.unwrap(), "user02 joins the chat");

        shutdown.cancel();
        tracker.close();

        tokio::time::timeout(Duration::from_secs(1), tracker.wait())
            .await
            .expect("sessions should drain after shutdown");
        assert!(closed.load(Ordering::SeqCst));
        assert_eq!(listener_rx.recv().await.unwrap(), "user02 leaves the chat");
        assert!(!hub.contains("user02").await);
        drop(frames_tx);
    }
}
