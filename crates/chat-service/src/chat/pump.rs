//! Per-connection message pump.
//!
//! A reader task drains the connection and hands each text body to the relay
//! over a bounded channel. The relay broadcasts bodies in the order they were
//! read, then runs the leave sequence once the reader stops.
//!
//! The reader also stops when the hub evicts the connection or the hub's
//! shutdown token is cancelled.

use super::format;
use crate::hub::{Admission, ChatHub, Eviction};
use axum::extract::ws::Message;
use futures::{Stream, StreamExt};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

/// Capacity of the reader-to-relay hand-off.
pub const RELAY_CHANNEL_BUFFER: usize = 32;

/// Why the reader stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReaderExit {
    /// End of stream, a close frame, or a read error.
    Closed,
    Shutdown,
    /// `None` when the entry was dropped through `ChatHub::remove`.
    Evicted(Option<Eviction>),
}

/// Relay messages from `stream` to the hub until the connection ends.
///
/// On exit the entry for this admission is removed. A leave notice is
/// broadcast unless the identity now belongs to a newer connection.
#[instrument(skip_all, fields(nickname = %identity, connection_id = %admission.connection_id))]
pub async fn run<S>(hub: Arc<ChatHub>, identity: String, admission: Admission, stream: S)
where
    S: Stream<Item = Result<Message, axum::Error>> + Send + Unpin + 'static,
{
    let Admission {
        connection_id,
        evicted,
    } = admission;
    let (tx, mut rx) = mpsc::channel::<String>(RELAY_CHANNEL_BUFFER);
    let reader = tokio::spawn(read_loop(
        stream,
        tx,
        identity.clone(),
        evicted,
        hub.shutdown_token(),
    ));

    while let Some(body) = rx.recv().await {
        hub.broadcast(&identity, &format::chat_line(&identity, &body))
            .await;
    }

    let exit = match reader.await {
        Ok(exit) => exit,
        Err(e) => {
            warn!(target: "chat.pump", nickname = %identity, error = %e, "Reader task failed");
            ReaderExit::Closed
        }
    };

    let removed = hub.remove_connection(&identity, connection_id).await;
    let announce = match exit {
        ReaderExit::Evicted(Some(Eviction::Superseded)) => false,
        ReaderExit::Evicted(_) => true,
        ReaderExit::Closed | ReaderExit::Shutdown => removed,
    };

    if announce {
        hub.broadcast(&identity, &format::leave_notice(&identity))
            .await;
    }
    debug!(target: "chat.pump", nickname = %identity, exit = ?exit, announced = announce, "Connection left");
}

async fn read_loop<S>(
    mut stream: S,
    tx: mpsc::Sender<String>,
    identity: String,
    mut evicted: oneshot::Receiver<Eviction>,
    shutdown: CancellationToken,
) -> ReaderExit
where
    S: Stream<Item = Result<Message, axum::Error>> + Unpin,
{
    loop {
        let frame = tokio::select! {
            biased;
            () = shutdown.cancelled() => return ReaderExit::Shutdown,
            eviction = &mut evicted => return ReaderExit::Evicted(eviction.ok()),
            frame = stream.next() => frame,
        };

        let body = match frame {
            None => return ReaderExit::Closed,
            Some(Ok(Message::Text(text))) => text,
            Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes) {
                Ok(text) => text,
                Err(_) => {
                    debug!(
                        target: "chat.pump",
                        nickname = %identity,
                        "Dropping non-UTF-8 binary frame"
                    );
                    continue;
                }
            },
            Some(Ok(Message::Ping(_) | Message::Pong(_))) => continue,
            Some(Ok(Message::Close(_))) => return ReaderExit::Closed,
            Some(Err(e)) => {
                warn!(
                    target: "chat.pump",
                    nickname = %identity,
                    error = %e,
                    "Read failed, closing connection"
                );
                return ReaderExit::Closed;
            }
        };

        if tx.send(body).await.is_err() {
            return ReaderExit::Closed;
        }
    }
}
