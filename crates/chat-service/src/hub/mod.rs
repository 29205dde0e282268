//! Connection registry and broadcast.
//!
//! The hub owns the write half of every admitted connection, keyed by chat
//! identity. All operations take one exclusive lock for their duration.
//!
//! # Membership
//!
//! - At most one entry per identity. A later `add` for the same identity
//!   replaces the earlier entry (last handshake wins).
//! - A peer whose write fails or exceeds the write deadline during
//!   `broadcast` is pruned before `broadcast` returns.
//! - Every entry carries a `connection_id` so a superseded connection can
//!   leave without evicting its replacement (see [`ChatHub::remove_connection`]).
//!
//! # Eviction
//!
//! When the hub takes an entry away from a live connection (pruned or
//! superseded) it signals that connection's [`Admission::evicted`] and closes
//! the sink in the background, bounded by the write deadline. Entries removed
//! through `remove`/`remove_connection` are closed inline after the lock is
//! released.

pub mod websocket;

use crate::errors::ChatError;
use crate::observability::metrics;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::{oneshot, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Write half of a chat connection.
#[async_trait]
pub trait PeerSink: Send {
    /// Write one text frame to the peer.
    async fn send_text(&mut self, text: String) -> Result<(), ChatError>;

    /// Close the transport. Sinks without a close handshake do nothing.
    async fn close(&mut self) -> Result<(), ChatError> {
        Ok(())
    }
}

/// Why the hub took an entry away from its connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eviction {
    /// A write failed or missed the deadline.
    Pruned,
    /// A newer handshake registered the same identity.
    Superseded,
}

/// Returned by [`ChatHub::add`] to the connection that was admitted.
#[derive(Debug)]
pub struct Admission {
    pub connection_id: Uuid,
    /// Resolves with the reason once the hub evicts this entry. Resolves
    /// with an error when the entry is dropped through `remove`.
    pub evicted: oneshot::Receiver<Eviction>,
}

struct PeerEntry {
    connection_id: Uuid,
    sink: Box<dyn PeerSink>,
    eviction: oneshot::Sender<Eviction>,
}

/// Outcome of one `broadcast` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastSummary {
    /// Peers a write was attempted on (everyone but the sender).
    pub attempted: usize,
    /// Writes that completed.
    pub delivered: usize,
    /// Identities removed because their write failed or timed out.
    pub pruned: Vec<String>,
}

enum PruneReason {
    WriteError(ChatError),
    Timeout,
}

impl PruneReason {
    fn label(&self) -> &'static str {
        match self {
            PruneReason::WriteError(_) => "write_error",
            PruneReason::Timeout => "timeout",
        }
    }
}

/// Registry of live, authenticated connections.
pub struct ChatHub {
    peers: Mutex<HashMap<String, PeerEntry>>,
    write_timeout: Duration,
    shutdown: CancellationToken,
}

impl ChatHub {
    /// Create an empty hub with the given per-peer write deadline.
    pub fn new(write_timeout: Duration) -> Self {
        Self {
            peers: Mutex::new(HashMap::new()),
            write_timeout,
            shutdown: CancellationToken::new(),
        }
    }

    /// Tie every connection's pump to `shutdown`.
    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Cancelled when the process stops serving chat connections.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Register `sink` under `identity`, replacing any existing entry.
    ///
    /// A replaced entry is signalled [`Eviction::Superseded`] and closed.
    #[instrument(skip_all, fields(nickname = %identity))]
    pub async fn add(&self, identity: &str, sink: Box<dyn PeerSink>) -> Admission {
        let connection_id = Uuid::new_v4();
        let (eviction, evicted) = oneshot::channel();
        let mut peers = self.peers.lock().await;

        let previous = peers.insert(
            identity.to_string(),
            PeerEntry {
                connection_id,
                sink,
                eviction,
            },
        );

        if let Some(previous) = previous {
            info!(
                target: "chat.hub",
                nickname = %identity,
                connection_id = %connection_id,
                previous_connection_id = %previous.connection_id,
                "Identity re-registered, previous connection superseded"
            );
            self.evict(previous, Eviction::Superseded);
        } else {
            debug!(
                target: "chat.hub",
                nickname = %identity,
                connection_id = %connection_id,
                "Connection registered"
            );
        }

        metrics::set_connections_active(peers.len());
        Admission {
            connection_id,
            evicted,
        }
    }

    /// Deregister `identity` if present. Returns whether an entry was removed.
    #[instrument(skip_all, fields(nickname = %identity))]
    pub async fn remove(&self, identity: &str) -> bool {
        let entry = {
            let mut peers = self.peers.lock().await;
            let entry = peers.remove(identity);
            metrics::set_connections_active(peers.len());
            entry
        };

        match entry {
            Some(entry) => {
                close_sink(entry.sink, self.write_timeout).await;
                true
            }
            None => false,
        }
    }

    /// Deregister `identity` only if its entry still belongs to `connection_id`.
    #[instrument(skip_all, fields(nickname = %identity, connection_id = %connection_id))]
    pub async fn remove_connection(&self, identity: &str, connection_id: Uuid) -> bool {
        let entry = {
            let mut peers = self.peers.lock().await;

            let is_current = peers
                .get(identity)
                .is_some_and(|entry| entry.connection_id == connection_id);

            if !is_current {
                debug!(
                    target: "chat.hub",
                    nickname = %identity,
                    connection_id = %connection_id,
                    "Connection already superseded or pruned"
                );
                return false;
            }

            let entry = peers.remove(identity);
            metrics::set_connections_active(peers.len());
            entry
        };

        if let Some(entry) = entry {
            close_sink(entry.sink, self.write_timeout).await;
        }
        true
    }

    /// Write `payload` to every registered peer except `sender`.
    ///
    /// Peer failures never abort the fan-out and never surface as an error.
    /// Failed or timed-out peers are removed before the lock is released.
    #[instrument(skip_all, fields(sender = %sender))]
    pub async fn broadcast(&self, sender: &str, payload: &str) -> BroadcastSummary {
        let started = Instant::now();
        let mut peers = self.peers.lock().await;
        let mut summary = BroadcastSummary::default();
        let mut failed: Vec<(String, PruneReason)> = Vec::new();

        for (identity, entry) in peers.iter_mut() {
            if identity == sender {
                continue;
            }
            summary.attempted += 1;

            let write = entry.sink.send_text(payload.to_string());
            match tokio::time::timeout(self.write_timeout, write).await {
                Ok(Ok(())) => summary.delivered += 1,
                Ok(Err(e)) => failed.push((identity.clone(), PruneReason::WriteError(e))),
                Err(_) => failed.push((identity.clone(), PruneReason::Timeout)),
            }
        }

        for (identity, reason) in failed {
            let Some(entry) = peers.remove(&identity) else {
                continue;
            };
            match &reason {
                PruneReason::WriteError(e) => warn!(
                    target: "chat.hub",
                    nickname = %identity,
                    error = %e,
                    "Peer write failed, removing from hub"
                ),
                PruneReason::Timeout => warn!(
                    target: "chat.hub",
                    nickname = %identity,
                    timeout_ms = self.write_timeout.as_millis(),
                    "Peer write timed out, removing from hub"
                ),
            }
            self.evict(entry, Eviction::Pruned);
            metrics::record_peer_pruned(reason.label());
            summary.pruned.push(identity);
        }

        if !summary.pruned.is_empty() {
            metrics::set_connections_active(peers.len());
        }
        drop(peers);

        metrics::record_broadcast(summary.delivered, started.elapsed());
        summary
    }

    /// Number of registered connections.
    pub async fn len(&self) -> usize {
        self.peers.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.peers.lock().await.is_empty()
    }

    pub async fn contains(&self, identity: &str) -> bool {
        self.peers.lock().await.contains_key(identity)
    }

    /// Signal the owning connection and close its sink off the lock.
    fn evict(&self, entry: PeerEntry, reason: Eviction) {
        // The receiver is gone once that connection's reader has stopped.
        let _ = entry.eviction.send(reason);
        tokio::spawn(close_sink(entry.sink, self.write_timeout));
    }
}

async fn close_sink(mut sink: Box<dyn PeerSink>, deadline: Duration) {
    match tokio::time::timeout(deadline, sink.close()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => debug!(target: "chat.hub", error = %e, "Closing removed peer failed"),
        Err(_) => debug!(target: "chat.hub", "Closing removed peer timed out"),
    }
}
