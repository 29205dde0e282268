//! Metrics definitions for the chat service.
//!
//! All metrics follow Prometheus naming conventions:
//! - `chat_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded by code, never by user input:
//! - `outcome`: accepted, rejected, success, conflict, invalid, error
//! - `reason`: write_error, timeout
//! - `source`: cache, store, miss, error
//!
//! Nicknames never appear in labels.

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize the global Prometheus recorder and return the handle used by
/// `GET /metrics`.
///
/// # Errors
///
/// Returns error if a recorder is already installed.
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("chat_broadcast_duration_seconds".to_string()),
            &[
                0.0005, 0.001, 0.0025, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 1.000, 5.000,
            ],
        )
        .map_err(|e| format!("Failed to set broadcast buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

/// Build a handle without installing a global recorder.
///
/// Used by in-process servers (tests) that still need a `/metrics` route.
pub fn detached_handle() -> PrometheusHandle {
    PrometheusBuilder::new().build_recorder().handle()
}

// ============================================================================
// Connection Metrics
// ============================================================================

/// Record a handshake outcome.
///
/// Metric: `chat_handshakes_total`
/// Labels: `outcome` ("accepted" or "rejected")
pub fn record_handshake(outcome: &str) {
    counter!("chat_handshakes_total", "outcome" => outcome.to_string()).increment(1);
}

/// Set the number of registered connections.
///
/// Metric: `chat_connections_active`
#[allow(clippy::cast_precision_loss)]
pub fn set_connections_active(count: usize) {
    gauge!("chat_connections_active").set(count as f64);
}

// ============================================================================
// Broadcast Metrics
// ============================================================================

/// Record one fan-out pass.
///
/// Metric: `chat_messages_delivered_total`, `chat_broadcast_duration_seconds`
pub fn record_broadcast(delivered: usize, duration: Duration) {
    counter!("chat_messages_delivered_total").increment(delivered as u64);
    histogram!("chat_broadcast_duration_seconds").record(duration.as_secs_f64());
}

/// Record a peer removed during broadcast.
///
/// Metric: `chat_peers_pruned_total`
/// Labels: `reason` ("write_error" or "timeout")
pub fn record_peer_pruned(reason: &str) {
    counter!("chat_peers_pruned_total", "reason" => reason.to_string()).increment(1);
}

// ============================================================================
// User Directory Metrics
// ============================================================================

/// Record where a credential lookup was answered from.
///
/// Metric: `chat_user_lookups_total`
/// Labels: `source` ("cache", "store", "miss", "error")
pub fn record_user_lookup(source: &str) {
    counter!("chat_user_lookups_total", "source" => source.to_string()).increment(1);
}

/// Record a registration attempt.
///
/// Metric: `chat_registrations_total`
/// Labels: `outcome` ("success", "conflict", "invalid", "error")
pub fn record_registration(outcome: &str) {
    counter!("chat_registrations_total", "outcome" => outcome.to_string()).increment(1);
}
