//! Prometheus metrics endpoint.
//!
//! Unauthenticated so Prometheus can scrape it. Labels never carry
//! nicknames or other user input.

use axum::{extract::State, response::IntoResponse};
use metrics_exporter_prometheus::PrometheusHandle;

/// Handler for GET /metrics
#[tracing::instrument(skip_all, name = "chat.metrics.scrape")]
pub async fn metrics_handler(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    handle.render()
}
