//! Prometheus scrape endpoint.
//!
//! Unauthenticated. Labels never carry room ids, client ids or payloads.

use axum::{extract::State, response::IntoResponse};
use metrics_exporter_prometheus::PrometheusHandle;

/// Handler for `GET /metrics`.
#[tracing::instrument(skip_all, name = "rv.metrics.scrape")]
pub async fn metrics_handler(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    handle.render()
}
