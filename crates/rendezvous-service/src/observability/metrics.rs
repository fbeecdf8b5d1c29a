//! Metrics definitions for the rendezvous service.
//!
//! All metrics follow Prometheus naming conventions:
//! - `rv_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded:
//! - `event`: join, full, leave
//! - `outcome`: delivered, buffered, dropped_peer_departed, dropped_buffer_full,
//!   invalid_room
//! - `operation`: join, leave, post_message, drain_inbox, get, cas
//! - `endpoint`: parameterized paths (room and client ids are never labels)
//!
//! # Metrics
//!
//! | Metric | Type | Labels |
//! |--------|------|--------|
//! | `rv_room_events_total` | Counter | `event` |
//! | `rv_messages_total` | Counter | `outcome` |
//! | `rv_cas_conflicts_total` | Counter | `operation` |
//! | `rv_cas_exhausted_total` | Counter | `operation` |
//! | `rv_store_latency_seconds` | Histogram | `operation` |
//! | `rv_relay_failures_total` | Counter | none |
//! | `rv_http_requests_total` | Counter | `method`, `endpoint`, `status_code` |
//! | `rv_http_request_duration_seconds` | Histogram | `method`, `endpoint`, `status` |

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Build the Prometheus recorder, install it globally and return the render
/// handle for the `/metrics` route.
///
/// # Errors
///
/// Returns an error string if bucket configuration is rejected or a recorder
/// is already installed.
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        // Store round trips: p99 target well under 10ms on a local Redis
        .set_buckets_for_metric(
            Matcher::Prefix("rv_store".to_string()),
            &[
                0.000_1, 0.000_5, 0.001, 0.002_5, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250,
            ],
        )
        .map_err(|e| format!("Failed to set store latency buckets: {e}"))?
        .set_buckets_for_metric(
            Matcher::Prefix("rv_http".to_string()),
            &[
                0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500,
            ],
        )
        .map_err(|e| format!("Failed to set HTTP buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

// ============================================================================
// Room Metrics
// ============================================================================

/// Record a room lifecycle event (`join`, `full`, `leave`).
///
/// Metric: `rv_room_events_total`
pub fn record_room_event(event: &'static str) {
    counter!("rv_room_events_total", "event" => event).increment(1);
}

/// Record the routing outcome of a posted message.
///
/// Metric: `rv_messages_total`
pub fn record_message(outcome: &'static str) {
    counter!("rv_messages_total", "outcome" => outcome).increment(1);
}

/// Record a failed live push. The post itself still succeeded.
///
/// Metric: `rv_relay_failures_total`
pub fn record_relay_failure() {
    counter!("rv_relay_failures_total").increment(1);
}

// ============================================================================
// Store Metrics
// ============================================================================

/// Record a compare-and-swap conflict that triggered a retry.
///
/// Metric: `rv_cas_conflicts_total`
pub fn record_cas_conflict(operation: &'static str) {
    counter!("rv_cas_conflicts_total", "operation" => operation).increment(1);
}

/// Record an operation that ran out of CAS attempts.
///
/// Metric: `rv_cas_exhausted_total`
pub fn record_cas_exhausted(operation: &'static str) {
    counter!("rv_cas_exhausted_total", "operation" => operation).increment(1);
}

/// Record the duration of one store round trip (`get` or `cas`).
///
/// Metric: `rv_store_latency_seconds`
pub fn record_store_latency(operation: &'static str, duration: Duration) {
    histogram!("rv_store_latency_seconds", "operation" => operation)
        .record(duration.as_secs_f64());
}

// ============================================================================
// HTTP Metrics
// ============================================================================

/// Record HTTP request completion.
///
/// Metric: `rv_http_requests_total`, `rv_http_request_duration_seconds`
pub fn record_http_request(method: &str, path: &str, status_code: u16, duration: Duration) {
    let endpoint = normalize_endpoint(path);
    let status = categorize_status_code(status_code);

    histogram!("rv_http_request_duration_seconds",
        "method" => method.to_string(),
        "endpoint" => endpoint,
        "status" => status
    )
    .record(duration.as_secs_f64());

    counter!("rv_http_requests_total",
        "method" => method.to_string(),
        "endpoint" => endpoint,
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

/// Categorize HTTP status code into success/error/timeout.
fn categorize_status_code(status_code: u16) -> &'static str {
    match status_code {
        200..=299 => "success",
        408 | 504 => "timeout",
        _ => "error",
    }
}

/// Replace room and client ids with placeholders.
fn normalize_endpoint(path: &str) -> &'static str {
    let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();
    match segments.as_slice() {
        ["health"] => "/health",
        ["ready"] => "/ready",
        ["metrics"] => "/metrics",
        ["join", room] if !room.is_empty() => "/join/{room_id}",
        ["leave", room, client] if !room.is_empty() && !client.is_empty() => {
            "/leave/{room_id}/{client_id}"
        }
        ["message", room, client] if !room.is_empty() && !client.is_empty() => {
            "/message/{room_id}/{client_id}"
        }
        ["inbox", room, client] if !room.is_empty() && !client.is_empty() => {
            "/inbox/{room_id}/{client_id}"
        }
        _ => "/other",
    }
}
