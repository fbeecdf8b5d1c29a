//! Observability for the rendezvous service.
//!
//! # Privacy by Default
//!
//! Async operations use `#[instrument(skip_all)]` with an explicit field
//! allow-list. Room ids and client ids appear in spans; message payloads
//! never do, only their length. Metric labels never carry ids.

pub mod health;
pub mod metrics;

pub use health::HealthState;
pub use metrics::{
    init_metrics_recorder, record_cas_conflict, record_cas_exhausted, record_http_request,
    record_message, record_relay_failure, record_room_event, record_store_latency,
};
