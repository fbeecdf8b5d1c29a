//! HTTP request handlers for the rendezvous service.

pub mod health;
pub mod metrics;
pub mod rooms;

pub use health::{health_check, readiness_check};
pub use metrics::metrics_handler;
pub use rooms::{drain_inbox, join_room, leave_room, post_message};
