//! HTTP routes for the rendezvous service.
//!
//! Defines the Axum router and application state.

use crate::config::Config;
use crate::handlers;
use crate::middleware::http_metrics_middleware;
use crate::observability::HealthState;
use crate::services::RendezvousService;
use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Request timeout applied to every route.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<RendezvousService>,
    pub health: Arc<HealthState>,
    pub config: Config,
}

/// Build the application routes.
///
/// - `POST /join/:room_id`
/// - `POST /leave/:room_id/:client_id`
/// - `POST /message/:room_id/:client_id` (body limited to `max_message_bytes`)
/// - `POST /inbox/:room_id/:client_id`
/// - `GET /health`, `GET /ready`, `GET /metrics`
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let max_message_bytes = state.config.max_message_bytes;

    let room_routes = Router::new()
        .route("/join/:room_id", post(handlers::join_room))
        .route("/leave/:room_id/:client_id", post(handlers::leave_room))
        .route(
            "/message/:room_id/:client_id",
            post(handlers::post_message).layer(DefaultBodyLimit::max(max_message_bytes)),
        )
        .route("/inbox/:room_id/:client_id", post(handlers::drain_inbox))
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .with_state(state);

    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    // Layer order (bottom-to-top execution):
    // 1. TimeoutLayer (innermost)
    // 2. TraceLayer
    // 3. http_metrics_middleware (outermost, sees every status)
    room_routes
        .merge(metrics_routes)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(middleware::from_fn(http_metrics_middleware))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_state_is_clone() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<AppState>();
    }

    #[test]
    fn test_app_state_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<AppState>();
    }
}
