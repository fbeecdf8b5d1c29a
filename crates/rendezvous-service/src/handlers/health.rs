//! Health check handlers.
//!
//! - `/health`: liveness, no dependency checks
//! - `/ready`: readiness, requires the ready flag and a store ping

use crate::models::ReadinessResponse;
use crate::routes::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use std::sync::Arc;

/// Liveness probe handler.
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    if state.health.is_live() {
        (StatusCode::OK, "OK")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "NOT LIVE")
    }
}

/// Readiness probe handler.
///
/// Errors are logged server-side; the response body stays generic.
#[tracing::instrument(skip_all, name = "rv.health.readiness")]
pub async fn readiness_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    if !state.health.is_ready() {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadinessResponse {
                status: "not_ready".to_string(),
                store: None,
                error: Some("Service is starting or shutting down".to_string()),
            }),
        );
    }

    if let Err(e) = state.service.ping_store().await {
        tracing::warn!(target: "rv.handlers.health", error = %e, "Readiness check failed: store ping");
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadinessResponse {
                status: "not_ready".to_string(),
                store: Some("unhealthy".to_string()),
                error: Some("Service dependencies unavailable".to_string()),
            }),
        );
    }

    (
        StatusCode::OK,
        Json(ReadinessResponse {
            status: "ready".to_string(),
            store: Some("healthy".to_string()),
            error: None,
        }),
    )
}
