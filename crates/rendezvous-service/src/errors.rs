//! Rendezvous error types.
//!
//! Room outcomes such as `FULL` and `INVALID_ROOM` are ordinary return values
//! and never appear here. This enum only carries infrastructure failures and
//! request validation errors. Every variant maps to an HTTP status via the
//! `IntoResponse` impl; messages returned to clients are generic and the
//! detail is logged server-side.

use crate::store::StoreError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::types::IdError;
use serde::Serialize;
use thiserror::Error;

/// Rendezvous service error type.
///
/// Maps to HTTP status codes:
/// - `ConflictRetriesExhausted`, `StoreUnavailable`: 503 Service Unavailable
/// - `BadRequest`: 400 Bad Request
/// - `Serialization`, `IdGeneration`, `Internal`: 500 Internal Server Error
#[derive(Debug, Error)]
pub enum RvError {
    /// The CAS retry budget ran out under contention.
    #[error("Room {room_id} still contended after {attempts} attempts")]
    ConflictRetriesExhausted { room_id: String, attempts: u32 },

    /// The room store could not be reached.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// A stored room could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The identifier generator failed.
    #[error("Identifier generation failed: {0}")]
    IdGeneration(String),

    /// The request was malformed (bad room or client id).
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal error.
    #[error("Internal error")]
    Internal,
}

impl RvError {
    /// Returns the HTTP status code for this error (for metrics recording).
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            RvError::ConflictRetriesExhausted { .. } | RvError::StoreUnavailable(_) => 503,
            RvError::BadRequest(_) => 400,
            RvError::Serialization(_) | RvError::IdGeneration(_) | RvError::Internal => 500,
        }
    }

    /// Whether the caller may safely re-issue the request.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RvError::ConflictRetriesExhausted { .. } | RvError::StoreUnavailable(_)
        )
    }
}

impl From<StoreError> for RvError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(msg) => RvError::StoreUnavailable(msg),
            StoreError::Corrupt(msg) => RvError::Serialization(msg),
        }
    }
}

impl From<IdError> for RvError {
    fn from(err: IdError) -> Self {
        RvError::BadRequest(err.to_string())
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

impl IntoResponse for RvError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            RvError::ConflictRetriesExhausted { room_id, attempts } => {
                tracing::warn!(
                    target: "rv.errors",
                    room_id = %room_id,
                    attempts = attempts,
                    "Room contention exceeded retry budget"
                );
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "STORE_CONTENTION",
                    "Room is busy, please retry".to_string(),
                )
            }
            RvError::StoreUnavailable(err) => {
                tracing::error!(target: "rv.errors", error = %err, "Room store unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "STORE_UNAVAILABLE",
                    "Service temporarily unavailable, please retry later".to_string(),
                )
            }
            RvError::Serialization(err) => {
                tracing::error!(target: "rv.errors", error = %err, "Room record could not be decoded");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
            RvError::IdGeneration(err) => {
                tracing::error!(target: "rv.errors", error = %err, "Client id generation failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
            RvError::BadRequest(reason) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", reason.clone()),
            RvError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            ),
        };

        let body = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };

        (status, Json(body)).into_response()
    }
}
