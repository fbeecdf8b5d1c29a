//! Room handlers.
//!
//! | Route | Service call |
//! |-------|--------------|
//! | `POST /join/:room_id` | [`RendezvousService::join`] |
//! | `POST /leave/:room_id/:client_id` | [`RendezvousService::leave`] |
//! | `POST /message/:room_id/:client_id` | [`RendezvousService::post_message`] |
//! | `POST /inbox/:room_id/:client_id` | [`RendezvousService::drain_inbox`] |
//!
//! `FULL` and `INVALID_ROOM` are answered with 200 and a status word; only
//! malformed ids and infrastructure failures produce error statuses.
//!
//! [`RendezvousService::join`]: crate::services::RendezvousService::join
//! [`RendezvousService::leave`]: crate::services::RendezvousService::leave
//! [`RendezvousService::post_message`]: crate::services::RendezvousService::post_message
//! [`RendezvousService::drain_inbox`]: crate::services::RendezvousService::drain_inbox

use crate::errors::RvError;
use crate::models::{InboxResponse, JoinResponse, ResultResponse};
use crate::routes::AppState;
use axum::extract::{Path, State};
use axum::Json;
use common::types::{ClientId, RoomId};
use std::sync::Arc;
use tracing::instrument;

fn parse_ids(room_id: String, client_id: String) -> Result<(RoomId, ClientId), RvError> {
    Ok((RoomId::parse(room_id)?, ClientId::parse(client_id)?))
}

/// Handler for `POST /join/:room_id`.
#[instrument(skip_all, name = "rv.rooms.join")]
pub async fn join_room(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
) -> Result<Json<JoinResponse>, RvError> {
    let room_id = RoomId::parse(room_id)?;
    let result = state.service.join(&room_id).await?;
    Ok(Json(result.into()))
}

/// Handler for `POST /leave/:room_id/:client_id`. Always `SUCCESS`.
#[instrument(skip_all, name = "rv.rooms.leave")]
pub async fn leave_room(
    State(state): State<Arc<AppState>>,
    Path((room_id, client_id)): Path<(String, String)>,
) -> Result<Json<ResultResponse>, RvError> {
    let (room_id, client_id) = parse_ids(room_id, client_id)?;
    state.service.leave(&room_id, &client_id).await?;
    Ok(Json(ResultResponse::success()))
}

/// Handler for `POST /message/:room_id/:client_id`.
///
/// The request body is the opaque message, taken verbatim as UTF-8 text.
#[instrument(skip_all, name = "rv.rooms.message")]
pub async fn post_message(
    State(state): State<Arc<AppState>>,
    Path((room_id, client_id)): Path<(String, String)>,
    body: String,
) -> Result<Json<ResultResponse>, RvError> {
    let (room_id, client_id) = parse_ids(room_id, client_id)?;
    let result = state
        .service
        .post_message(&room_id, &client_id, body)
        .await?;
    Ok(Json(result.into()))
}

/// Handler for `POST /inbox/:room_id/:client_id`.
#[instrument(skip_all, name = "rv.rooms.inbox")]
pub async fn drain_inbox(
    State(state): State<Arc<AppState>>,
    Path((room_id, client_id)): Path<(String, String)>,
) -> Result<Json<InboxResponse>, RvError> {
    let (room_id, client_id) = parse_ids(room_id, client_id)?;
    let result = state.service.drain_inbox(&room_id, &client_id).await?;
    Ok(Json(result.into()))
}
