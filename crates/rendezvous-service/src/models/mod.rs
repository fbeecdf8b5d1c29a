//! HTTP request/response models.
//!
//! Response bodies keep the field names and string-typed flags the existing
//! browser clients parse: `result` is an upper-case status word and
//! `is_initiator` is `"true"` or `"false"` as a string.

use crate::services::{DrainResult, JoinResult, PostResult};
use serde::{Deserialize, Serialize};

/// Status word carried in every room response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoomResult {
    Success,
    Full,
    InvalidRoom,
}

/// Parameters returned to a client that joined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinParams {
    pub client_id: String,
    /// `"true"` for the initiator, `"false"` for the joiner.
    pub is_initiator: String,
    pub room_id: String,
    pub messages: Vec<String>,
    pub error_messages: Vec<String>,
}

/// Response to `POST /join/:room_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinResponse {
    pub result: RoomResult,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<JoinParams>,
}

impl From<JoinResult> for JoinResponse {
    fn from(result: JoinResult) -> Self {
        match result {
            JoinResult::Success {
                client_id,
                is_initiator,
                room_id,
                messages,
                error_messages,
            } => JoinResponse {
                result: RoomResult::Success,
                params: Some(JoinParams {
                    client_id: client_id.into(),
                    is_initiator: is_initiator.to_string(),
                    room_id: room_id.into(),
                    messages,
                    error_messages,
                }),
            },
            JoinResult::Full => JoinResponse {
                result: RoomResult::Full,
                params: None,
            },
        }
    }
}

/// Response carrying only a status word (leave, message).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultResponse {
    pub result: RoomResult,
}

impl ResultResponse {
    #[must_use]
    pub fn success() -> Self {
        Self {
            result: RoomResult::Success,
        }
    }
}

impl From<PostResult> for ResultResponse {
    fn from(result: PostResult) -> Self {
        Self {
            result: match result {
                PostResult::Success => RoomResult::Success,
                PostResult::InvalidRoom => RoomResult::InvalidRoom,
            },
        }
    }
}

/// Response to `POST /inbox/:room_id/:client_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboxResponse {
    pub result: RoomResult,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub messages: Option<Vec<String>>,
}

impl From<DrainResult> for InboxResponse {
    fn from(result: DrainResult) -> Self {
        match result {
            DrainResult::Success { messages } => InboxResponse {
                result: RoomResult::Success,
                messages: Some(messages),
            },
            DrainResult::InvalidRoom => InboxResponse {
                result: RoomResult::InvalidRoom,
                messages: None,
            },
        }
    }
}

/// Readiness probe response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    /// "ready" or "not_ready".
    pub status: String,

    /// Room store status ("healthy" or "unhealthy").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store: Option<String>,

    /// Generic error for operators; details are in the logs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use common::types::{ClientId, RoomId};
    use serde_json::json;

    #[test]
    fn test_join_success_wire_shape() {
        let response = JoinResponse::from(JoinResult::Success {
            client_id: ClientId::parse("12345678").unwrap(),
            is_initiator: true,
            room_id: RoomId::parse("foo").unwrap(),
            messages: vec![],
            error_messages: vec![],
        });

        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({
                "result": "SUCCESS",
                "params": {
                    "client_id": "12345678",
                    "is_initiator": "true",
                    "room_id": "foo",
                    "messages": [],
                    "error_messages": []
                }
            })
        );
    }

    #[test]
    fn test_join_full_has_no_params() {
        let response = JoinResponse::from(JoinResult::Full);
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({ "result": "FULL" })
        );
    }

    #[test]
    fn test_post_results() {
        assert_eq!(
            serde_json::to_value(ResultResponse::from(PostResult::Success)).unwrap(),
            json!({ "result": "SUCCESS" })
        );
        assert_eq!(
            serde_json::to_value(ResultResponse::from(PostResult::InvalidRoom)).unwrap(),
            json!({ "result": "INVALID_ROOM" })
        );
    }

    #[test]
    fn test_inbox_shapes() {
        let drained = InboxResponse::from(DrainResult::Success {
            messages: vec!["a".to_string()],
        });
        assert_eq!(
            serde_json::to_value(&drained).unwrap(),
            json!({ "result": "SUCCESS", "messages": ["a"] })
        );

        let invalid = InboxResponse::from(DrainResult::InvalidRoom);
        assert_eq!(
            serde_json::to_value(&invalid).unwrap(),
            json!({ "result": "INVALID_ROOM" })
        );
    }
}
