//! Room entities.
//!
//! A [`Room`] is the value stored under a room id. It is plain data:
//! serializable, cloneable and compared by value, so the store can version
//! it and the transition functions in [`transitions`] can compute the next
//! value without touching shared state.
//!
//! # Invariants
//!
//! - `occupants.len()` is 1 or 2 for every persisted room; leaving the last
//!   occupant deletes the record instead of storing an empty room.
//! - At most one occupant holds each [`Role`]; a role never changes while
//!   its holder stays in the room.
//! - `pending` is only non-empty while a single occupant waits for a peer.

pub mod transitions;

use common::types::ClientId;
use serde::{Deserialize, Serialize};

pub use transitions::{
    drain_inbox, join, leave, post_message, DrainOutcome, DropReason, JoinOutcome, LeaveOutcome,
    Limits, Next, PostOutcome, Transition, TransitionError,
};

/// Maximum number of occupants in a room.
pub const ROOM_CAPACITY: usize = 2;

/// Opaque signaling payload. The core never parses it.
pub type Message = String;

/// Role of an occupant, fixed at join time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// First arrival; starts the peer connection offer.
    Initiator,
    /// Second arrival; answers the initiator.
    Joiner,
}

impl Role {
    /// The role a second occupant gets when `self` is already taken.
    #[must_use]
    pub fn counterpart(self) -> Role {
        match self {
            Role::Initiator => Role::Joiner,
            Role::Joiner => Role::Initiator,
        }
    }

    /// Metric/log label.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Initiator => "initiator",
            Role::Joiner => "joiner",
        }
    }
}

/// A participant holding a slot in a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occupant {
    pub client_id: ClientId,
    pub role: Role,
    /// Messages from the other occupant not yet drained by this one.
    #[serde(default)]
    pub inbox: Vec<Message>,
}

impl Occupant {
    #[must_use]
    pub fn new(client_id: ClientId, role: Role) -> Self {
        Self {
            client_id,
            role,
            inbox: Vec::new(),
        }
    }
}

/// Stored state of one room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    /// Occupants in arrival order.
    pub occupants: Vec<Occupant>,
    /// Messages posted by a lone occupant for the peer that has not arrived.
    #[serde(default)]
    pub pending: Vec<Message>,
    /// Set when one of two occupants left; the survivor's posts are dropped
    /// until a new peer joins.
    #[serde(default)]
    pub peer_departed: bool,
    /// Unix timestamp (seconds) of room creation.
    pub created_at: i64,
}

impl Room {
    /// Create a room holding its first occupant as initiator.
    #[must_use]
    pub fn with_initiator(client_id: ClientId, created_at: i64) -> Self {
        Self {
            occupants: vec![Occupant::new(client_id, Role::Initiator)],
            pending: Vec::new(),
            peer_departed: false,
            created_at,
        }
    }

    /// Number of current occupants.
    #[must_use]
    pub fn occupancy(&self) -> usize {
        self.occupants.len()
    }

    /// Whether the room has reached [`ROOM_CAPACITY`].
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.occupants.len() >= ROOM_CAPACITY
    }

    /// Look up an occupant by client id.
    #[must_use]
    pub fn occupant(&self, client_id: &ClientId) -> Option<&Occupant> {
        self.occupants.iter().find(|o| &o.client_id == client_id)
    }

    /// The occupant other than `client_id`, if present.
    #[must_use]
    pub fn peer_of(&self, client_id: &ClientId) -> Option<&Occupant> {
        self.occupants.iter().find(|o| &o.client_id != client_id)
    }
}
