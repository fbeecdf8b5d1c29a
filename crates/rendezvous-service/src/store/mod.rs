//! Versioned room storage.
//!
//! The store is the only place where mutual exclusion happens. It exposes a
//! read that returns the room together with its version, and a conditional
//! write that only lands when the version is still the one the caller read.
//! Everything above it is written as "read, compute, compare-and-swap,
//! retry".
//!
//! # Versions
//!
//! - An absent room reads as version `0`, or as the version its deletion
//!   left behind.
//! - Every successful write moves the room to a version it has never held
//!   before, including a `Delete` followed by a fresh create. A reader that
//!   saw the room before it was deleted therefore always conflicts against
//!   the recreated room.
//!
//! A reader that saw "absent" and races a create-then-delete may still
//! write against an absent room, which is exactly the state it computed
//! from.
//!
//! # Backends
//!
//! - [`InMemoryRoomStore`] - single process, mutex-guarded map
//! - [`RedisRoomStore`] - shared Redis, CAS in a Lua script

pub mod lua_scripts;
pub mod memory;
pub mod redis;

use crate::room::{Next, Room};
use async_trait::async_trait;
use common::types::RoomId;
use thiserror::Error;

pub use self::memory::InMemoryRoomStore;
pub use self::redis::RedisRoomStore;

/// Version token used for compare-and-swap.
pub type Version = u64;

/// A room read together with the version it was read at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Versioned {
    /// `None` when no record exists.
    pub room: Option<Room>,
    pub version: Version,
}

impl Versioned {
    /// The reading for a room that does not exist.
    #[must_use]
    pub fn absent() -> Self {
        Self {
            room: None,
            version: 0,
        }
    }
}

/// Conditional write applied by [`RoomStore::compare_and_swap`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Write {
    Put(Room),
    Delete,
}

impl Write {
    /// Convert a transition's next state into a write, if it needs one.
    #[must_use]
    pub fn from_next(next: Next) -> Option<Self> {
        match next {
            Next::Unchanged => None,
            Next::Put(room) => Some(Write::Put(room)),
            Next::Delete => Some(Write::Delete),
        }
    }

    /// Metric/log label.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Write::Put(_) => "put",
            Write::Delete => "delete",
        }
    }
}

/// Result of a conditional write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CasOutcome {
    /// The write landed.
    Swapped,
    /// Another writer changed the room first; re-read and retry.
    Conflict,
}

/// Room store failures.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store could not be reached or rejected the command.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A stored record could not be decoded.
    #[error("corrupt room record: {0}")]
    Corrupt(String),
}

/// Atomic read-modify-write access to rooms keyed by id.
///
/// Implementations must never expose a partially applied write: a reader
/// sees the room before or after a swap, never a mix.
#[async_trait]
pub trait RoomStore: Send + Sync {
    /// Read a room and its current version. Absence is not an error.
    async fn get(&self, room_id: &RoomId) -> Result<Versioned, StoreError>;

    /// Apply `write` only if the stored version still equals `expected`.
    async fn compare_and_swap(
        &self,
        room_id: &RoomId,
        expected: Version,
        write: Write,
    ) -> Result<CasOutcome, StoreError>;

    /// Cheap connectivity check for readiness probes.
    async fn ping(&self) -> Result<(), StoreError>;

    /// Backend name for logs.
    fn backend(&self) -> &'static str;
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use common::types::ClientId;

    #[test]
    fn test_write_from_next() {
        let room = Room::with_initiator(ClientId::parse("a").unwrap(), 0);

        assert_eq!(Write::from_next(Next::Unchanged), None);
        assert_eq!(Write::from_next(Next::Delete), Some(Write::Delete));
        assert_eq!(
            Write::from_next(Next::Put(room.clone())),
            Some(Write::Put(room))
        );
    }

    #[test]
    fn test_absent_reads_as_version_zero() {
        let v = Versioned::absent();
        assert!(v.room.is_none());
        assert_eq!(v.version, 0);
    }
}
