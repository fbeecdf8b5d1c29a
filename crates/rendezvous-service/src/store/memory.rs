//! In-process room store.
//!
//! A `HashMap` behind a `std::sync::Mutex`. The lock is held only for the
//! duration of one `get` or one `compare_and_swap` and never across an
//! await, so it serializes writers per process without blocking requests on
//! each other's I/O.
//!
//! Versions come from one store-wide counter, so a room that is deleted and
//! created again never reuses a version a stale reader might still hold.

use super::{CasOutcome, RoomStore, StoreError, Version, Versioned, Write};
use crate::room::Room;
use async_trait::async_trait;
use common::types::RoomId;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct Rooms {
    by_id: HashMap<RoomId, (Version, Room)>,
    /// Last version handed out to any room.
    last_version: Version,
}

/// Room store for single-instance deployments and tests.
#[derive(Debug, Default)]
pub struct InMemoryRoomStore {
    rooms: Mutex<Rooms>,
}

impl InMemoryRoomStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Rooms>, StoreError> {
        self.rooms
            .lock()
            .map_err(|_| StoreError::Unavailable("room map lock poisoned".to_string()))
    }

    /// Number of rooms currently stored.
    pub fn room_count(&self) -> Result<usize, StoreError> {
        Ok(self.lock()?.by_id.len())
    }
}

#[async_trait]
impl RoomStore for InMemoryRoomStore {
    async fn get(&self, room_id: &RoomId) -> Result<Versioned, StoreError> {
        let rooms = self.lock()?;
        Ok(match rooms.by_id.get(room_id) {
            Some((version, room)) => Versioned {
                room: Some(room.clone()),
                version: *version,
            },
            None => Versioned::absent(),
        })
    }

    async fn compare_and_swap(
        &self,
        room_id: &RoomId,
        expected: Version,
        write: Write,
    ) -> Result<CasOutcome, StoreError> {
        let mut rooms = self.lock()?;
        let current = rooms.by_id.get(room_id).map_or(0, |(version, _)| *version);
        if current != expected {
            return Ok(CasOutcome::Conflict);
        }

        match write {
            Write::Put(room) => {
                rooms.last_version += 1;
                let version = rooms.last_version;
                rooms.by_id.insert(room_id.clone(), (version, room));
            }
            Write::Delete => {
                rooms.by_id.remove(room_id);
            }
        }
        Ok(CasOutcome::Swapped)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.lock().map(|_| ())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use common::types::ClientId;

    fn rid(s: &str) -> RoomId {
        RoomId::parse(s).unwrap()
    }

    fn room(client: &str) -> Room {
        Room::with_initiator(ClientId::parse(client).unwrap(), 0)
    }

    #[tokio::test]
    async fn test_absent_room_reads_version_zero() {
        let store = InMemoryRoomStore::new();
        assert_eq!(store.get(&rid("foo")).await.unwrap(), Versioned::absent());
    }

    #[tokio::test]
    async fn test_put_bumps_version() {
        let store = InMemoryRoomStore::new();

        let outcome = store
            .compare_and_swap(&rid("foo"), 0, Write::Put(room("a")))
            .await
            .unwrap();
        assert_eq!(outcome, CasOutcome::Swapped);

        let read = store.get(&rid("foo")).await.unwrap();
        assert_eq!(read.version, 1);
        assert_eq!(read.room, Some(room("a")));

        store
            .compare_and_swap(&rid("foo"), 1, Write::Put(room("b")))
            .await
            .unwrap();
        assert_eq!(store.get(&rid("foo")).await.unwrap().version, 2);
    }

    #[tokio::test]
    async fn test_recreated_room_rejects_write_from_before_delete() {
        let store = InMemoryRoomStore::new();
        store
            .compare_and_swap(&rid("foo"), 0, Write::Put(room("a")))
            .await
            .unwrap();
        let stale = store.get(&rid("foo")).await.unwrap();

        // a leaves, the room is deleted, c creates it again.
        store
            .compare_and_swap(&rid("foo"), stale.version, Write::Delete)
            .await
            .unwrap();
        let outcome = store
            .compare_and_swap(&rid("foo"), 0, Write::Put(room("c")))
            .await
            .unwrap();
        assert_eq!(outcome, CasOutcome::Swapped);

        let recreated = store.get(&rid("foo")).await.unwrap();
        assert_ne!(recreated.version, stale.version);

        // A writer still holding the first read must lose.
        for write in [Write::Put(room("j")), Write::Delete] {
            let outcome = store
                .compare_and_swap(&rid("foo"), stale.version, write)
                .await
                .unwrap();
            assert_eq!(outcome, CasOutcome::Conflict);
        }
        assert_eq!(store.get(&rid("foo")).await.unwrap().room, Some(room("c")));
    }

    #[tokio::test]
    async fn test_stale_version_conflicts_without_writing() {
        let store = InMemoryRoomStore::new();
        store
            .compare_and_swap(&rid("foo"), 0, Write::Put(room("a")))
            .await
            .unwrap();

        let outcome = store
            .compare_and_swap(&rid("foo"), 0, Write::Put(room("b")))
            .await
            .unwrap();
        assert_eq!(outcome, CasOutcome::Conflict);
        assert_eq!(store.get(&rid("foo")).await.unwrap().room, Some(room("a")));
    }

    #[tokio::test]
    async fn test_delete_removes_record() {
        let store = InMemoryRoomStore::new();
        store
            .compare_and_swap(&rid("foo"), 0, Write::Put(room("a")))
            .await
            .unwrap();

        let outcome = store
            .compare_and_swap(&rid("foo"), 1, Write::Delete)
            .await
            .unwrap();
        assert_eq!(outcome, CasOutcome::Swapped);
        assert_eq!(store.get(&rid("foo")).await.unwrap(), Versioned::absent());
        assert_eq!(store.room_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_rooms_are_independent() {
        let store = InMemoryRoomStore::new();
        store
            .compare_and_swap(&rid("one"), 0, Write::Put(room("a")))
            .await
            .unwrap();

        let outcome = store
            .compare_and_swap(&rid("two"), 0, Write::Put(room("b")))
            .await
            .unwrap();
        assert_eq!(outcome, CasOutcome::Swapped);
        assert_eq!(store.room_count().unwrap(), 2);
        assert!(store.ping().await.is_ok());
    }
}
