//! Fault-injecting room store.
//!
//! Wraps [`InMemoryRoomStore`] and can be told to:
//! - report a number of CAS conflicts before letting writes through
//! - fail every call as if the backend were down
//!
//! Call counters make retry behavior observable in assertions.
//!
//! # Example
//!
//! ```rust,ignore
//! let store = FlakyRoomStore::new().with_conflicts(3);
//! // The next three compare_and_swap calls return Conflict without writing.
//! ```

use async_trait::async_trait;
use common::types::RoomId;
use rendezvous_service::store::{
    CasOutcome, InMemoryRoomStore, RoomStore, StoreError, Version, Versioned, Write,
};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// Room store with scripted failures.
#[derive(Debug, Default)]
pub struct FlakyRoomStore {
    inner: InMemoryRoomStore,
    conflicts_remaining: AtomicU32,
    always_conflict: AtomicBool,
    unavailable: AtomicBool,
    get_calls: AtomicU32,
    cas_calls: AtomicU32,
}

impl FlakyRoomStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report `n` conflicts before CAS calls reach the inner store.
    pub fn with_conflicts(self, n: u32) -> Self {
        self.conflicts_remaining.store(n, Ordering::SeqCst);
        self
    }

    /// Make every CAS call conflict.
    pub fn always_conflicting(self) -> Self {
        self.always_conflict.store(true, Ordering::SeqCst);
        self
    }

    /// Toggle a simulated outage.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of `get` calls so far.
    pub fn get_calls(&self) -> u32 {
        self.get_calls.load(Ordering::SeqCst)
    }

    /// Number of `compare_and_swap` calls so far.
    pub fn cas_calls(&self) -> u32 {
        self.cas_calls.load(Ordering::SeqCst)
    }

    /// The wrapped store, for inspecting state directly.
    pub fn inner(&self) -> &InMemoryRoomStore {
        &self.inner
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("simulated outage".to_string()))
        } else {
            Ok(())
        }
    }

    fn take_conflict(&self) -> bool {
        if self.always_conflict.load(Ordering::SeqCst) {
            return true;
        }
        self.conflicts_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl RoomStore for FlakyRoomStore {
    async fn get(&self, room_id: &RoomId) -> Result<Versioned, StoreError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        self.inner.get(room_id).await
    }

    async fn compare_and_swap(
        &self,
        room_id: &RoomId,
        expected: Version,
        write: Write,
    ) -> Result<CasOutcome, StoreError> {
        self.cas_calls.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        if self.take_conflict() {
            return Ok(CasOutcome::Conflict);
        }
        self.inner.compare_and_swap(room_id, expected, write).await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.check_available()
    }

    fn backend(&self) -> &'static str {
        "flaky-memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::types::ClientId;
    use rendezvous_service::room::Room;

    fn room() -> Room {
        Room::with_initiator(ClientId::parse("a").unwrap(), 0)
    }

    #[tokio::test]
    async fn test_injected_conflicts_then_success() {
        let store = FlakyRoomStore::new().with_conflicts(2);
        let room_id = RoomId::parse("r").unwrap();

        for _ in 0..2 {
            let outcome = store
                .compare_and_swap(&room_id, 0, Write::Put(room()))
                .await
                .unwrap();
            assert_eq!(outcome, CasOutcome::Conflict);
        }

        let outcome = store
            .compare_and_swap(&room_id, 0, Write::Put(room()))
            .await
            .unwrap();
        assert_eq!(outcome, CasOutcome::Swapped);
        assert_eq!(store.cas_calls(), 3);
    }

    #[tokio::test]
    async fn test_outage_fails_all_calls() {
        let store = FlakyRoomStore::new();
        let room_id = RoomId::parse("r").unwrap();
        store.set_unavailable(true);

        assert!(matches!(
            store.get(&room_id).await,
            Err(StoreError::Unavailable(_))
        ));
        assert!(store.ping().await.is_err());

        store.set_unavailable(false);
        assert!(store.ping().await.is_ok());
    }
}
