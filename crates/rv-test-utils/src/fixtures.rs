//! Deterministic collaborators and helpers for rendezvous tests.

use async_trait::async_trait;
use common::types::{ClientId, RoomId};
use rendezvous_service::errors::RvError;
use rendezvous_service::room::Message;
use rendezvous_service::services::{
    IdGenerator, LiveRelay, RelayError, RendezvousService, SecureIdGenerator, ServiceSettings,
};
use rendezvous_service::store::RoomStore;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Parse a room id, panicking on invalid input.
pub fn room(id: &str) -> RoomId {
    RoomId::parse(id).expect("valid room id")
}

/// Parse a client id, panicking on invalid input.
pub fn client(id: &str) -> ClientId {
    ClientId::parse(id).expect("valid client id")
}

/// Service over `store` with real ids and the given relay.
pub fn service_with(
    store: Arc<dyn RoomStore>,
    relay: Arc<dyn LiveRelay>,
) -> RendezvousService {
    RendezvousService::new(
        store,
        Arc::new(SecureIdGenerator::new()),
        relay,
        fast_settings(),
    )
}

/// Default settings with sub-millisecond backoff so retry tests stay quick.
pub fn fast_settings() -> ServiceSettings {
    let mut settings = ServiceSettings::default();
    settings.retry.backoff_base = std::time::Duration::from_micros(100);
    settings.retry.backoff_max = std::time::Duration::from_millis(1);
    settings
}

/// Id generator that replays a script, then counts upward.
///
/// Scripted ids make collisions reproducible: `scripted(["a", "a", "b"])`
/// hands out `a` twice before `b`.
#[derive(Debug, Default)]
pub struct SequentialIdGenerator {
    script: Mutex<VecDeque<String>>,
    next: AtomicU64,
}

impl SequentialIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scripted<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            script: Mutex::new(ids.into_iter().map(Into::into).collect()),
            next: AtomicU64::new(0),
        }
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn new_id(&self, length: usize) -> Result<String, RvError> {
        if let Some(id) = self.script.lock().unwrap().pop_front() {
            return Ok(id);
        }
        let n = self.next.fetch_add(1, Ordering::SeqCst);
        Ok(format!("{n:0length$}"))
    }
}

/// Relay that records every push and disconnect.
#[derive(Debug, Default)]
pub struct RecordingRelay {
    pushes: Mutex<Vec<(RoomId, ClientId, Message)>>,
    disconnects: Mutex<Vec<(RoomId, ClientId)>>,
}

impl RecordingRelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything pushed so far, in order.
    pub fn pushes(&self) -> Vec<(RoomId, ClientId, Message)> {
        self.pushes.lock().unwrap().clone()
    }

    /// Every occupant the relay was told to forget, in order.
    pub fn disconnects(&self) -> Vec<(RoomId, ClientId)> {
        self.disconnects.lock().unwrap().clone()
    }
}

#[async_trait]
impl LiveRelay for RecordingRelay {
    async fn push(
        &self,
        room_id: &RoomId,
        to: &ClientId,
        message: &Message,
    ) -> Result<(), RelayError> {
        self.pushes
            .lock()
            .unwrap()
            .push((room_id.clone(), to.clone(), message.clone()));
        Ok(())
    }

    fn disconnect(&self, room_id: &RoomId, client_id: &ClientId) {
        self.disconnects
            .lock()
            .unwrap()
            .push((room_id.clone(), client_id.clone()));
    }
}

/// Relay whose every push fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingRelay;

#[async_trait]
impl LiveRelay for FailingRelay {
    async fn push(&self, _: &RoomId, _: &ClientId, _: &Message) -> Result<(), RelayError> {
        Err(RelayError::Failed("transport down".to_string()))
    }
}
