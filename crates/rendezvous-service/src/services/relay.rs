//! Live hand-off of messages to a connected peer.
//!
//! Once both occupants are present a posted message is written to the peer's
//! inbox and also pushed through a [`LiveRelay`]. The push is best effort:
//! the inbox copy is what guarantees delivery, so a failed push is logged and
//! counted but never turns a successful post into an error.
//!
//! Pushes are issued after the store write and are not sequenced against
//! each other, so two concurrent posts from one sender may be pushed in the
//! opposite order to the one they hold in the inbox. The inbox order is
//! authoritative; a transport that needs strict ordering reads
//! `POST /inbox` instead of relying on push order.

use crate::room::Message;
use async_trait::async_trait;
use common::types::{ClientId, RoomId};
use std::collections::HashMap;
use std::sync::Mutex;
use thiserror::Error;
use tokio::sync::mpsc;

/// Per-subscriber queue depth for [`ChannelRelay`].
pub const DEFAULT_SUBSCRIBER_CAPACITY: usize = 64;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RelayError {
    /// The subscriber's queue is full.
    #[error("subscriber queue full")]
    Backpressure,

    /// The subscriber went away.
    #[error("subscriber closed")]
    Closed,

    /// Relay-specific failure.
    #[error("relay failure: {0}")]
    Failed(String),
}

/// Push channel towards a connected occupant.
#[async_trait]
pub trait LiveRelay: Send + Sync {
    /// Deliver `message` to `to` in `room_id` if it is connected.
    ///
    /// Having no live connection is not an error.
    async fn push(&self, room_id: &RoomId, to: &ClientId, message: &Message)
        -> Result<(), RelayError>;

    /// Forget any live connection held for `client_id`; it has left the room.
    fn disconnect(&self, _room_id: &RoomId, _client_id: &ClientId) {}
}

/// Relay that discards every push. Occupants read their inbox instead.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopRelay;

#[async_trait]
impl LiveRelay for NoopRelay {
    async fn push(&self, _: &RoomId, _: &ClientId, _: &Message) -> Result<(), RelayError> {
        Ok(())
    }
}

type SubscriberKey = (RoomId, ClientId);

/// In-process relay: a transport subscribes per occupant and receives pushes
/// on a bounded channel.
#[derive(Debug)]
pub struct ChannelRelay {
    subscribers: Mutex<HashMap<SubscriberKey, mpsc::Sender<Message>>>,
    capacity: usize,
}

impl Default for ChannelRelay {
    fn default() -> Self {
        Self::new(DEFAULT_SUBSCRIBER_CAPACITY)
    }
}

impl ChannelRelay {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            subscribers: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    /// Register a live connection for an occupant, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns `RelayError::Failed` if the subscriber map is poisoned.
    pub fn subscribe(
        &self,
        room_id: RoomId,
        client_id: ClientId,
    ) -> Result<mpsc::Receiver<Message>, RelayError> {
        let (tx, rx) = mpsc::channel(self.capacity);
        self.subscribers
            .lock()
            .map_err(|_| RelayError::Failed("subscriber map poisoned".to_string()))?
            .insert((room_id, client_id), tx);
        Ok(rx)
    }

    /// Drop the live connection for an occupant, if any.
    pub fn unsubscribe(&self, room_id: &RoomId, client_id: &ClientId) {
        if let Ok(mut subscribers) = self.subscribers.lock() {
            subscribers.retain(|(r, c), _| !(r == room_id && c == client_id));
        }
    }
}

#[async_trait]
impl LiveRelay for ChannelRelay {
    async fn push(
        &self,
        room_id: &RoomId,
        to: &ClientId,
        message: &Message,
    ) -> Result<(), RelayError> {
        let mut subscribers = self
            .subscribers
            .lock()
            .map_err(|_| RelayError::Failed("subscriber map poisoned".to_string()))?;

        let key = (room_id.clone(), to.clone());
        let Some(tx) = subscribers.get(&key) else {
            return Ok(());
        };

        match tx.try_send(message.clone()) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => Err(RelayError::Backpressure),
            Err(mpsc::error::TrySendError::Closed(_)) => {
                subscribers.remove(&key);
                Err(RelayError::Closed)
            }
        }
    }

    fn disconnect(&self, room_id: &RoomId, client_id: &ClientId) {
        self.unsubscribe(room_id, client_id);
    }
}
