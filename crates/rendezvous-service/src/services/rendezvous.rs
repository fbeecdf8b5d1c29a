//! Rendezvous orchestration.
//!
//! Every operation runs the same loop against the room store:
//!
//! 1. `get` the room and its version
//! 2. compute the next room with a pure transition from [`crate::room`]
//! 3. return straight away when nothing changes
//! 4. otherwise compare-and-swap; on conflict back off and start over
//!
//! Side effects (live relay push, metrics, logs) run only after the swap
//! landed, and never change the result handed to the caller.

use crate::config::Config;
use crate::errors::RvError;
use crate::observability::metrics::{
    record_cas_conflict, record_cas_exhausted, record_message, record_relay_failure,
    record_room_event, record_store_latency,
};
use crate::room::{
    self, DrainOutcome, DropReason, JoinOutcome, LeaveOutcome, Limits, Message, PostOutcome, Role,
    Room, Transition, TransitionError,
};
use crate::services::ids::IdGenerator;
use crate::services::relay::LiveRelay;
use crate::store::{CasOutcome, RoomStore, StoreError, Write};
use common::types::{ClientId, RoomId};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

/// Bounded exponential backoff for CAS conflicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    pub backoff_base: Duration,
    pub backoff_max: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: crate::config::DEFAULT_CAS_MAX_ATTEMPTS,
            backoff_base: Duration::from_millis(crate::config::DEFAULT_CAS_BACKOFF_BASE_MS),
            backoff_max: Duration::from_millis(crate::config::DEFAULT_CAS_BACKOFF_MAX_MS),
        }
    }
}

impl RetryPolicy {
    /// Delay after the `attempt`-th conflict (1-based): base, 2x base, 4x
    /// base, ... capped at `backoff_max`.
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32
            .checked_shl(attempt.saturating_sub(1))
            .unwrap_or(u32::MAX);
        self.backoff_base
            .saturating_mul(factor)
            .min(self.backoff_max)
    }
}

/// Tunables for [`RendezvousService`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceSettings {
    pub retry: RetryPolicy,
    pub limits: Limits,
    pub client_id_length: usize,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            limits: Limits {
                max_buffered_messages: crate::config::DEFAULT_MAX_BUFFERED_MESSAGES,
            },
            client_id_length: crate::config::DEFAULT_CLIENT_ID_LENGTH,
        }
    }
}

impl ServiceSettings {
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            retry: RetryPolicy {
                max_attempts: config.cas_max_attempts,
                backoff_base: Duration::from_millis(config.cas_backoff_base_ms),
                backoff_max: Duration::from_millis(config.cas_backoff_max_ms),
            },
            limits: Limits {
                max_buffered_messages: config.max_buffered_messages,
            },
            client_id_length: config.client_id_length,
        }
    }
}

/// Result of [`RendezvousService::join`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinResult {
    Success {
        client_id: ClientId,
        is_initiator: bool,
        room_id: RoomId,
        /// Messages the peer posted before this occupant arrived.
        messages: Vec<Message>,
        /// Reserved for non-fatal warnings; always empty.
        error_messages: Vec<String>,
    },
    Full,
}

/// Result of [`RendezvousService::post_message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostResult {
    /// Accepted. Covers delivered, buffered and silently dropped messages.
    Success,
    /// The room does not exist or the sender is not in it.
    InvalidRoom,
}

/// Result of [`RendezvousService::drain_inbox`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrainResult {
    Success { messages: Vec<Message> },
    InvalidRoom,
}

/// What a single pass of the CAS loop decided.
enum Attempt<T> {
    Apply(Transition<T>),
    /// Discard this pass and try again, counting it as an attempt.
    Redraw,
}

/// Coordinates joins, leaves and message posts for all rooms.
pub struct RendezvousService {
    store: Arc<dyn RoomStore>,
    ids: Arc<dyn IdGenerator>,
    relay: Arc<dyn LiveRelay>,
    settings: ServiceSettings,
}

impl RendezvousService {
    pub fn new(
        store: Arc<dyn RoomStore>,
        ids: Arc<dyn IdGenerator>,
        relay: Arc<dyn LiveRelay>,
        settings: ServiceSettings,
    ) -> Self {
        Self {
            store,
            ids,
            relay,
            settings,
        }
    }

    #[must_use]
    pub fn settings(&self) -> &ServiceSettings {
        &self.settings
    }

    /// Admit a new occupant with a freshly generated client id.
    ///
    /// # Errors
    ///
    /// `ConflictRetriesExhausted` under sustained contention,
    /// `StoreUnavailable` if the store cannot be reached, `IdGeneration` if
    /// no id can be drawn.
    #[instrument(skip_all, fields(room_id = %room_id))]
    pub async fn join(&self, room_id: &RoomId) -> Result<JoinResult, RvError> {
        let now = chrono::Utc::now().timestamp();

        let outcome = self
            .run("join", room_id, |current| {
                let candidate = self.draw_client_id()?;
                match room::join(current, candidate, now) {
                    Ok(transition) => Ok(Attempt::Apply(transition)),
                    Err(TransitionError::DuplicateClientId(_)) => {
                        debug!(target: "rv.service.rendezvous", "Client id collided, redrawing");
                        Ok(Attempt::Redraw)
                    }
                }
            })
            .await?;

        match outcome {
            JoinOutcome::Joined {
                client_id,
                role,
                messages,
            } => {
                record_room_event("join");
                info!(
                    target: "rv.service.rendezvous",
                    client_id = %client_id,
                    role = role.as_str(),
                    handed_over = messages.len(),
                    "Client joined room"
                );
                Ok(JoinResult::Success {
                    client_id,
                    is_initiator: role == Role::Initiator,
                    room_id: room_id.clone(),
                    messages,
                    error_messages: Vec::new(),
                })
            }
            JoinOutcome::Full => {
                record_room_event("full");
                info!(target: "rv.service.rendezvous", "Room full, join rejected");
                Ok(JoinResult::Full)
            }
        }
    }

    /// Remove an occupant. Unknown rooms and clients are a successful no-op.
    ///
    /// # Errors
    ///
    /// `ConflictRetriesExhausted` or `StoreUnavailable`.
    #[instrument(skip_all, fields(room_id = %room_id, client_id = %client_id))]
    pub async fn leave(&self, room_id: &RoomId, client_id: &ClientId) -> Result<(), RvError> {
        let outcome = self
            .run("leave", room_id, |current| {
                Ok(Attempt::Apply(room::leave(current, client_id)))
            })
            .await?;

        match outcome {
            LeaveOutcome::Left { remaining } => {
                self.relay.disconnect(room_id, client_id);
                record_room_event("leave");
                info!(
                    target: "rv.service.rendezvous",
                    remaining = remaining,
                    "Client left room"
                );
            }
            LeaveOutcome::NotPresent => {
                debug!(target: "rv.service.rendezvous", "Leave for absent client ignored");
            }
        }
        Ok(())
    }

    /// Route a message from `sender` to the other occupant.
    ///
    /// # Errors
    ///
    /// `ConflictRetriesExhausted` or `StoreUnavailable`. A failed live push
    /// is not an error.
    #[instrument(skip_all, fields(room_id = %room_id, client_id = %sender, message_len = message.len()))]
    pub async fn post_message(
        &self,
        room_id: &RoomId,
        sender: &ClientId,
        message: Message,
    ) -> Result<PostResult, RvError> {
        let limits = self.settings.limits;

        let outcome = self
            .run("post_message", room_id, |current| {
                Ok(Attempt::Apply(room::post_message(
                    current,
                    sender,
                    message.clone(),
                    &limits,
                )))
            })
            .await?;

        match outcome {
            PostOutcome::Delivered { to } => {
                record_message("delivered");
                // Unsequenced against concurrent posts; inbox order is authoritative.
                if let Err(e) = self.relay.push(room_id, &to, &message).await {
                    record_relay_failure();
                    warn!(
                        target: "rv.service.rendezvous",
                        error = %e,
                        "Live push failed, message remains in peer inbox"
                    );
                }
                Ok(PostResult::Success)
            }
            PostOutcome::Buffered => {
                record_message("buffered");
                debug!(target: "rv.service.rendezvous", "Message buffered for absent peer");
                Ok(PostResult::Success)
            }
            PostOutcome::Dropped(reason) => {
                record_message(match reason {
                    DropReason::PeerDeparted => "dropped_peer_departed",
                    DropReason::BufferFull => "dropped_buffer_full",
                });
                debug!(
                    target: "rv.service.rendezvous",
                    reason = reason.as_str(),
                    "Message dropped"
                );
                Ok(PostResult::Success)
            }
            PostOutcome::InvalidRoom => {
                record_message("invalid_room");
                debug!(target: "rv.service.rendezvous", "Message for unknown room or client");
                Ok(PostResult::InvalidRoom)
            }
        }
    }

    /// Return and clear everything queued for `client_id`.
    ///
    /// # Errors
    ///
    /// `ConflictRetriesExhausted` or `StoreUnavailable`.
    #[instrument(skip_all, fields(room_id = %room_id, client_id = %client_id))]
    pub async fn drain_inbox(
        &self,
        room_id: &RoomId,
        client_id: &ClientId,
    ) -> Result<DrainResult, RvError> {
        let outcome = self
            .run("drain_inbox", room_id, |current| {
                Ok(Attempt::Apply(room::drain_inbox(current, client_id)))
            })
            .await?;

        Ok(match outcome {
            DrainOutcome::Drained(messages) => DrainResult::Success { messages },
            DrainOutcome::InvalidRoom => DrainResult::InvalidRoom,
        })
    }

    /// Check that the store answers.
    ///
    /// # Errors
    ///
    /// `StoreUnavailable` if it does not.
    pub async fn ping_store(&self) -> Result<(), RvError> {
        self.store.ping().await.map_err(RvError::from)
    }

    fn draw_client_id(&self) -> Result<ClientId, RvError> {
        let raw = self.ids.new_id(self.settings.client_id_length)?;
        ClientId::parse(raw).map_err(|e| RvError::IdGeneration(e.to_string()))
    }

    /// Read, transition, compare-and-swap, retry.
    async fn run<T, F>(
        &self,
        operation: &'static str,
        room_id: &RoomId,
        mut step: F,
    ) -> Result<T, RvError>
    where
        F: FnMut(Option<&Room>) -> Result<Attempt<T>, RvError>,
    {
        let retry = self.settings.retry;

        for attempt in 1..=retry.max_attempts {
            let read = timed("get", self.store.get(room_id)).await?;

            let Transition { next, outcome } = match step(read.room.as_ref())? {
                Attempt::Apply(transition) => transition,
                Attempt::Redraw => continue,
            };

            let Some(write) = Write::from_next(next) else {
                return Ok(outcome);
            };

            match timed("cas", self.store.compare_and_swap(room_id, read.version, write)).await? {
                CasOutcome::Swapped => return Ok(outcome),
                CasOutcome::Conflict => {
                    record_cas_conflict(operation);
                    debug!(
                        target: "rv.service.rendezvous",
                        operation = operation,
                        attempt = attempt,
                        version = read.version,
                        "Room changed concurrently, retrying"
                    );
                    if attempt < retry.max_attempts {
                        tokio::time::sleep(retry.backoff(attempt)).await;
                    }
                }
            }
        }

        record_cas_exhausted(operation);
        warn!(
            target: "rv.service.rendezvous",
            operation = operation,
            attempts = retry.max_attempts,
            "Compare-and-swap retries exhausted"
        );
        Err(RvError::ConflictRetriesExhausted {
            room_id: room_id.to_string(),
            attempts: retry.max_attempts,
        })
    }
}

/// Await a store call, recording its latency and logging failures.
async fn timed<T>(
    operation: &'static str,
    call: impl Future<Output = Result<T, StoreError>>,
) -> Result<T, RvError> {
    let start = Instant::now();
    let result = call.await;
    record_store_latency(operation, start.elapsed());

    result.map_err(|e| {
        warn!(
            target: "rv.service.rendezvous",
            operation = operation,
            error = %e,
            "Room store call failed"
        );
        RvError::from(e)
    })
}
