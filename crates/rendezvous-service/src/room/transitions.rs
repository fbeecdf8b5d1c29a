//! Pure room transitions.
//!
//! Each function takes the current stored value (`None` when the room is
//! absent) and returns the value to write back together with the outcome
//! the caller reports. Nothing here performs I/O; the rendezvous service
//! applies the result with compare-and-swap and re-runs the function
//! against fresh state when it loses a race.
//!
//! ```text
//! Absent ──join──> Occupied(1) ──join──> Occupied(2) ──join──> Full (no write)
//!   ^                 │    ^                  │
//!   └─────leave───────┘    └──────leave───────┘
//! ```

use super::{Message, Occupant, Role, Room};
use common::types::ClientId;
use thiserror::Error;

/// What to write back after a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Next {
    /// No mutation; skip the write.
    Unchanged,
    /// Store this room.
    Put(Room),
    /// Remove the room record.
    Delete,
}

/// Result of applying a transition to a room value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition<T> {
    pub next: Next,
    pub outcome: T,
}

impl<T> Transition<T> {
    fn unchanged(outcome: T) -> Self {
        Self {
            next: Next::Unchanged,
            outcome,
        }
    }

    fn put(room: Room, outcome: T) -> Self {
        Self {
            next: Next::Put(room),
            outcome,
        }
    }
}

/// Bounds applied while buffering messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Maximum messages held for one recipient (inbox or pending).
    pub max_buffered_messages: usize,
}

/// Outcome of a join attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinOutcome {
    /// The caller now holds a slot.
    Joined {
        client_id: ClientId,
        role: Role,
        /// Messages posted before the caller arrived, in post order.
        messages: Vec<Message>,
    },
    /// Both slots are taken.
    Full,
}

/// Outcome of a leave request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveOutcome {
    /// The occupant was removed; `remaining` occupants stay.
    Left { remaining: usize },
    /// The client was not in the room (already left, or never joined).
    NotPresent,
}

/// Why a post was accepted but not stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// The peer already left the room.
    PeerDeparted,
    /// The recipient's buffer is at its bound.
    BufferFull,
}

impl DropReason {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            DropReason::PeerDeparted => "peer_departed",
            DropReason::BufferFull => "buffer_full",
        }
    }
}

/// Outcome of posting a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostOutcome {
    /// Appended to the present peer's inbox; also push it live.
    Delivered { to: ClientId },
    /// Held for the peer that has not joined yet.
    Buffered,
    /// Accepted and discarded.
    Dropped(DropReason),
    /// The sender is not an occupant of an existing room.
    InvalidRoom,
}

/// Outcome of draining an occupant's inbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrainOutcome {
    /// The inbox contents in arrival order (possibly empty).
    Drained(Vec<Message>),
    /// The client is not an occupant of an existing room.
    InvalidRoom,
}

/// Precondition failures the caller can recover from.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    /// The candidate client id is already held by an occupant.
    #[error("client id {0} already present in room")]
    DuplicateClientId(ClientId),
}

/// Rooms with no occupants behave exactly like absent rooms.
fn live(current: Option<&Room>) -> Option<&Room> {
    current.filter(|room| !room.occupants.is_empty())
}

/// Admit `client_id` to the room if a slot is free.
///
/// # Errors
///
/// Returns [`TransitionError::DuplicateClientId`] if `client_id` collides
/// with a current occupant; the caller should draw a fresh id.
pub fn join(
    current: Option<&Room>,
    client_id: ClientId,
    now: i64,
) -> Result<Transition<JoinOutcome>, TransitionError> {
    let Some(room) = live(current) else {
        let room = Room::with_initiator(client_id.clone(), now);
        return Ok(Transition::put(
            room,
            JoinOutcome::Joined {
                client_id,
                role: Role::Initiator,
                messages: Vec::new(),
            },
        ));
    };

    if room.is_full() {
        return Ok(Transition::unchanged(JoinOutcome::Full));
    }

    if room.occupant(&client_id).is_some() {
        return Err(TransitionError::DuplicateClientId(client_id));
    }

    // The newcomer takes whichever role the survivor does not hold.
    let role = room
        .occupants
        .first()
        .map_or(Role::Initiator, |survivor| survivor.role.counterpart());

    let mut next = room.clone();
    let messages = std::mem::take(&mut next.pending);
    next.peer_departed = false;
    next.occupants.push(Occupant::new(client_id.clone(), role));

    Ok(Transition::put(
        next,
        JoinOutcome::Joined {
            client_id,
            role,
            messages,
        },
    ))
}

/// Remove `client_id` from the room. Unknown clients are a no-op.
#[must_use]
pub fn leave(current: Option<&Room>, client_id: &ClientId) -> Transition<LeaveOutcome> {
    let Some(room) = live(current) else {
        return Transition::unchanged(LeaveOutcome::NotPresent);
    };

    if room.occupant(client_id).is_none() {
        return Transition::unchanged(LeaveOutcome::NotPresent);
    }

    let mut next = room.clone();
    next.occupants.retain(|o| &o.client_id != client_id);
    let remaining = next.occupants.len();

    if remaining == 0 {
        return Transition {
            next: Next::Delete,
            outcome: LeaveOutcome::Left { remaining },
        };
    }

    // Messages the leaver queued for a future peer go with it.
    next.pending.clear();
    next.peer_departed = true;

    Transition::put(next, LeaveOutcome::Left { remaining })
}

/// Route `payload` from `sender` towards the other occupant.
#[must_use]
pub fn post_message(
    current: Option<&Room>,
    sender: &ClientId,
    payload: Message,
    limits: &Limits,
) -> Transition<PostOutcome> {
    let Some(room) = live(current) else {
        return Transition::unchanged(PostOutcome::InvalidRoom);
    };

    if room.occupant(sender).is_none() {
        return Transition::unchanged(PostOutcome::InvalidRoom);
    }

    if let Some(peer) = room.peer_of(sender) {
        if peer.inbox.len() >= limits.max_buffered_messages {
            return Transition::unchanged(PostOutcome::Dropped(DropReason::BufferFull));
        }

        let to = peer.client_id.clone();
        let mut next = room.clone();
        if let Some(peer) = next.occupants.iter_mut().find(|o| o.client_id == to) {
            peer.inbox.push(payload);
        }
        return Transition::put(next, PostOutcome::Delivered { to });
    }

    if room.peer_departed {
        return Transition::unchanged(PostOutcome::Dropped(DropReason::PeerDeparted));
    }

    if room.pending.len() >= limits.max_buffered_messages {
        return Transition::unchanged(PostOutcome::Dropped(DropReason::BufferFull));
    }

    let mut next = room.clone();
    next.pending.push(payload);
    Transition::put(next, PostOutcome::Buffered)
}

/// Hand over and clear everything queued in `client_id`'s inbox.
#[must_use]
pub fn drain_inbox(current: Option<&Room>, client_id: &ClientId) -> Transition<DrainOutcome> {
    let Some(room) = live(current) else {
        return Transition::unchanged(DrainOutcome::InvalidRoom);
    };

    let Some(occupant) = room.occupant(client_id) else {
        return Transition::unchanged(DrainOutcome::InvalidRoom);
    };

    if occupant.inbox.is_empty() {
        return Transition::unchanged(DrainOutcome::Drained(Vec::new()));
    }

    let mut next = room.clone();
    let messages = next
        .occupants
        .iter_mut()
        .find(|o| &o.client_id == client_id)
        .map(|o| std::mem::take(&mut o.inbox))
        .unwrap_or_default();

    Transition::put(next, DrainOutcome::Drained(messages))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    const LIMITS: Limits = Limits {
        max_buffered_messages: 4,
    };

    fn cid(s: &str) -> ClientId {
        ClientId::parse(s).unwrap()
    }

    fn stored(transition: &Transition<impl std::fmt::Debug>) -> Room {
        match &transition.next {
            Next::Put(room) => room.clone(),
            other => panic!("expected Put, got {other:?}"),
        }
    }

    fn two_occupants() -> Room {
        let first = join(None, cid("a"), 0).unwrap();
        let room = stored(&first);
        stored(&join(Some(&room), cid("b"), 0).unwrap())
    }

    #[test]
    fn test_first_join_creates_room_as_initiator() {
        let t = join(None, cid("a"), 42).unwrap();

        assert_eq!(
            t.outcome,
            JoinOutcome::Joined {
                client_id: cid("a"),
                role: Role::Initiator,
                messages: vec![],
            }
        );
        let room = stored(&t);
        assert_eq!(room.occupancy(), 1);
        assert_eq!(room.created_at, 42);
    }

    #[test]
    fn test_empty_room_record_behaves_as_absent() {
        let empty = Room {
            occupants: vec![],
            pending: vec!["stale".to_string()],
            peer_departed: true,
            created_at: 1,
        };

        let t = join(Some(&empty), cid("a"), 2).unwrap();
        let room = stored(&t);
        assert_eq!(room.occupants.first().unwrap().role, Role::Initiator);
        assert!(room.pending.is_empty());
        assert!(!room.peer_departed);
    }

    #[test]
    fn test_second_join_is_joiner_and_third_is_full() {
        let room = two_occupants();
        assert_eq!(room.occupants.get(1).unwrap().role, Role::Joiner);

        let t = join(Some(&room), cid("c"), 0).unwrap();
        assert_eq!(t.outcome, JoinOutcome::Full);
        assert_eq!(t.next, Next::Unchanged);
    }

    #[test]
    fn test_duplicate_candidate_id_is_rejected() {
        let room = stored(&join(None, cid("a"), 0).unwrap());

        assert_eq!(
            join(Some(&room), cid("a"), 0),
            Err(TransitionError::DuplicateClientId(cid("a")))
        );
    }

    #[test]
    fn test_pending_messages_handed_to_joiner_in_order() {
        let mut room = stored(&join(None, cid("a"), 0).unwrap());
        for msg in ["1", "2", "3"] {
            let t = post_message(Some(&room), &cid("a"), msg.to_string(), &LIMITS);
            assert_eq!(t.outcome, PostOutcome::Buffered);
            room = stored(&t);
        }

        let t = join(Some(&room), cid("b"), 0).unwrap();
        assert_eq!(
            t.outcome,
            JoinOutcome::Joined {
                client_id: cid("b"),
                role: Role::Joiner,
                messages: vec!["1".to_string(), "2".to_string(), "3".to_string()],
            }
        );
        assert!(stored(&t).pending.is_empty());
    }

    #[test]
    fn test_leave_is_idempotent() {
        let room = two_occupants();

        let first = leave(Some(&room), &cid("a"));
        assert_eq!(first.outcome, LeaveOutcome::Left { remaining: 1 });
        let after = stored(&first);

        let second = leave(Some(&after), &cid("a"));
        assert_eq!(second.outcome, LeaveOutcome::NotPresent);
        assert_eq!(second.next, Next::Unchanged);

        assert_eq!(leave(None, &cid("a")).outcome, LeaveOutcome::NotPresent);
    }

    #[test]
    fn test_last_leave_deletes_room() {
        let room = stored(&join(None, cid("a"), 0).unwrap());

        let t = leave(Some(&room), &cid("a"));
        assert_eq!(t.next, Next::Delete);
        assert_eq!(t.outcome, LeaveOutcome::Left { remaining: 0 });
    }

    #[test]
    fn test_survivor_keeps_role_and_newcomer_takes_vacant_role() {
        let room = two_occupants();

        // Initiator leaves; the joiner stays a joiner.
        let room = stored(&leave(Some(&room), &cid("a")));
        assert_eq!(room.occupants.first().unwrap().role, Role::Joiner);

        let t = join(Some(&room), cid("c"), 0).unwrap();
        assert!(matches!(
            t.outcome,
            JoinOutcome::Joined {
                role: Role::Initiator,
                ..
            }
        ));
        assert!(!stored(&t).peer_departed);
    }

    #[test]
    fn test_post_with_peer_present_goes_to_peer_inbox() {
        let room = two_occupants();

        let t = post_message(Some(&room), &cid("a"), "offer".to_string(), &LIMITS);
        assert_eq!(t.outcome, PostOutcome::Delivered { to: cid("b") });

        let room = stored(&t);
        assert_eq!(room.occupant(&cid("b")).unwrap().inbox, vec!["offer"]);
        assert!(room.occupant(&cid("a")).unwrap().inbox.is_empty());
    }

    #[test]
    fn test_post_after_peer_left_is_dropped() {
        let room = stored(&leave(Some(&two_occupants()), &cid("b")));

        let t = post_message(Some(&room), &cid("a"), "bye".to_string(), &LIMITS);
        assert_eq!(t.outcome, PostOutcome::Dropped(DropReason::PeerDeparted));
        assert_eq!(t.next, Next::Unchanged);
    }

    #[test]
    fn test_post_from_stranger_or_absent_room_is_invalid() {
        let room = two_occupants();

        let t = post_message(Some(&room), &cid("z"), "x".to_string(), &LIMITS);
        assert_eq!(t.outcome, PostOutcome::InvalidRoom);

        let t = post_message(None, &cid("a"), "x".to_string(), &LIMITS);
        assert_eq!(t.outcome, PostOutcome::InvalidRoom);
    }

    #[test]
    fn test_buffers_are_bounded() {
        let mut room = stored(&join(None, cid("a"), 0).unwrap());
        for i in 0..LIMITS.max_buffered_messages {
            room = stored(&post_message(Some(&room), &cid("a"), i.to_string(), &LIMITS));
        }

        let t = post_message(Some(&room), &cid("a"), "overflow".to_string(), &LIMITS);
        assert_eq!(t.outcome, PostOutcome::Dropped(DropReason::BufferFull));
        assert_eq!(t.next, Next::Unchanged);
    }

    #[test]
    fn test_drain_empties_inbox_once() {
        let room = two_occupants();
        let room = stored(&post_message(Some(&room), &cid("a"), "1".to_string(), &LIMITS));
        let room = stored(&post_message(Some(&room), &cid("a"), "2".to_string(), &LIMITS));

        let t = drain_inbox(Some(&room), &cid("b"));
        assert_eq!(
            t.outcome,
            DrainOutcome::Drained(vec!["1".to_string(), "2".to_string()])
        );
        let room = stored(&t);

        let again = drain_inbox(Some(&room), &cid("b"));
        assert_eq!(again.outcome, DrainOutcome::Drained(vec![]));
        assert_eq!(again.next, Next::Unchanged);

        assert_eq!(
            drain_inbox(Some(&room), &cid("z")).outcome,
            DrainOutcome::InvalidRoom
        );
    }
}
