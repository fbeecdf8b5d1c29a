//! Rendezvous Service Library
//!
//! Pairs two anonymous participants into an ephemeral room so they can
//! exchange signaling messages before a peer-to-peer media session starts.
//!
//! - Exact two-party capacity under concurrent joins
//! - Deterministic roles: first arrival is the initiator, second the joiner
//! - Messages posted before the peer arrives are handed over in order on join
//! - Rooms are deleted the moment the last occupant leaves
//!
//! # Architecture
//!
//! Handler -> Service -> Store, with the room rules kept as pure functions:
//!
//! ```text
//! routes/mod.rs -> handlers/*.rs -> services/rendezvous.rs -> store/*.rs
//!                                          │
//!                                          └── room/*.rs (pure transitions)
//! ```
//!
//! The store offers a single concurrency primitive, compare-and-swap on a
//! versioned room record. Every mutation is "read, compute next state, CAS,
//! retry on conflict", so no lock is held across requests and concurrent
//! joins can never produce a third occupant.
//!
//! # Modules
//!
//! - [`config`] - Service configuration from environment
//! - [`errors`] - Error types with HTTP status code mapping
//! - [`room`] - Room entities and transition functions
//! - [`store`] - Versioned room storage (in-memory and Redis)
//! - [`services`] - Rendezvous orchestration, id generation, live relay
//! - [`handlers`] / [`routes`] / [`models`] - HTTP surface
//! - [`observability`] - Health state and metrics

pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod room;
pub mod routes;
pub mod services;
pub mod store;
