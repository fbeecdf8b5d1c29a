//! Service layer.
//!
//! - [`rendezvous`] - room operations on top of the versioned store
//! - [`ids`] - client id generation
//! - [`relay`] - live hand-off of messages to connected peers

pub mod ids;
pub mod relay;
pub mod rendezvous;

pub use ids::{IdGenerator, SecureIdGenerator};
pub use relay::{ChannelRelay, LiveRelay, NoopRelay, RelayError};
pub use rendezvous::{
    DrainResult, JoinResult, PostResult, RendezvousService, RetryPolicy, ServiceSettings,
};
