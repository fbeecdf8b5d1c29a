//! # Rendezvous Test Utilities
//!
//! Fakes and fixtures for testing the rendezvous service without Redis or a
//! real client.
//!
//! ## Modules
//!
//! - `mock_store` - Room store wrapper that injects CAS conflicts and outages
//! - `fixtures` - Scripted id generator, recording and failing relays
//! - `server_harness` - Spawn the real router on a random port
//!
//! ## Usage
//!
//! ```rust,ignore
//! use rv_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() {
//!     let store = Arc::new(FlakyRoomStore::new().with_conflicts(2));
//!     let relay = Arc::new(RecordingRelay::new());
//!     let service = service_with(store.clone(), relay.clone());
//!
//!     // Joins succeed after two injected conflicts.
//!     service.join(&room("abc")).await.unwrap();
//!     assert_eq!(store.cas_calls(), 3);
//! }
//! ```

pub mod fixtures;
pub mod mock_store;
pub mod server_harness;

pub use fixtures::*;
pub use mock_store::FlakyRoomStore;
pub use server_harness::TestRvServer;
