//! Secret types for protecting sensitive values from accidental logging.
//!
//! Re-exports the [`secrecy`] types used across Rendezvous. The store
//! connection URL is the main customer: a Redis URL may embed a password
//! (`redis://:password@host:6379`), so configuration keeps it in a
//! [`SecretString`] and only the store constructor calls
//! [`ExposeSecret::expose_secret`].
//!
//! `SecretString` implements `Debug` with redaction, so any struct that
//! derives `Debug` while holding one is safe to log.
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretString};
//!
//! #[derive(Debug)]
//! struct StoreSettings {
//!     backend: String,
//!     url: SecretString,
//! }
//!
//! let settings = StoreSettings {
//!     backend: "redis".to_string(),
//!     url: SecretString::from("redis://:hunter2@cache:6379"),
//! };
//!
//! assert!(!format!("{settings:?}").contains("hunter2"));
//! assert_eq!(settings.url.expose_secret(), "redis://:hunter2@cache:6379");
//! ```

pub use secrecy::{ExposeSecret, SecretString};
