//! Common utilities and types shared across Rendezvous components.

#![warn(clippy::pedantic)]

/// Module for room and client identifier types
pub mod types;

/// Module for secret types that prevent accidental logging
pub mod secret;
