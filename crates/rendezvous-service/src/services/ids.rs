//! Client identifier generation.
//!
//! Client ids are the only credential an occupant holds for its slot, so they
//! come from the OS CSPRNG via `ring` and are encoded as base62.

use crate::errors::RvError;
use ring::rand::{SecureRandom, SystemRandom};

/// Base62 alphabet for generated ids.
const BASE62_CHARS: &[u8; 62] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Largest multiple of 62 that fits in a byte. Bytes at or above it are
/// rejected so every character is uniformly distributed.
const REJECTION_THRESHOLD: u8 = 248;

/// Produces fresh unguessable identifiers.
pub trait IdGenerator: Send + Sync {
    /// Return a new identifier of exactly `length` characters.
    ///
    /// # Errors
    ///
    /// Returns `RvError::IdGeneration` if no randomness is available.
    fn new_id(&self, length: usize) -> Result<String, RvError>;
}

/// [`IdGenerator`] backed by `ring::rand::SystemRandom`.
#[derive(Debug)]
pub struct SecureIdGenerator {
    rng: SystemRandom,
}

impl Default for SecureIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl SecureIdGenerator {
    #[must_use]
    pub fn new() -> Self {
        Self {
            rng: SystemRandom::new(),
        }
    }
}

impl IdGenerator for SecureIdGenerator {
    fn new_id(&self, length: usize) -> Result<String, RvError> {
        let mut id = String::with_capacity(length);
        // Rejection discards ~3% of bytes; one spare byte per char is plenty.
        let mut bytes = vec![0u8; length.saturating_mul(2).max(8)];

        while id.len() < length {
            self.rng.fill(&mut bytes).map_err(|e| {
                tracing::error!(target: "rv.services.ids", error = %e, "Failed to generate random bytes for client id");
                RvError::IdGeneration("RNG failure".to_string())
            })?;

            for &b in bytes.iter().filter(|&&b| b < REJECTION_THRESHOLD) {
                if id.len() == length {
                    break;
                }
                let ch = BASE62_CHARS
                    .get(usize::from(b % 62))
                    .ok_or_else(|| RvError::IdGeneration("Base62 index out of range".to_string()))?;
                id.push(char::from(*ch));
            }
        }

        Ok(id)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generates_requested_length() {
        let ids = SecureIdGenerator::new();
        for length in [1, 8, 21, 64] {
            assert_eq!(ids.new_id(length).unwrap().len(), length);
        }
    }

    #[test]
    fn test_only_base62_characters() {
        let ids = SecureIdGenerator::new();
        let id = ids.new_id(64).unwrap();
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric()), "got {id}");
    }

    #[test]
    fn test_ids_are_unique() {
        let ids = SecureIdGenerator::new();
        let drawn: HashSet<String> = (0..1000).map(|_| ids.new_id(16).unwrap()).collect();
        assert_eq!(drawn.len(), 1000);
    }

    #[test]
    fn test_zero_length_is_empty() {
        let ids = SecureIdGenerator::new();
        assert_eq!(ids.new_id(0).unwrap(), "");
    }
}
