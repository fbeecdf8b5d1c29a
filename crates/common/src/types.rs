//! Identifier types for Rendezvous components.
//!
//! Room and client identifiers are opaque strings compared by content. The
//! only checks are non-empty and at most [`MAX_ID_LENGTH`] bytes; any
//! characters are accepted, since store keys are binary-safe.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Maximum identifier length in bytes.
pub const MAX_ID_LENGTH: usize = 256;

/// Reasons an identifier is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    /// Identifier was empty.
    #[error("identifier must not be empty")]
    Empty,

    /// Identifier exceeded [`MAX_ID_LENGTH`] bytes.
    #[error("identifier is {0} bytes, maximum is {MAX_ID_LENGTH}")]
    TooLong(usize),
}

fn validate(raw: &str) -> Result<(), IdError> {
    if raw.is_empty() {
        return Err(IdError::Empty);
    }
    if raw.len() > MAX_ID_LENGTH {
        return Err(IdError::TooLong(raw.len()));
    }
    Ok(())
}

/// Identifier of a room, supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoomId(String);

impl RoomId {
    /// Parse and validate a room identifier.
    ///
    /// # Errors
    ///
    /// Returns [`IdError`] if the identifier is empty or too long.
    pub fn parse(raw: impl Into<String>) -> Result<Self, IdError> {
        let raw = raw.into();
        validate(&raw)?;
        Ok(Self(raw))
    }

    /// Borrow the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Identifier of an occupant within a room, generated at join time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClientId(String);

impl ClientId {
    /// Parse and validate a client identifier.
    ///
    /// # Errors
    ///
    /// Returns [`IdError`] if the identifier is empty or too long.
    pub fn parse(raw: impl Into<String>) -> Result<Self, IdError> {
        let raw = raw.into();
        validate(&raw)?;
        Ok(Self(raw))
    }

    /// Borrow the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

macro_rules! id_conversions {
    ($ty:ident) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $ty {
            type Err = IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl TryFrom<String> for $ty {
            type Error = IdError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::parse(value)
            }
        }

        impl From<$ty> for String {
            fn from(id: $ty) -> Self {
                id.0
            }
        }

        impl AsRef<str> for $ty {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

id_conversions!(RoomId);
id_conversions!(ClientId);

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_room_id_accepts_plain_names() {
        let id = RoomId::parse("foo").unwrap();
        assert_eq!(id.as_str(), "foo");
        assert_eq!(id.to_string(), "foo");
    }

    #[test]
    fn test_ids_compare_by_content() {
        assert_eq!(
            ClientId::parse("12345678").unwrap(),
            "12345678".parse::<ClientId>().unwrap()
        );
        assert_ne!(RoomId::parse("a").unwrap(), RoomId::parse("b").unwrap());
    }

    #[test]
    fn test_rejects_empty_and_oversized() {
        assert_eq!(RoomId::parse(""), Err(IdError::Empty));

        let long = "x".repeat(MAX_ID_LENGTH + 1);
        assert_eq!(
            ClientId::parse(long),
            Err(IdError::TooLong(MAX_ID_LENGTH + 1))
        );

        let max = "x".repeat(MAX_ID_LENGTH);
        assert!(RoomId::parse(max).is_ok());
    }

    #[test]
    fn test_room_id_is_opaque() {
        for raw in ["a b", " padded ", "a\tb", "{x}", "caf\u{e9}", "a/b"] {
            assert_eq!(RoomId::parse(raw).unwrap().as_str(), raw);
        }
        assert_ne!(RoomId::parse("a b").unwrap(), RoomId::parse("ab").unwrap());
    }

    #[test]
    fn test_serde_validates_on_deserialize() {
        let id: RoomId = serde_json::from_str("\"room-1\"").unwrap();
        assert_eq!(id.as_str(), "room-1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"room-1\"");

        let bad: Result<ClientId, _> = serde_json::from_str("\"\"");
        assert!(bad.is_err());
    }
}
