//! Redis-backed room store.
//!
//! # Key Patterns
//!
//! - `rv:room:{id}:state` - Room record (JSON)
//! - `rv:room:{id}:version` - CAS version (integer)
//!
//! Reads fetch both keys in one `MGET`. Writes go through
//! [`lua_scripts::COMPARE_AND_SWAP`] and refresh the TTL on every put, so an
//! abandoned room expires `room_ttl_seconds` after its last change. A
//! deleted room reads as absent at its tombstone version until that key
//! expires too.
//!
//! # Connection Pattern
//!
//! `MultiplexedConnection` is cheap to clone and safe to use concurrently;
//! every operation clones it instead of locking.

use super::{lua_scripts, CasOutcome, RoomStore, StoreError, Version, Versioned, Write};
use crate::room::Room;
use async_trait::async_trait;
use common::types::RoomId;
use redis::aio::MultiplexedConnection;
use redis::{Client, Script};
use tracing::{debug, error, instrument, warn};

/// Version key for a room.
fn version_key(room_id: &RoomId) -> String {
    format!("rv:room:{{{room_id}}}:version")
}

/// State key for a room.
fn state_key(room_id: &RoomId) -> String {
    format!("rv:room:{{{room_id}}}:state")
}

/// Room store shared by every service instance pointing at the same Redis.
#[derive(Clone)]
pub struct RedisRoomStore {
    connection: MultiplexedConnection,
    cas_script: Script,
    room_ttl_seconds: u64,
}

impl RedisRoomStore {
    /// Connect to Redis.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Unavailable` if the URL is invalid or the
    /// connection cannot be established.
    pub async fn connect(redis_url: &str, room_ttl_seconds: u64) -> Result<Self, StoreError> {
        // Do not log the URL; it may carry credentials.
        let client = Client::open(redis_url).map_err(|e| {
            error!(target: "rv.store.redis", error = %e, "Failed to open Redis client");
            StoreError::Unavailable(format!("Failed to open Redis client: {e}"))
        })?;

        let connection = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| {
                error!(target: "rv.store.redis", error = %e, "Failed to connect to Redis");
                StoreError::Unavailable(format!("Failed to connect to Redis: {e}"))
            })?;

        Ok(Self {
            connection,
            cas_script: Script::new(lua_scripts::COMPARE_AND_SWAP),
            room_ttl_seconds,
        })
    }
}

#[async_trait]
impl RoomStore for RedisRoomStore {
    #[instrument(skip_all, fields(room_id = %room_id))]
    async fn get(&self, room_id: &RoomId) -> Result<Versioned, StoreError> {
        let mut conn = self.connection.clone();

        let (version, state): (Option<String>, Option<String>) = redis::cmd("MGET")
            .arg(version_key(room_id))
            .arg(state_key(room_id))
            .query_async(&mut conn)
            .await
            .map_err(|e| {
                warn!(target: "rv.store.redis", error = %e, "Failed to read room");
                StoreError::Unavailable(format!("Failed to read room: {e}"))
            })?;

        let version = match version {
            Some(raw) => raw.parse::<Version>().map_err(|e| {
                error!(target: "rv.store.redis", error = %e, "Invalid room version in Redis");
                StoreError::Corrupt(format!("invalid version {raw:?}: {e}"))
            })?,
            None => 0,
        };

        let room = match state {
            Some(json) => Some(serde_json::from_str::<Room>(&json).map_err(|e| {
                error!(target: "rv.store.redis", error = %e, "Failed to decode room");
                StoreError::Corrupt(format!("Failed to decode room: {e}"))
            })?),
            None => None,
        };

        Ok(Versioned { room, version })
    }

    #[instrument(skip_all, fields(room_id = %room_id, expected = expected, op = write.as_str()))]
    async fn compare_and_swap(
        &self,
        room_id: &RoomId,
        expected: Version,
        write: Write,
    ) -> Result<CasOutcome, StoreError> {
        let op = write.as_str();
        let json = match &write {
            Write::Put(room) => serde_json::to_string(room).map_err(|e| {
                error!(target: "rv.store.redis", error = %e, "Failed to encode room");
                StoreError::Corrupt(format!("Failed to encode room: {e}"))
            })?,
            Write::Delete => String::new(),
        };

        let mut conn = self.connection.clone();
        let result: i64 = self
            .cas_script
            .key(version_key(room_id))
            .key(state_key(room_id))
            .arg(expected)
            .arg(op)
            .arg(&json)
            .arg(self.room_ttl_seconds)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| {
                warn!(target: "rv.store.redis", error = %e, "Compare-and-swap failed");
                StoreError::Unavailable(format!("Compare-and-swap failed: {e}"))
            })?;

        match result {
            1 => {
                debug!(target: "rv.store.redis", "Room swapped");
                Ok(CasOutcome::Swapped)
            }
            0 => {
                debug!(target: "rv.store.redis", "Room version moved, conflict");
                Ok(CasOutcome::Conflict)
            }
            _ => {
                error!(
                    target: "rv.store.redis",
                    result = result,
                    "Compare-and-swap rejected malformed version or arguments"
                );
                Err(StoreError::Corrupt(
                    "invalid version format in Redis".to_string(),
                ))
            }
        }
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.connection.clone();
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| StoreError::Unavailable(format!("Redis ping failed: {e}")))?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}
