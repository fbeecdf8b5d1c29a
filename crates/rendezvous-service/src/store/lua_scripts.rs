//! Lua scripts for the Redis room store.
//!
//! Redis runs a script atomically, so "compare version, then write both keys"
//! cannot interleave with another writer. Both keys of a room share the
//! `{<room_id>}` hash tag and land on the same cluster slot.
//!
//! Deleting a room removes only the state key. The version key stays behind
//! as a tombstone, bumped and expiring with the room TTL, so a re-created
//! room continues from a version no earlier reader can hold.

/// Conditional write of a room record.
///
/// Arguments:
/// - KEYS[1]: Version key (`rv:room:{id}:version`)
/// - KEYS[2]: State key (`rv:room:{id}:state`)
/// - ARGV[1]: Expected version (0 when the room was read as absent)
/// - ARGV[2]: Operation, `put` or `delete`
/// - ARGV[3]: Room JSON (ignored for `delete`)
/// - ARGV[4]: TTL in seconds for the written keys (the tombstone on `delete`)
///
/// Returns:
/// - 1: Swapped
/// - 0: Conflict (version moved since the read)
/// - -1: Error (malformed version or arguments)
pub const COMPARE_AND_SWAP: &str = r#"
local expected = tonumber(ARGV[1])
if expected == nil then
    return -1
end

local stored = redis.call('GET', KEYS[1])
local current = 0
if stored ~= nil and stored ~= false then
    current = tonumber(stored)
    if current == nil then
        return -1
    end
end

if current ~= expected then
    return 0
end

local ttl = tonumber(ARGV[4])
if ttl == nil or ttl <= 0 then
    return -1
end

if ARGV[2] == 'delete' then
    redis.call('SET', KEYS[1], current + 1, 'EX', ttl)
    redis.call('DEL', KEYS[2])
    return 1
end

if ARGV[2] == 'put' then
    redis.call('SET', KEYS[1], current + 1, 'EX', ttl)
    redis.call('SET', KEYS[2], ARGV[3], 'EX', ttl)
    return 1
end

return -1
"#;
