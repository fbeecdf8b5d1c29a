//! Rendezvous service configuration.
//!
//! Configuration is loaded from environment variables. The store URL is
//! redacted in Debug output.

use common::secret::SecretString;
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Default HTTP bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Default room TTL in seconds (Redis backend only).
pub const DEFAULT_ROOM_TTL_SECONDS: u64 = 86_400;

/// Default length of generated client ids.
pub const DEFAULT_CLIENT_ID_LENGTH: usize = 8;

/// Upper bound on generated client id length.
pub const MAX_CLIENT_ID_LENGTH: usize = 64;

/// Default number of CAS attempts per operation.
pub const DEFAULT_CAS_MAX_ATTEMPTS: u32 = 8;

/// Default first backoff step after a CAS conflict.
pub const DEFAULT_CAS_BACKOFF_BASE_MS: u64 = 2;

/// Default ceiling for a single backoff step.
pub const DEFAULT_CAS_BACKOFF_MAX_MS: u64 = 50;

/// Default bound on messages buffered for one recipient.
pub const DEFAULT_MAX_BUFFERED_MESSAGES: usize = 64;

/// Default maximum message body size in bytes.
pub const DEFAULT_MAX_MESSAGE_BYTES: usize = 16 * 1024;

/// Default instance ID prefix.
pub const DEFAULT_INSTANCE_ID_PREFIX: &str = "rv";

/// Which room store backend to run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// Process-local map. Rooms vanish on restart.
    Memory,
    /// Shared Redis instance, safe for multiple service replicas.
    Redis,
}

impl FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(StoreBackend::Memory),
            "redis" => Ok(StoreBackend::Redis),
            other => Err(ConfigError::InvalidValue(format!(
                "RV_STORE_BACKEND must be 'memory' or 'redis', got '{other}'"
            ))),
        }
    }
}

/// Rendezvous service configuration.
#[derive(Clone)]
pub struct Config {
    /// HTTP bind address (default: "0.0.0.0:8080").
    pub bind_address: String,

    /// Room store backend (default: memory).
    pub store_backend: StoreBackend,

    /// Redis connection URL, required for the Redis backend.
    /// Protected by `SecretString` because it may carry a password.
    pub redis_url: Option<SecretString>,

    /// TTL applied to room keys on every write (Redis backend).
    pub room_ttl_seconds: u64,

    /// Length of generated client ids.
    pub client_id_length: usize,

    /// Total CAS attempts per operation before giving up.
    pub cas_max_attempts: u32,

    /// First backoff step after a conflict, in milliseconds.
    pub cas_backoff_base_ms: u64,

    /// Ceiling for a single backoff step, in milliseconds.
    pub cas_backoff_max_ms: u64,

    /// Maximum messages buffered for a single recipient.
    pub max_buffered_messages: usize,

    /// Maximum accepted message body size in bytes.
    pub max_message_bytes: usize,

    /// Unique identifier for this service instance (log correlation).
    pub instance_id: String,

    /// Emit JSON-formatted logs.
    pub log_json: bool,
}

/// Custom Debug implementation that redacts the store URL.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("bind_address", &self.bind_address)
            .field("store_backend", &self.store_backend)
            .field(
                "redis_url",
                &self.redis_url.as_ref().map(|_| "[REDACTED]"),
            )
            .field("room_ttl_seconds", &self.room_ttl_seconds)
            .field("client_id_length", &self.client_id_length)
            .field("cas_max_attempts", &self.cas_max_attempts)
            .field("cas_backoff_base_ms", &self.cas_backoff_base_ms)
            .field("cas_backoff_max_ms", &self.cas_backoff_max_ms)
            .field("max_buffered_messages", &self.max_buffered_messages)
            .field("max_message_bytes", &self.max_message_bytes)
            .field("instance_id", &self.instance_id)
            .field("log_json", &self.log_json)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

/// Parse an optional variable, keeping the default when unset.
fn parse_var<T: FromStr>(
    vars: &HashMap<String, String>,
    name: &str,
    default: T,
) -> Result<T, ConfigError> {
    match vars.get(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(format!("{name} has invalid value '{raw}'"))),
        None => Ok(default),
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a `HashMap` (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let bind_address = vars
            .get("RV_BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let store_backend = match vars.get("RV_STORE_BACKEND") {
            Some(raw) => raw.parse()?,
            None => StoreBackend::Memory,
        };

        let redis_url = vars.get("REDIS_URL").cloned().map(SecretString::from);
        if store_backend == StoreBackend::Redis && redis_url.is_none() {
            return Err(ConfigError::MissingEnvVar("REDIS_URL".to_string()));
        }

        let room_ttl_seconds = parse_var(vars, "RV_ROOM_TTL_SECONDS", DEFAULT_ROOM_TTL_SECONDS)?;
        if room_ttl_seconds == 0 {
            return Err(ConfigError::InvalidValue(
                "RV_ROOM_TTL_SECONDS must be positive".to_string(),
            ));
        }

        let client_id_length =
            parse_var(vars, "RV_CLIENT_ID_LENGTH", DEFAULT_CLIENT_ID_LENGTH)?;
        if client_id_length == 0 || client_id_length > MAX_CLIENT_ID_LENGTH {
            return Err(ConfigError::InvalidValue(format!(
                "RV_CLIENT_ID_LENGTH must be between 1 and {MAX_CLIENT_ID_LENGTH}"
            )));
        }

        let cas_max_attempts = parse_var(vars, "RV_CAS_MAX_ATTEMPTS", DEFAULT_CAS_MAX_ATTEMPTS)?;
        if cas_max_attempts == 0 {
            return Err(ConfigError::InvalidValue(
                "RV_CAS_MAX_ATTEMPTS must be at least 1".to_string(),
            ));
        }

        let cas_backoff_base_ms =
            parse_var(vars, "RV_CAS_BACKOFF_BASE_MS", DEFAULT_CAS_BACKOFF_BASE_MS)?;
        let cas_backoff_max_ms =
            parse_var(vars, "RV_CAS_BACKOFF_MAX_MS", DEFAULT_CAS_BACKOFF_MAX_MS)?;
        if cas_backoff_max_ms < cas_backoff_base_ms {
            return Err(ConfigError::InvalidValue(
                "RV_CAS_BACKOFF_MAX_MS must not be below RV_CAS_BACKOFF_BASE_MS".to_string(),
            ));
        }

        let max_buffered_messages = parse_var(
            vars,
            "RV_MAX_BUFFERED_MESSAGES",
            DEFAULT_MAX_BUFFERED_MESSAGES,
        )?;
        let max_message_bytes =
            parse_var(vars, "RV_MAX_MESSAGE_BYTES", DEFAULT_MAX_MESSAGE_BYTES)?;
        let log_json = parse_var(vars, "RV_LOG_JSON", false)?;

        // Generate instance ID
        let instance_id = vars.get("RV_INSTANCE_ID").cloned().unwrap_or_else(|| {
            let hostname = std::env::var("HOSTNAME").unwrap_or_else(|_| "unknown".to_string());
            let uuid_suffix = uuid::Uuid::new_v4().to_string();
            let short_suffix = uuid_suffix.get(..8).unwrap_or("00000000");
            format!("{DEFAULT_INSTANCE_ID_PREFIX}-{hostname}-{short_suffix}")
        });

        Ok(Config {
            bind_address,
            store_backend,
            redis_url,
            room_ttl_seconds,
            client_id_length,
            cas_max_attempts,
            cas_backoff_base_ms,
            cas_backoff_max_ms,
            max_buffered_messages,
            max_message_bytes,
            instance_id,
            log_json,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use common::secret::ExposeSecret;

    #[test]
    fn test_from_vars_success_with_defaults() {
        let config = Config::from_vars(&HashMap::new()).expect("Config should load successfully");

        assert_eq!(config.bind_address, DEFAULT_BIND_ADDRESS);
        assert_eq!(config.store_backend, StoreBackend::Memory);
        assert!(config.redis_url.is_none());
        assert_eq!(config.room_ttl_seconds, DEFAULT_ROOM_TTL_SECONDS);
        assert_eq!(config.client_id_length, DEFAULT_CLIENT_ID_LENGTH);
        assert_eq!(config.cas_max_attempts, DEFAULT_CAS_MAX_ATTEMPTS);
        assert_eq!(config.cas_backoff_base_ms, DEFAULT_CAS_BACKOFF_BASE_MS);
        assert_eq!(config.cas_backoff_max_ms, DEFAULT_CAS_BACKOFF_MAX_MS);
        assert_eq!(config.max_buffered_messages, DEFAULT_MAX_BUFFERED_MESSAGES);
        assert_eq!(config.max_message_bytes, DEFAULT_MAX_MESSAGE_BYTES);
        assert!(!config.log_json);
        // Instance ID should be auto-generated
        assert!(config.instance_id.starts_with("rv-"));
    }

    #[test]
    fn test_from_vars_success_with_custom_values() {
        let vars = HashMap::from([
            ("RV_BIND_ADDRESS".to_string(), "127.0.0.1:9000".to_string()),
            ("RV_STORE_BACKEND".to_string(), "Redis".to_string()),
            ("REDIS_URL".to_string(), "redis://cache:6379".to_string()),
            ("RV_ROOM_TTL_SECONDS".to_string(), "600".to_string()),
            ("RV_CLIENT_ID_LENGTH".to_string(), "12".to_string()),
            ("RV_CAS_MAX_ATTEMPTS".to_string(), "3".to_string()),
            ("RV_CAS_BACKOFF_BASE_MS".to_string(), "1".to_string()),
            ("RV_CAS_BACKOFF_MAX_MS".to_string(), "10".to_string()),
            ("RV_MAX_BUFFERED_MESSAGES".to_string(), "16".to_string()),
            ("RV_MAX_MESSAGE_BYTES".to_string(), "4096".to_string()),
            ("RV_INSTANCE_ID".to_string(), "rv-custom-001".to_string()),
            ("RV_LOG_JSON".to_string(), "true".to_string()),
        ]);

        let config = Config::from_vars(&vars).expect("Config should load successfully");

        assert_eq!(config.bind_address, "127.0.0.1:9000");
        assert_eq!(config.store_backend, StoreBackend::Redis);
        assert_eq!(
            config.redis_url.as_ref().map(|u| u.expose_secret().to_string()),
            Some("redis://cache:6379".to_string())
        );
        assert_eq!(config.room_ttl_seconds, 600);
        assert_eq!(config.client_id_length, 12);
        assert_eq!(config.cas_max_attempts, 3);
        assert_eq!(config.cas_backoff_base_ms, 1);
        assert_eq!(config.cas_backoff_max_ms, 10);
        assert_eq!(config.max_buffered_messages, 16);
        assert_eq!(config.max_message_bytes, 4096);
        assert_eq!(config.instance_id, "rv-custom-001");
        assert!(config.log_json);
    }

    #[test]
    fn test_redis_backend_requires_url() {
        let vars = HashMap::from([("RV_STORE_BACKEND".to_string(), "redis".to_string())]);

        let result = Config::from_vars(&vars);
        assert!(matches!(result, Err(ConfigError::MissingEnvVar(v)) if v == "REDIS_URL"));
    }

    #[test]
    fn test_unknown_backend_rejected() {
        let vars = HashMap::from([("RV_STORE_BACKEND".to_string(), "etcd".to_string())]);

        assert!(matches!(
            Config::from_vars(&vars),
            Err(ConfigError::InvalidValue(_))
        ));
    }

    #[test]
    fn test_malformed_numbers_are_errors() {
        let vars = HashMap::from([("RV_CAS_MAX_ATTEMPTS".to_string(), "lots".to_string())]);
        assert!(matches!(
            Config::from_vars(&vars),
            Err(ConfigError::InvalidValue(msg)) if msg.contains("RV_CAS_MAX_ATTEMPTS")
        ));
    }

    #[test]
    fn test_out_of_range_values_rejected() {
        for (name, value) in [
            ("RV_CAS_MAX_ATTEMPTS", "0"),
            ("RV_CLIENT_ID_LENGTH", "0"),
            ("RV_CLIENT_ID_LENGTH", "65"),
            ("RV_ROOM_TTL_SECONDS", "0"),
        ] {
            let vars = HashMap::from([(name.to_string(), value.to_string())]);
            assert!(
                matches!(Config::from_vars(&vars), Err(ConfigError::InvalidValue(_))),
                "{name}={value} should be rejected"
            );
        }

        let vars = HashMap::from([
            ("RV_CAS_BACKOFF_BASE_MS".to_string(), "20".to_string()),
            ("RV_CAS_BACKOFF_MAX_MS".to_string(), "10".to_string()),
        ]);
        assert!(matches!(
            Config::from_vars(&vars),
            Err(ConfigError::InvalidValue(_))
        ));
    }

    #[test]
    fn test_debug_redacts_redis_url() {
        let vars = HashMap::from([
            ("RV_STORE_BACKEND".to_string(), "redis".to_string()),
            (
                "REDIS_URL".to_string(),
                "redis://:hunter2@cache:6379".to_string(),
            ),
        ]);
        let config = Config::from_vars(&vars).expect("Config should load successfully");

        let debug_output = format!("{config:?}");

        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("hunter2"));
    }
}
