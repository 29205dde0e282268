//! Console chat configuration.
//!
//! Configuration is loaded from environment variables. Connection URLs are
//! held as `SecretString` and redacted in Debug output.

use common::secret::SecretString;
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Default HTTP/WebSocket bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Default sqlx pool size.
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;

/// Default lifetime of issued chat tokens (24 hours).
pub const DEFAULT_TOKEN_TTL_SECONDS: u64 = 24 * 60 * 60;

/// Default deadline for the handshake (first) message.
pub const DEFAULT_HANDSHAKE_TIMEOUT_SECONDS: u64 = 10;

/// Default per-peer write deadline inside a broadcast.
pub const DEFAULT_PEER_WRITE_TIMEOUT_MS: u64 = 5000;

/// Default credential cache TTL (30 minutes).
pub const DEFAULT_CACHE_TTL_SECONDS: u64 = 30 * 60;

/// Default bcrypt cost factor.
pub const DEFAULT_BCRYPT_COST: u32 = 12;

/// Minimum accepted bcrypt cost factor.
pub const MIN_BCRYPT_COST: u32 = 10;

/// Maximum accepted bcrypt cost factor.
pub const MAX_BCRYPT_COST: u32 = 14;

/// Default graceful-shutdown drain deadline.
pub const DEFAULT_SHUTDOWN_GRACE_SECONDS: u64 = 30;

/// Where credential records live.
#[derive(Clone)]
pub enum StorageBackend {
    /// PostgreSQL credential store fronted by a Redis cache.
    Postgres {
        database_url: SecretString,
        redis_url: SecretString,
    },
    /// Process-local store and TTL cache (development only).
    InMemory,
}

impl fmt::Debug for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageBackend::Postgres { .. } => f
                .debug_struct("Postgres")
                .field("database_url", &"[REDACTED]")
                .field("redis_url", &"[REDACTED]")
                .finish(),
            StorageBackend::InMemory => f.write_str("InMemory"),
        }
    }
}

/// Console chat configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Listener address for HTTP and WebSocket traffic.
    pub bind_address: String,

    /// Credential storage backend.
    pub storage: StorageBackend,

    /// sqlx pool size (Postgres backend only).
    pub db_max_connections: u32,

    /// Lifetime of issued chat tokens.
    pub token_ttl: Duration,

    /// Deadline for reading the token message on a fresh connection.
    pub handshake_timeout: Duration,

    /// Deadline for a single peer write during broadcast.
    pub peer_write_timeout: Duration,

    /// Credential cache entry lifetime.
    pub cache_ttl: Duration,

    /// bcrypt cost factor for new registrations.
    pub bcrypt_cost: u32,

    /// How long in-flight connections may drain after a shutdown signal.
    pub shutdown_grace: Duration,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a `HashMap` (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let storage = match (vars.get("DATABASE_URL"), vars.get("REDIS_URL")) {
            (Some(database_url), Some(redis_url)) => StorageBackend::Postgres {
                database_url: SecretString::from(database_url.clone()),
                redis_url: SecretString::from(redis_url.clone()),
            },
            (Some(_), None) => return Err(ConfigError::MissingEnvVar("REDIS_URL".to_string())),
            (None, Some(_)) => {
                return Err(ConfigError::MissingEnvVar("DATABASE_URL".to_string()))
            }
            (None, None) => StorageBackend::InMemory,
        };

        let db_max_connections =
            parse_or_default(vars, "DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS)?;

        let token_ttl = Duration::from_secs(parse_or_default(
            vars,
            "CHAT_TOKEN_TTL_SECONDS",
            DEFAULT_TOKEN_TTL_SECONDS,
        )?);

        let handshake_timeout = Duration::from_secs(parse_or_default(
            vars,
            "CHAT_HANDSHAKE_TIMEOUT_SECONDS",
            DEFAULT_HANDSHAKE_TIMEOUT_SECONDS,
        )?);

        let peer_write_timeout = Duration::from_millis(parse_or_default(
            vars,
            "CHAT_PEER_WRITE_TIMEOUT_MS",
            DEFAULT_PEER_WRITE_TIMEOUT_MS,
        )?);

        let cache_ttl = Duration::from_secs(parse_or_default(
            vars,
            "CHAT_CACHE_TTL_SECONDS",
            DEFAULT_CACHE_TTL_SECONDS,
        )?);

        let bcrypt_cost = parse_or_default(vars, "BCRYPT_COST", DEFAULT_BCRYPT_COST)?;
        if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&bcrypt_cost) {
            return Err(ConfigError::InvalidValue(format!(
                "BCRYPT_COST must be {MIN_BCRYPT_COST}-{MAX_BCRYPT_COST}, got {bcrypt_cost}"
            )));
        }

        let shutdown_grace = Duration::from_secs(parse_or_default(
            vars,
            "SHUTDOWN_GRACE_SECONDS",
            DEFAULT_SHUTDOWN_GRACE_SECONDS,
        )?);

        for (name, value) in [
            ("CHAT_TOKEN_TTL_SECONDS", token_ttl),
            ("CHAT_HANDSHAKE_TIMEOUT_SECONDS", handshake_timeout),
            ("CHAT_PEER_WRITE_TIMEOUT_MS", peer_write_timeout),
            ("CHAT_CACHE_TTL_SECONDS", cache_ttl),
        ] {
            if value.is_zero() {
                return Err(ConfigError::InvalidValue(format!(
                    "{name} must be greater than zero"
                )));
            }
        }

        Ok(Config {
            bind_address,
            storage,
            db_max_connections,
            token_ttl,
            handshake_timeout,
            peer_write_timeout,
            cache_ttl,
            bcrypt_cost,
            shutdown_grace,
        })
    }
}

fn parse_or_default<T: FromStr>(
    vars: &HashMap<String, String>,
    name: &str,
    default: T,
) -> Result<T, ConfigError> {
    match vars.get(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(format!("{name}={raw:?} is not a valid number"))),
        None => Ok(default),
    }
}
