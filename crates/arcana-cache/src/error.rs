//! Cache client error types.

use arcana_core::ArcanaError;
use arcana_resilience::Elapsed;
use thiserror::Error;

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Cache client errors.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The connection handle was requested before `initialize` succeeded.
    #[error("Redis client not initialized")]
    NotInitialized,

    /// The client was shut down.
    #[error("Cache client is closed")]
    Closed,

    /// Connection could not be established or was lost.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Connect or command timeout.
    #[error(transparent)]
    Timeout(#[from] Elapsed),

    /// Redis error.
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// The store rejected the command.
    #[error("Backend error: {0}")]
    Backend(String),

    /// A value could not be encoded for the wire.
    #[error("Failed to encode value: {0}")]
    Encode(#[source] serde_json::Error),

    /// A stored value could not be read as the requested type.
    #[error("Failed to decode value for key '{key}': {source}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl CacheError {
    /// Returns true if the error means the connection itself is unusable,
    /// so the command may succeed after reconnecting.
    pub fn is_connection_error(&self) -> bool {
        match self {
            CacheError::Connection(_) | CacheError::Timeout(_) => true,
            CacheError::Redis(e) => {
                e.is_io_error() || e.is_connection_dropped() || e.is_connection_refusal() || e.is_timeout()
            }
            _ => false,
        }
    }
}

impl From<CacheError> for ArcanaError {
    fn from(err: CacheError) -> Self {
        match err {
            CacheError::Timeout(elapsed) => elapsed.into(),
            CacheError::Configuration(message) => ArcanaError::Configuration(message),
            other => ArcanaError::Cache(other.to_string()),
        }
    }
}
