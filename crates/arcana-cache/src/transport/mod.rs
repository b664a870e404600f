//! Transports to the backing key-value store.

mod memory;
mod redis;

pub use self::memory::{MemoryConnector, MemoryStore};
pub use self::redis::{RedisConnector, RedisTransport};

use crate::connection::ConnectionLifecycle;
use crate::error::{CacheError, CacheResult};
use arcana_config::CacheConfig;
use arcana_resilience::ReconnectBackoff;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Atomic compare-and-delete used for safe lock release.
///
/// Deletes `KEYS[1]` and returns 1 only if it currently holds `ARGV[1]`,
/// otherwise returns 0.
pub const RELEASE_SCRIPT: &str = r#"if redis.call("get", KEYS[1]) == ARGV[1] then
    return redis.call("del", KEYS[1])
else
    return 0
end"#;

/// Primitive commands of the backing store.
///
/// Implementations report failures as-is; fallback policy lives in the
/// client on top.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CacheTransport: Send + Sync {
    /// GET
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    /// SETEX. Returns true when the store acknowledged the write.
    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> CacheResult<bool>;

    /// SET key value EX ttl NX. Returns true when the key was created.
    async fn set_nx_ex(&self, key: &str, value: &str, ttl_secs: u64) -> CacheResult<bool>;

    /// DEL. Returns the number of keys removed.
    async fn del(&self, keys: &[String]) -> CacheResult<u64>;

    /// EXISTS
    async fn exists(&self, key: &str) -> CacheResult<bool>;

    /// EXPIRE. Returns false when the key does not exist.
    async fn expire(&self, key: &str, ttl_secs: u64) -> CacheResult<bool>;

    /// TTL. `-1` means no expiration, `-2` means the key is absent.
    async fn ttl(&self, key: &str) -> CacheResult<i64>;

    /// KEYS
    async fn keys(&self, pattern: &str) -> CacheResult<Vec<String>>;

    /// FLUSHALL
    async fn flush_all(&self) -> CacheResult<bool>;

    /// Deletes `key` only if it currently holds `expected`, atomically.
    async fn compare_and_delete(&self, key: &str, expected: &str) -> CacheResult<bool>;

    /// Closes this client's connection.
    async fn close(&self) -> CacheResult<()>;
}

/// Opens transports. The connector reports progress to `lifecycle`.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Establishes a ready transport or fails.
    async fn connect(
        &self,
        settings: &ConnectionSettings,
        lifecycle: Arc<ConnectionLifecycle>,
    ) -> CacheResult<Arc<dyn CacheTransport>>;
}

/// Settings a transport is built from.
#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    /// Store URL, credential included.
    pub url: Url,
    /// Budget for establishing a connection.
    pub connect_timeout: Duration,
    /// Budget for a single command.
    pub command_timeout: Duration,
    /// Reconnect-and-retry budget for a single command.
    pub max_retries_per_request: u32,
    /// Delay policy between reconnect attempts.
    pub backoff: ReconnectBackoff,
}

impl ConnectionSettings {
    /// Builds settings from the cache configuration.
    pub fn from_config(config: &CacheConfig) -> CacheResult<Self> {
        let url = config
            .connection_url()
            .map_err(|e| CacheError::Configuration(e.to_string()))?;

        Ok(Self {
            url,
            connect_timeout: config.connect_timeout(),
            command_timeout: config.command_timeout(),
            max_retries_per_request: config.max_retries_per_request,
            backoff: ReconnectBackoff::new(config.reconnect_step(), config.reconnect_max_delay()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_from_default_config() {
        let settings = ConnectionSettings::from_config(&CacheConfig::default()).unwrap();

        assert_eq!(settings.url.as_str(), "redis://localhost:6379");
        assert_eq!(settings.connect_timeout, Duration::from_millis(5_000));
        assert_eq!(settings.command_timeout, Duration::from_millis(5_000));
        assert_eq!(settings.max_retries_per_request, 3);
        assert_eq!(settings.backoff, ReconnectBackoff::default());
    }

    #[test]
    fn test_settings_carry_password() {
        let config = CacheConfig {
            password: Some("s3cret".to_string()),
            ..CacheConfig::default()
        };
        let settings = ConnectionSettings::from_config(&config).unwrap();
        assert_eq!(settings.url.password(), Some("s3cret"));
    }

    #[test]
    fn test_invalid_host_is_configuration_error() {
        let config = CacheConfig {
            host: "bad host".to_string(),
            ..CacheConfig::default()
        };
        assert!(matches!(
            ConnectionSettings::from_config(&config),
            Err(CacheError::Configuration(_))
        ));
    }

    #[test]
    fn test_release_script_compares_before_delete() {
        assert!(RELEASE_SCRIPT.contains(r#"redis.call("get", KEYS[1]) == ARGV[1]"#));
        assert!(RELEASE_SCRIPT.contains(r#"redis.call("del", KEYS[1])"#));
    }
}
