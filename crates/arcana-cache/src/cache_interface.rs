//! Cache interface trait for the store client.

use crate::codec::{self, CacheValue};
use crate::connection::ConnectionState;
use crate::error::{CacheError, CacheResult};
use crate::transport::CacheTransport;
use arcana_core::Interface;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// Store client contract.
///
/// `get_raw` propagates backend failures, since a failed read must not look
/// like a miss. Every other primitive degrades to its "no effect" value
/// (`false`, `0`, empty list) and logs the cause.
#[async_trait]
pub trait CacheInterface: Interface + Send + Sync {
    /// Connects to the store. A failed first connect is fatal to the caller.
    async fn initialize(&self) -> CacheResult<()>;

    /// Closes the connection if one is open. Never fails.
    async fn shutdown(&self);

    /// Current connection state.
    fn state(&self) -> ConnectionState;

    /// True when the connection accepts commands.
    fn is_ready(&self) -> bool {
        self.state() == ConnectionState::Ready
    }

    /// The live transport, or [`CacheError::NotInitialized`].
    fn handle(&self) -> CacheResult<Arc<dyn CacheTransport>>;

    /// TTL applied by `set` when none is given, in seconds.
    fn default_ttl_secs(&self) -> u64;

    /// Fetches the raw wire value. Empty values count as absent.
    async fn get_raw(&self, key: &str) -> CacheResult<Option<String>>;

    /// Writes an encoded value with `ttl_secs`, or the default TTL.
    /// Returns true when the store acknowledged the write.
    async fn set_raw(&self, key: &str, value: &str, ttl_secs: Option<u64>) -> bool;

    /// Deletes one key. Returns true if it existed.
    async fn del(&self, key: &str) -> bool;

    /// Deletes a batch of keys in one call. Returns the number removed.
    async fn del_many(&self, keys: &[String]) -> u64;

    /// Checks whether a key exists.
    async fn exists(&self, key: &str) -> bool;

    /// Sets or replaces the expiration of an existing key.
    async fn expire(&self, key: &str, ttl_secs: u64) -> bool;

    /// Remaining seconds: `-1` without expiration, `-2` for an absent key,
    /// `0` when the store could not be asked.
    async fn ttl(&self, key: &str) -> i64;

    /// Clears the whole store. Administrative use only.
    async fn flush_all(&self) -> bool;

    /// Lists keys matching a glob pattern.
    async fn keys(&self, pattern: &str) -> Vec<String>;

    /// Deletes every key matching a glob pattern.
    ///
    /// Returns the number of keys deleted.
    async fn delete_pattern(&self, pattern: &str) -> u64 {
        let keys = self.keys(pattern).await;
        if keys.is_empty() {
            return 0;
        }

        let deleted = self.del_many(&keys).await;
        debug!("Deleted {} keys matching pattern '{}'", deleted, pattern);
        deleted
    }
}

/// Typed methods over [`CacheInterface`].
#[async_trait]
pub trait CacheExt: CacheInterface {
    /// Gets the decoded value, `None` when the key is absent.
    async fn get_value(&self, key: &str) -> CacheResult<Option<CacheValue>> {
        Ok(self.get_raw(key).await?.map(|raw| codec::decode(&raw)))
    }

    /// Gets a typed value. The `null` and `undefined` tokens read as `None`.
    async fn get<T: DeserializeOwned + Send>(&self, key: &str) -> CacheResult<Option<T>> {
        match self.get_raw(key).await? {
            Some(raw) => codec::decode_as(&raw).map_err(|source| CacheError::Decode {
                key: key.to_string(),
                source,
            }),
            None => Ok(None),
        }
    }

    /// Sets a typed value.
    ///
    /// Fails only when the value cannot be encoded; a store failure yields
    /// `Ok(false)`.
    async fn set<T: Serialize + Send + Sync + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl_secs: Option<u64>,
    ) -> CacheResult<bool> {
        let encoded = codec::encode(value)?;
        Ok(self.set_raw(key, &encoded, ttl_secs).await)
    }

    /// Get a value or compute and cache it if not present.
    async fn get_or_set<T, F, Fut, E>(&self, key: &str, ttl_secs: Option<u64>, factory: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
        F: FnOnce() -> Fut + Send,
        Fut: std::future::Future<Output = Result<T, E>> + Send,
        E: From<CacheError> + Send,
    {
        if let Some(cached) = self.get::<T>(key).await? {
            return Ok(cached);
        }

        let value = factory().await?;

        // The computed value is still valid if caching it fails.
        let _ = self.set(key, &value, ttl_secs).await;

        Ok(value)
    }
}

impl<T: CacheInterface + ?Sized> CacheExt for T {}
