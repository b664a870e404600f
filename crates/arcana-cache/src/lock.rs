//! Advisory distributed locks on top of the store client.
//!
//! A lock on resource `R` is the key `lock:R` holding the owner's token with
//! a TTL. Acquisition is a single `SET NX EX`; release with a token deletes
//! the key only if it still holds that token, atomically on the server.
//!
//! The lock assumes one authoritative store. A holder whose lease expires
//! while it is still working is not notified, so critical sections should
//! finish well within the TTL.

use crate::cache_interface::CacheInterface;
use crate::cache_keys::lock_key;
use crate::metrics::CacheMetrics;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};
use uuid::Uuid;

/// Default number of acquisition attempts.
pub const DEFAULT_LOCK_RETRIES: u32 = 3;

/// Default delay between acquisition attempts.
pub const DEFAULT_LOCK_RETRY_DELAY: Duration = Duration::from_millis(1_000);

/// Options for [`LockManager::acquire`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockOptions {
    /// Ownership token to store. A fresh one is generated when `None`.
    pub identifier: Option<String>,
    /// Number of attempts before giving up.
    pub retries: u32,
    /// Delay between attempts.
    pub retry_delay: Duration,
}

impl Default for LockOptions {
    fn default() -> Self {
        Self {
            identifier: None,
            retries: DEFAULT_LOCK_RETRIES,
            retry_delay: DEFAULT_LOCK_RETRY_DELAY,
        }
    }
}

impl LockOptions {
    /// Uses `identifier` as the ownership token.
    #[must_use]
    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    /// Sets the number of attempts.
    #[must_use]
    pub const fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Sets the delay between attempts.
    #[must_use]
    pub const fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }
}

/// Source of ownership tokens.
pub trait TokenSource: Send + Sync {
    /// Returns a token unique to one acquisition attempt.
    fn next_token(&self) -> String;
}

/// Random UUIDv4 tokens.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidTokenSource;

impl TokenSource for UuidTokenSource {
    fn next_token(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// Acquires and releases advisory locks.
#[derive(Clone)]
pub struct LockManager {
    cache: Arc<dyn CacheInterface>,
    tokens: Arc<dyn TokenSource>,
}

impl LockManager {
    /// Creates a lock manager with random UUID tokens.
    pub fn new(cache: Arc<dyn CacheInterface>) -> Self {
        Self {
            cache,
            tokens: Arc::new(UuidTokenSource),
        }
    }

    /// Replaces the token source.
    #[must_use]
    pub fn with_token_source(mut self, tokens: Arc<dyn TokenSource>) -> Self {
        self.tokens = tokens;
        self
    }

    /// Tries to acquire the lock on `resource` for `ttl_secs`.
    ///
    /// Returns false when every attempt found the lock taken, or at the
    /// first backend error.
    pub async fn acquire(&self, resource: &str, ttl_secs: u64, options: LockOptions) -> bool {
        self.acquire_token(resource, ttl_secs, options).await.is_some()
    }

    /// Like [`acquire`](Self::acquire) but returns the ownership token, which
    /// the caller passes to [`release`](Self::release).
    pub async fn acquire_token(&self, resource: &str, ttl_secs: u64, options: LockOptions) -> Option<String> {
        let key = lock_key(resource);
        let token = options.identifier.unwrap_or_else(|| self.tokens.next_token());

        let handle = match self.cache.handle() {
            Ok(handle) => handle,
            Err(err) => {
                error!(resource, error = %err, "Failed to acquire lock");
                CacheMetrics::lock_failed("acquire");
                return None;
            }
        };

        for attempt in 1..=options.retries {
            match handle.set_nx_ex(&key, &token, ttl_secs).await {
                Ok(true) => {
                    debug!(resource, attempt, "Lock acquired");
                    CacheMetrics::lock_acquired();
                    return Some(token);
                }
                Ok(false) => {
                    if attempt < options.retries {
                        tokio::time::sleep(options.retry_delay).await;
                    }
                }
                Err(err) => {
                    error!(resource, error = %err, "Failed to acquire lock");
                    CacheMetrics::lock_failed("acquire");
                    return None;
                }
            }
        }

        debug!(resource, retries = options.retries, "Lock is held elsewhere");
        CacheMetrics::lock_contended();
        None
    }

    /// Releases the lock on `resource`.
    ///
    /// With a token, deletes the lock only if it still holds that token and
    /// returns whether it did. Without a token, deletes the lock whoever
    /// holds it and returns true; this breaks mutual exclusion and is meant
    /// for administrative cleanup only.
    pub async fn release(&self, resource: &str, token: Option<&str>) -> bool {
        let key = lock_key(resource);

        let Some(token) = token else {
            warn!(resource, "Force releasing lock without ownership check");
            self.cache.del(&key).await;
            CacheMetrics::lock_released("forced");
            return true;
        };

        let result = match self.cache.handle() {
            Ok(handle) => handle.compare_and_delete(&key, token).await,
            Err(err) => Err(err),
        };

        match result {
            Ok(true) => {
                CacheMetrics::lock_released("deleted");
                true
            }
            Ok(false) => {
                debug!(resource, "Lock not held by this token");
                CacheMetrics::lock_released("rejected");
                false
            }
            Err(err) => {
                error!(resource, error = %err, "Failed to release lock");
                CacheMetrics::lock_failed("release");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache_service::CacheService;
    use crate::connection::ConnectionLifecycle;
    use crate::error::{CacheError, CacheResult};
    use crate::transport::{CacheTransport, ConnectionSettings, Connector, MemoryConnector, MockCacheTransport};
    use arcana_config::CacheConfig;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    struct MockConnector(Mutex<Option<MockCacheTransport>>);

    #[async_trait]
    impl Connector for MockConnector {
        async fn connect(
            &self,
            _settings: &ConnectionSettings,
            _lifecycle: Arc<ConnectionLifecycle>,
        ) -> CacheResult<Arc<dyn CacheTransport>> {
            let mock = self.0.lock().take().ok_or(CacheError::Connection("already used".into()))?;
            Ok(Arc::new(mock))
        }
    }

    async fn manager_with(mock: MockCacheTransport) -> LockManager {
        let connector = Arc::new(MockConnector(Mutex::new(Some(mock))));
        let service = CacheService::with_connector(CacheConfig::default(), connector);
        service.initialize().await.unwrap();
        LockManager::new(Arc::new(service))
    }

    async fn memory_manager() -> (LockManager, MemoryConnector) {
        let connector = MemoryConnector::new();
        let service = CacheService::with_connector(CacheConfig::default(), Arc::new(connector.clone()));
        service.initialize().await.unwrap();
        (LockManager::new(Arc::new(service)), connector)
    }

    struct FixedTokens(&'static str);

    impl TokenSource for FixedTokens {
        fn next_token(&self) -> String {
            self.0.to_string()
        }
    }

    #[test]
    fn test_default_options() {
        let options = LockOptions::default();
        assert_eq!(options.identifier, None);
        assert_eq!(options.retries, 3);
        assert_eq!(options.retry_delay, Duration::from_millis(1_000));
    }

    #[test]
    fn test_uuid_tokens_are_unique() {
        let tokens = UuidTokenSource;
        assert_ne!(tokens.next_token(), tokens.next_token());
        assert_eq!(tokens.next_token().len(), 36);
    }

    #[tokio::test]
    async fn test_acquire_uses_conditional_write() {
        let mut mock = MockCacheTransport::new();
        mock.expect_set_nx_ex()
            .withf(|key, token, ttl| key == "lock:job" && token == "tok-1" && *ttl == 30)
            .times(1)
            .returning(|_, _, _| Ok(true));
        let manager = manager_with(mock).await.with_token_source(Arc::new(FixedTokens("tok-1")));

        assert_eq!(
            manager.acquire_token("job", 30, LockOptions::default()).await,
            Some("tok-1".to_string())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_retries_then_gives_up() {
        let mut mock = MockCacheTransport::new();
        mock.expect_set_nx_ex().times(3).returning(|_, _, _| Ok(false));
        let manager = manager_with(mock).await;

        let started = tokio::time::Instant::now();
        assert!(!manager.acquire("job", 30, LockOptions::default()).await);
        // Sleeps between attempts only, not after the last one.
        assert_eq!(started.elapsed(), Duration::from_millis(2_000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_succeeds_on_later_attempt() {
        let mut mock = MockCacheTransport::new();
        let mut seq = mockall::Sequence::new();
        mock.expect_set_nx_ex()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Ok(false));
        mock.expect_set_nx_ex()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Ok(true));
        let manager = manager_with(mock).await;

        let options = LockOptions::default().with_retry_delay(Duration::from_millis(10));
        assert!(manager.acquire("job", 30, options).await);
    }

    #[tokio::test]
    async fn test_backend_error_stops_retrying() {
        let mut mock = MockCacheTransport::new();
        mock.expect_set_nx_ex()
            .times(1)
            .returning(|_, _, _| Err(CacheError::Connection("reset".into())));
        let manager = manager_with(mock).await;

        assert!(!manager.acquire("job", 30, LockOptions::default()).await);
    }

    #[tokio::test]
    async fn test_zero_retries_never_acquires() {
        let manager = manager_with(MockCacheTransport::new()).await;
        assert!(!manager.acquire("job", 30, LockOptions::default().with_retries(0)).await);
    }

    #[tokio::test]
    async fn test_uninitialized_client() {
        let service = CacheService::with_connector(CacheConfig::default(), Arc::new(MemoryConnector::new()));
        let manager = LockManager::new(Arc::new(service));

        assert!(!manager.acquire("job", 30, LockOptions::default()).await);
        assert!(!manager.release("job", Some("token")).await);
    }

    #[tokio::test]
    async fn test_release_requires_matching_token() {
        let (manager, _) = memory_manager().await;
        let options = LockOptions::default().with_identifier("owner");

        assert!(manager.acquire("job", 30, options).await);
        assert!(!manager.release("job", Some("intruder")).await);
        assert!(manager.release("job", Some("owner")).await);
        assert!(!manager.release("job", Some("owner")).await);
    }

    #[tokio::test]
    async fn test_forced_release_ignores_holder() {
        let (manager, connector) = memory_manager().await;

        let token = manager.acquire_token("job", 30, LockOptions::default()).await;
        assert!(token.is_some());
        assert!(manager.release("job", None).await);
        assert!(!connector.store().exists("lock:job").await.unwrap());

        // Nothing to release still reports success.
        assert!(manager.release("job", None).await);
    }

    #[tokio::test]
    async fn test_release_error_is_false() {
        let mut mock = MockCacheTransport::new();
        mock.expect_compare_and_delete()
            .returning(|_, _| Err(CacheError::Connection("reset".into())));
        let manager = manager_with(mock).await;

        assert!(!manager.release("job", Some("token")).await);
    }
}
