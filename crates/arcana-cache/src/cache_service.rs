//! Store client owning the connection lifecycle.

use crate::cache_interface::CacheInterface;
use crate::connection::{ConnectionEvent, ConnectionHook, ConnectionLifecycle, ConnectionState};
use crate::error::{CacheError, CacheResult};
use crate::metrics::CacheMetrics;
use crate::transport::{CacheTransport, ConnectionSettings, Connector, RedisConnector};
use arcana_config::CacheConfig;
use async_trait::async_trait;
use parking_lot::RwLock;
use shaku::Component;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Cache client over a single owned connection.
///
/// Construct one per process, call [`initialize`](CacheInterface::initialize)
/// during startup and [`shutdown`](CacheInterface::shutdown) on exit.
#[derive(Component)]
#[shaku(interface = CacheInterface)]
pub struct CacheService {
    #[shaku(default)]
    config: CacheConfig,
    #[shaku(default = Arc::new(RedisConnector))]
    connector: Arc<dyn Connector>,
    #[shaku(default = Arc::new(ConnectionLifecycle::with_default_hooks()))]
    lifecycle: Arc<ConnectionLifecycle>,
    #[shaku(default)]
    handle: RwLock<Option<Arc<dyn CacheTransport>>>,
    #[shaku(default)]
    init_gate: tokio::sync::Mutex<()>,
}

impl CacheService {
    /// Creates a Redis-backed client. Does not connect.
    #[must_use]
    pub fn new(config: CacheConfig) -> Self {
        Self::with_connector(config, Arc::new(RedisConnector))
    }

    /// Creates a client over a custom connector.
    #[must_use]
    pub fn with_connector(config: CacheConfig, connector: Arc<dyn Connector>) -> Self {
        Self {
            config,
            connector,
            lifecycle: Arc::new(ConnectionLifecycle::with_default_hooks()),
            handle: RwLock::new(None),
            init_gate: tokio::sync::Mutex::new(()),
        }
    }

    /// Registers an extra lifecycle hook.
    #[must_use]
    pub fn with_hook(self, hook: Arc<dyn ConnectionHook>) -> Self {
        self.lifecycle.add_hook(hook);
        self
    }

    /// Returns the configuration.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Runs `f` against the live transport, degrading any failure to
    /// `fallback`.
    async fn run<T, F, Fut>(&self, op: &'static str, key: &str, fallback: T, f: F) -> T
    where
        F: FnOnce(Arc<dyn CacheTransport>) -> Fut,
        Fut: Future<Output = CacheResult<T>>,
    {
        let result = match self.handle() {
            Ok(handle) => f(handle).await,
            Err(err) => Err(err),
        };
        absorb(op, key, result, fallback)
    }
}

/// Unwraps `result`, or logs the failure and returns `fallback`.
fn absorb<T>(op: &'static str, key: &str, result: CacheResult<T>, fallback: T) -> T {
    match result {
        Ok(value) => value,
        Err(err) => {
            error!(op, key, error = %err, "Cache operation failed");
            CacheMetrics::error(op);
            fallback
        }
    }
}

#[async_trait]
impl CacheInterface for CacheService {
    async fn initialize(&self) -> CacheResult<()> {
        let _gate = self.init_gate.lock().await;
        if self.handle.read().is_some() {
            warn!("Cache service already initialized");
            return Ok(());
        }

        let settings = ConnectionSettings::from_config(&self.config)?;
        info!(addr = %self.config.addr(), "Initializing cache service");
        self.lifecycle.record(ConnectionEvent::Connecting);

        match self.connector.connect(&settings, self.lifecycle.clone()).await {
            Ok(transport) => {
                *self.handle.write() = Some(transport);
                info!("Cache service initialized successfully");
                Ok(())
            }
            Err(err) => {
                self.lifecycle.record(ConnectionEvent::Error(err.to_string()));
                self.lifecycle.record(ConnectionEvent::Ended);
                error!(error = %err, "Failed to initialize cache service");
                Err(err)
            }
        }
    }

    async fn shutdown(&self) {
        let handle = self.handle.write().take();
        let Some(handle) = handle else {
            debug!("Cache service not initialized, nothing to shut down");
            return;
        };

        match handle.close().await {
            Ok(()) => info!("Cache service disconnected"),
            Err(err) => error!(error = %err, "Failed to disconnect from cache service"),
        }
        self.lifecycle.record(ConnectionEvent::Ended);
    }

    fn state(&self) -> ConnectionState {
        self.lifecycle.state()
    }

    fn handle(&self) -> CacheResult<Arc<dyn CacheTransport>> {
        self.handle.read().clone().ok_or(CacheError::NotInitialized)
    }

    fn default_ttl_secs(&self) -> u64 {
        self.config.default_ttl_secs
    }

    async fn get_raw(&self, key: &str) -> CacheResult<Option<String>> {
        let handle = self.handle()?;

        match handle.get(key).await {
            Ok(Some(value)) if !value.is_empty() => {
                CacheMetrics::hit();
                Ok(Some(value))
            }
            Ok(_) => {
                CacheMetrics::miss();
                Ok(None)
            }
            Err(err) => {
                error!(key, error = %err, "Error getting value from cache");
                CacheMetrics::error("get");
                Err(err)
            }
        }
    }

    async fn set_raw(&self, key: &str, value: &str, ttl_secs: Option<u64>) -> bool {
        let ttl = ttl_secs.unwrap_or(self.config.default_ttl_secs);
        self.run("set", key, false, |h| async move { h.set_ex(key, value, ttl).await })
            .await
    }

    async fn del(&self, key: &str) -> bool {
        let keys = [key.to_string()];
        self.run("del", key, false, |h| async move { h.del(&keys).await.map(|n| n == 1) })
            .await
    }

    async fn del_many(&self, keys: &[String]) -> u64 {
        if keys.is_empty() {
            return 0;
        }

        let label = format!("{} keys", keys.len());
        self.run("del_many", &label, 0, |h| async move { h.del(keys).await })
            .await
    }

    async fn exists(&self, key: &str) -> bool {
        self.run("exists", key, false, |h| async move { h.exists(key).await })
            .await
    }

    async fn expire(&self, key: &str, ttl_secs: u64) -> bool {
        self.run("expire", key, false, |h| async move { h.expire(key, ttl_secs).await })
            .await
    }

    async fn ttl(&self, key: &str) -> i64 {
        self.run("ttl", key, 0, |h| async move { h.ttl(key).await })
            .await
    }

    async fn flush_all(&self) -> bool {
        warn!("Flushing all keys from cache");
        self.run("flush_all", "*", false, |h| async move { h.flush_all().await })
            .await
    }

    async fn keys(&self, pattern: &str) -> Vec<String> {
        self.run("keys", pattern, Vec::new(), |h| async move { h.keys(pattern).await })
            .await
    }
}
