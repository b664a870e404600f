//! Common test infrastructure for cache integration tests.

#![allow(dead_code)]

use arcana_cache::{CacheInterface, CacheService, LockManager, MemoryConnector, MemoryStore};
use arcana_config::CacheConfig;
use std::sync::Arc;
use testcontainers::{runners::AsyncRunner, ContainerAsync};
use testcontainers_modules::redis::Redis;

/// In-memory cache wrapper.
///
/// Clients created from one `TestCache` share the same store, like separate
/// processes talking to one server.
pub struct TestCache {
    connector: MemoryConnector,
}

impl TestCache {
    /// Creates an empty shared store.
    pub fn new() -> Self {
        Self {
            connector: MemoryConnector::new(),
        }
    }

    /// Returns the shared store.
    pub fn store(&self) -> Arc<MemoryStore> {
        self.connector.store()
    }

    /// Makes the shared store refuse every command.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.connector.set_unavailable(unavailable);
    }

    /// Creates and initializes a new client of the shared store.
    pub async fn client(&self) -> Arc<CacheService> {
        let service = CacheService::with_connector(CacheConfig::default(), Arc::new(self.connector.clone()));
        service.initialize().await.expect("Failed to initialize cache client");
        Arc::new(service)
    }

    /// Creates a lock manager over a new client.
    pub async fn locks(&self) -> LockManager {
        LockManager::new(self.client().await)
    }
}

/// Redis testcontainer wrapper.
pub struct TestRedis {
    _container: ContainerAsync<Redis>,
    config: CacheConfig,
}

impl TestRedis {
    /// Starts a fresh Redis container.
    pub async fn new() -> Self {
        let container = Redis::default()
            .start()
            .await
            .expect("Failed to start Redis container");

        let port = container
            .get_host_port_ipv4(6379)
            .await
            .expect("Failed to get Redis port");

        let config = CacheConfig {
            host: "127.0.0.1".to_string(),
            port,
            ..CacheConfig::default()
        };

        Self {
            _container: container,
            config,
        }
    }

    /// Creates and initializes a client of the container.
    pub async fn client(&self) -> Arc<CacheService> {
        let service = CacheService::new(self.config.clone());
        service.initialize().await.expect("Failed to connect to Redis");
        Arc::new(service)
    }
}

/// Shorthand for a key list.
pub fn keys(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Asserts that `cache` reports the given connection readiness.
pub fn assert_ready(cache: &dyn CacheInterface, ready: bool) {
    assert_eq!(cache.is_ready(), ready, "unexpected state {}", cache.state());
}
