//! Dependency injection module using Shaku.

use crate::cache_interface::CacheInterface;
use crate::cache_service::{CacheService, CacheServiceParameters};
use crate::connection::ConnectionLifecycle;
use crate::lock::LockManager;
use crate::transport::{Connector, RedisConnector};
use arcana_config::CacheConfig;
use shaku::{module, HasComponent};
use std::sync::Arc;

// Cache module exposing the store client as `CacheInterface`.
module! {
    pub CacheModule {
        components = [CacheService],
        providers = [],
    }
}

/// Builds the cache module for a Redis backend.
pub fn build_cache_module(config: &CacheConfig) -> Arc<CacheModule> {
    build_cache_module_with(config, Arc::new(RedisConnector))
}

/// Builds the cache module over a custom connector.
pub fn build_cache_module_with(config: &CacheConfig, connector: Arc<dyn Connector>) -> Arc<CacheModule> {
    let module = CacheModule::builder()
        .with_component_parameters::<CacheService>(CacheServiceParameters {
            config: config.clone(),
            connector,
            lifecycle: Arc::new(ConnectionLifecycle::with_default_hooks()),
            handle: Default::default(),
            init_gate: Default::default(),
        })
        .build();

    Arc::new(module)
}

/// Resolves a lock manager backed by the module's store client.
pub fn resolve_lock_manager(module: &CacheModule) -> LockManager {
    let cache: Arc<dyn CacheInterface> = module.resolve();
    LockManager::new(cache)
}
