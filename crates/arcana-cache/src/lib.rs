//! # Arcana Cache
//!
//! Cache and distributed-lock client for a remote, TTL-aware key-value store.
//!
//! - [`codec`] translates values to and from the store's string wire format.
//! - [`CacheService`] owns the connection lifecycle and exposes the primitive
//!   operations, degrading failed writes to "no effect" results.
//! - [`LockManager`] layers token-verified advisory locks on top.
//!
//! The lock is single-store and advisory: a holder whose lease expires
//! mid-operation is not told, and no fencing token is issued.

pub mod cache_keys;
pub mod codec;
pub mod connection;
pub mod di;
pub mod error;
pub mod lock;
pub mod metrics;
pub mod transport;

mod cache_interface;
mod cache_service;

pub use cache_interface::{CacheExt, CacheInterface};
pub use cache_service::{CacheService, CacheServiceParameters};
pub use codec::CacheValue;
pub use connection::{
    ConnectionEvent, ConnectionHook, ConnectionLifecycle, ConnectionState, MetricsHook, TracingHook,
};
pub use di::{build_cache_module, build_cache_module_with, resolve_lock_manager, CacheModule};
pub use error::{CacheError, CacheResult};
pub use lock::{LockManager, LockOptions, TokenSource, UuidTokenSource};
pub use self::metrics::register_metrics;
pub use transport::{
    CacheTransport, ConnectionSettings, Connector, MemoryConnector, MemoryStore, RedisConnector, RedisTransport,
};
