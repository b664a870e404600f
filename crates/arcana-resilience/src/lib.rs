//! # Arcana Resilience
//!
//! Resilience patterns for the Arcana cache client.
//! Provides reconnect backoff and timeouts.

pub mod retry;
pub mod timeout;

pub use retry::*;
pub use timeout::*;
