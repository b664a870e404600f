//! Timeout wrapper for async operations.

use arcana_core::ArcanaError;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Returned when an operation did not finish within its budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Operation timed out after {0:?}")]
pub struct Elapsed(pub Duration);

impl From<Elapsed> for ArcanaError {
    fn from(err: Elapsed) -> Self {
        ArcanaError::Timeout(err.to_string())
    }
}

/// Wraps an async operation with a timeout.
///
/// The inner result is flattened: an inner error converts into `E`, and so
/// does the elapsed budget.
pub async fn with_timeout<Fut, T, E>(duration: Duration, fut: Fut) -> Result<T, E>
where
    Fut: Future<Output = Result<T, E>>,
    E: From<Elapsed>,
{
    tokio::time::timeout(duration, fut)
        .await
        .map_err(|_| E::from(Elapsed(duration)))?
}
