//! Unified error types shared across the Arcana crates.

use std::fmt::Debug;
use thiserror::Error;

/// Unified error type for Arcana.
///
/// Crate-local errors (such as the cache client's `CacheError`) convert
/// into this type at the boundary to the host application.
#[derive(Error, Debug)]
pub enum ArcanaError {
    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Redis/Cache error
    #[error("Cache error: {0}")]
    Cache(String),

    /// Timeout error
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ArcanaError {
    /// Returns a machine-readable error code.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Configuration(_) => "CONFIGURATION_ERROR",
            Self::Cache(_) => "CACHE_ERROR",
            Self::Timeout(_) => "TIMEOUT",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Creates a validation error.
    #[must_use]
    pub fn validation<T: Into<String>>(message: T) -> Self {
        Self::Validation(message.into())
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn configuration<T: Into<String>>(message: T) -> Self {
        Self::Configuration(message.into())
    }

    /// Creates a cache error.
    #[must_use]
    pub fn cache<T: Into<String>>(message: T) -> Self {
        Self::Cache(message.into())
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal<T: Into<String>>(message: T) -> Self {
        Self::Internal(message.into())
    }

    /// Checks if this error is retriable.
    #[must_use]
    pub const fn is_retriable(&self) -> bool {
        matches!(self, Self::Cache(_) | Self::Timeout(_))
    }
}

impl From<serde_json::Error> for ArcanaError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("JSON serialization error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(ArcanaError::validation("bad input").error_code(), "VALIDATION_ERROR");
        assert_eq!(ArcanaError::configuration("missing").error_code(), "CONFIGURATION_ERROR");
        assert_eq!(ArcanaError::cache("down").error_code(), "CACHE_ERROR");
        assert_eq!(ArcanaError::Timeout("t".to_string()).error_code(), "TIMEOUT");
        assert_eq!(ArcanaError::internal("err").error_code(), "INTERNAL_ERROR");
    }

    #[test]
    fn test_retriable_errors() {
        assert!(ArcanaError::cache("connection lost").is_retriable());
        assert!(ArcanaError::Timeout("request timed out".to_string()).is_retriable());
        assert!(!ArcanaError::validation("bad input").is_retriable());
        assert!(!ArcanaError::configuration("bad port").is_retriable());
    }

    #[test]
    fn test_error_constructors() {
        let validation = ArcanaError::validation("invalid field");
        assert!(validation.to_string().contains("invalid field"));

        let cache = ArcanaError::cache("Redis client not initialized");
        assert!(cache.to_string().contains("not initialized"));

        let internal = ArcanaError::internal("panic");
        assert!(internal.to_string().contains("panic"));
    }

    #[test]
    fn test_from_serde_json_error() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let arcana: ArcanaError = err.into();
        assert!(matches!(arcana, ArcanaError::Internal(_)));
    }
}
