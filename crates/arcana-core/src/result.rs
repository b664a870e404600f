//! Result type aliases for Arcana.

use crate::ArcanaError;

/// A specialized `Result` type for Arcana operations.
pub type ArcanaResult<T> = Result<T, ArcanaError>;
