//! # Arcana Core
//!
//! Core error definitions and logging bootstrap shared by the Arcana
//! cache and locking crates.

pub mod error;
pub mod result;
pub mod telemetry;

pub use error::*;
pub use result::*;
pub use telemetry::*;

// Re-export shaku so components can declare injectable interfaces
pub use shaku::Interface;
