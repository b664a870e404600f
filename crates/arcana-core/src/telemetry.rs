//! Logging bootstrap.
//!
//! Installs a `tracing` subscriber for host processes that embed the cache
//! client. Library code only emits events; it never installs a subscriber
//! on its own.

use crate::{ArcanaError, ArcanaResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human readable, multi-field lines.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pretty => write!(f, "pretty"),
            Self::Json => write!(f, "json"),
        }
    }
}

impl FromStr for LogFormat {
    type Err = ArcanaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ArcanaError::configuration(format!(
                "Unknown log format '{}' (valid: pretty, json)",
                other
            ))),
        }
    }
}

/// Builds the default filter directive for a base level.
#[must_use]
pub fn default_filter(level: &str) -> String {
    format!("{},arcana=debug", level)
}

/// Initialize logging with the given format and base level.
///
/// `RUST_LOG` takes precedence over `level` when set. Calling this twice
/// returns an error instead of panicking.
pub fn init_logging(format: LogFormat, level: &str) -> ArcanaResult<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(level)));

    let registry = tracing_subscriber::registry().with(filter);

    let result = match format {
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .try_init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .try_init(),
    };

    result.map_err(|e| ArcanaError::internal(format!("Failed to install tracing subscriber: {}", e)))?;

    tracing::info!(format = %format, level = %level, "Logging initialized");
    Ok(())
}
