//! Application configuration structures.

use arcana_core::{ArcanaError, ArcanaResult, LogFormat};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Remote cache store configuration.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Observability configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Remote cache store configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Store host name.
    pub host: String,
    /// Store port.
    pub port: u16,
    /// Optional credential sent with AUTH.
    pub password: Option<String>,
    /// TTL applied when a write does not name one, in seconds.
    pub default_ttl_secs: u64,
    /// Connect timeout in milliseconds.
    pub connect_timeout_ms: u64,
    /// Per-command timeout in milliseconds.
    pub command_timeout_ms: u64,
    /// How many times a single command is retried across reconnects.
    pub max_retries_per_request: u32,
    /// Linear reconnect step in milliseconds.
    pub reconnect_step_ms: u64,
    /// Reconnect delay cap in milliseconds.
    pub reconnect_max_delay_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 6379,
            password: None,
            default_ttl_secs: 3600,
            connect_timeout_ms: 5_000,
            command_timeout_ms: 5_000,
            max_retries_per_request: 3,
            reconnect_step_ms: 50,
            reconnect_max_delay_ms: 2_000,
        }
    }
}

impl CacheConfig {
    /// Returns the `host:port` address.
    #[must_use]
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Builds the connection URL, embedding the credential when one is set.
    pub fn connection_url(&self) -> ArcanaResult<Url> {
        let mut url = Url::parse(&format!("redis://{}", self.addr()))
            .map_err(|e| ArcanaError::configuration(format!("Invalid cache address '{}': {}", self.addr(), e)))?;

        if let Some(password) = self.password.as_deref().filter(|p| !p.is_empty()) {
            url.set_password(Some(password))
                .map_err(|()| ArcanaError::configuration("Cache URL cannot carry a password"))?;
        }

        Ok(url)
    }

    /// Returns the connect timeout as a Duration.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Returns the command timeout as a Duration.
    #[must_use]
    pub const fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }

    /// Returns the reconnect step as a Duration.
    #[must_use]
    pub const fn reconnect_step(&self) -> Duration {
        Duration::from_millis(self.reconnect_step_ms)
    }

    /// Returns the reconnect delay cap as a Duration.
    #[must_use]
    pub const fn reconnect_max_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_max_delay_ms)
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
    /// Log format (json, pretty).
    pub log_format: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
        }
    }
}

impl ObservabilityConfig {
    /// Parses the configured log format.
    pub fn format(&self) -> ArcanaResult<LogFormat> {
        self.log_format.parse()
    }
}
