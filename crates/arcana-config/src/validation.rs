//! Configuration validation module.
//!
//! Collects every problem in one pass so misconfiguration fails fast at
//! startup rather than at the first cache call.

use crate::{AppConfig, CacheConfig, ObservabilityConfig};
use std::fmt;

/// Configuration validation error variants.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValidationError {
    /// Host name is empty.
    EmptyHost,
    /// Port number is invalid (must be 1-65535).
    InvalidPort { name: String, value: u16 },
    /// Timeout or TTL value must be positive.
    NonPositive { name: String },
    /// Reconnect step is larger than the reconnect cap.
    InvalidBackoff { step_ms: u64, max_delay_ms: u64 },
    /// Log level is invalid.
    InvalidLogLevel { value: String },
    /// Log format is invalid.
    InvalidLogFormat { value: String },
}

impl fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyHost => write!(f, "Cache host cannot be empty"),
            Self::InvalidPort { name, value } => {
                write!(f, "Invalid port for {}: {} (must be 1-65535)", name, value)
            }
            Self::NonPositive { name } => write!(f, "'{}' must be positive", name),
            Self::InvalidBackoff { step_ms, max_delay_ms } => write!(
                f,
                "Reconnect step ({}ms) cannot exceed reconnect cap ({}ms)",
                step_ms, max_delay_ms
            ),
            Self::InvalidLogLevel { value } => write!(
                f,
                "Invalid log level: '{}' (valid: trace, debug, info, warn, error)",
                value
            ),
            Self::InvalidLogFormat { value } => {
                write!(f, "Invalid log format: '{}' (valid: pretty, json)", value)
            }
        }
    }
}

impl std::error::Error for ConfigValidationError {}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Valid log levels.
    const VALID_LOG_LEVELS: &'static [&'static str] = &["trace", "debug", "info", "warn", "error"];

    /// Validates the entire application configuration.
    ///
    /// Returns Ok(()) if valid, or Err with all validation errors found.
    pub fn validate(config: &AppConfig) -> Result<(), Vec<ConfigValidationError>> {
        let mut errors = Vec::new();

        Self::validate_cache(&config.cache, &mut errors);
        Self::validate_observability(&config.observability, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Validates cache connection configuration.
    pub fn validate_cache(config: &CacheConfig, errors: &mut Vec<ConfigValidationError>) {
        if config.host.trim().is_empty() {
            errors.push(ConfigValidationError::EmptyHost);
        }

        if config.port == 0 {
            errors.push(ConfigValidationError::InvalidPort {
                name: "cache.port".to_string(),
                value: config.port,
            });
        }

        let positives = [
            ("cache.default_ttl_secs", config.default_ttl_secs),
            ("cache.connect_timeout_ms", config.connect_timeout_ms),
            ("cache.command_timeout_ms", config.command_timeout_ms),
            ("cache.reconnect_step_ms", config.reconnect_step_ms),
        ];
        for (name, value) in positives {
            if value == 0 {
                errors.push(ConfigValidationError::NonPositive { name: name.to_string() });
            }
        }

        if config.reconnect_step_ms > config.reconnect_max_delay_ms {
            errors.push(ConfigValidationError::InvalidBackoff {
                step_ms: config.reconnect_step_ms,
                max_delay_ms: config.reconnect_max_delay_ms,
            });
        }
    }

    /// Validates observability configuration.
    fn validate_observability(config: &ObservabilityConfig, errors: &mut Vec<ConfigValidationError>) {
        if !Self::VALID_LOG_LEVELS.contains(&config.log_level.to_lowercase().as_str()) {
            errors.push(ConfigValidationError::InvalidLogLevel {
                value: config.log_level.clone(),
            });
        }

        if config.format().is_err() {
            errors.push(ConfigValidationError::InvalidLogFormat {
                value: config.log_format.clone(),
            });
        }
    }
}

/// Formats validation errors into a single message.
#[must_use]
pub fn format_validation_errors(errors: &[ConfigValidationError]) -> String {
    let lines: Vec<String> = errors.iter().map(|e| format!("  - {}", e)).collect();
    format!("Configuration validation failed:\n{}", lines.join("\n"))
}
