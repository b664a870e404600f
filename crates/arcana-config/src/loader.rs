//! Configuration loader with layered sources.

use crate::{format_validation_errors, AppConfig, CacheConfig, ConfigValidator};
use arcana_core::ArcanaError;
use config::{Config, ConfigError, Environment, File};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Plain environment variables recognised for the cache connection,
/// mapped to their configuration key.
pub const CACHE_ENV_OVERRIDES: &[(&str, &str)] = &[
    ("REDIS_HOST", "cache.host"),
    ("REDIS_PORT", "cache.port"),
    ("REDIS_PASSWORD", "cache.password"),
    ("REDIS_DEFAULT_TTL", "cache.default_ttl_secs"),
];

/// Configuration loader with runtime refresh support.
#[derive(Clone)]
pub struct ConfigLoader {
    config: Arc<RwLock<AppConfig>>,
    config_dir: String,
}

impl ConfigLoader {
    /// Creates a new configuration loader.
    ///
    /// Configuration is loaded from multiple sources in order:
    /// 1. `config/default.toml` - Default values
    /// 2. `config/{environment}.toml` - Environment-specific overrides
    /// 3. `config/local.toml` - Local overrides
    /// 4. Environment variables with `ARCANA__` prefix
    /// 5. `REDIS_HOST`, `REDIS_PORT`, `REDIS_PASSWORD`, `REDIS_DEFAULT_TTL`
    pub fn new(config_dir: impl Into<String>) -> Result<Self, ArcanaError> {
        let config_dir = config_dir.into();
        let config = Self::load_config(&config_dir)?;

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            config_dir,
        })
    }

    /// Returns the current configuration.
    pub async fn get(&self) -> AppConfig {
        self.config.read().await.clone()
    }

    /// Returns the current cache configuration.
    pub async fn cache(&self) -> CacheConfig {
        self.config.read().await.cache.clone()
    }

    /// Reloads the configuration from disk.
    pub async fn reload(&self) -> Result<(), ArcanaError> {
        let new_config = Self::load_config(&self.config_dir)?;
        let mut config = self.config.write().await;
        *config = new_config;
        info!("Configuration reloaded successfully");
        Ok(())
    }

    /// Loads configuration from the specified directory.
    fn load_config(config_dir: &str) -> Result<AppConfig, ArcanaError> {
        // Load .env file if present
        if let Err(e) = dotenvy::dotenv() {
            debug!("No .env file found or error loading it: {}", e);
        }

        let environment = std::env::var("ARCANA_ENVIRONMENT").unwrap_or_else(|_| "development".to_string());
        let overrides: Vec<(&str, Option<String>)> = CACHE_ENV_OVERRIDES
            .iter()
            .map(|(var, key)| (*key, std::env::var(var).ok()))
            .collect();

        load_config_from(config_dir, &environment, &overrides)
    }
}

/// Builds and validates configuration from `config_dir` for `environment`,
/// applying `overrides` (configuration key, value) last.
pub fn load_config_from(
    config_dir: &str,
    environment: &str,
    overrides: &[(&str, Option<String>)],
) -> Result<AppConfig, ArcanaError> {
    info!("Loading configuration for environment: {}", environment);

    let mut builder = Config::builder();

    for name in ["default", environment, "local"] {
        let path = format!("{}/{}.toml", config_dir, name);
        if Path::new(&path).exists() {
            debug!("Loading config from: {}", path);
            builder = builder.add_source(File::with_name(&path).required(false));
        }
    }

    builder = builder.add_source(
        Environment::with_prefix("ARCANA")
            .separator("__")
            .try_parsing(true),
    );

    for (key, value) in overrides {
        builder = builder
            .set_override_option(*key, value.clone())
            .map_err(config_error_to_arcana_error)?;
    }

    let app_config: AppConfig = builder
        .build()
        .map_err(config_error_to_arcana_error)?
        .try_deserialize()
        .map_err(config_error_to_arcana_error)?;

    ConfigValidator::validate(&app_config)
        .map_err(|errors| ArcanaError::Configuration(format_validation_errors(&errors)))?;

    Ok(app_config)
}

fn config_error_to_arcana_error(err: ConfigError) -> ArcanaError {
    ArcanaError::Configuration(err.to_string())
}
