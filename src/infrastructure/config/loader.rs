use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use std::path::Path;
use thiserror::Error;

use crate::domain::models::config::Config;

/// Project-local configuration file, looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "deltamin.yaml";

/// Prefix of environment variable overrides (`__` separates nested keys)
pub const ENV_PREFIX: &str = "DELTAMIN_";

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid min_granularity: {0}. Must be at least 2")]
    InvalidMinGranularity(usize),

    #[error("Invalid max_workers: {0}. Must be at least 1")]
    InvalidMaxWorkers(usize),

    #[error("Invalid oracle_timeout_ms: {0}. Must be positive")]
    InvalidOracleTimeout(u64),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. deltamin.yaml in the working directory (optional)
    /// 3. Environment variables (DELTAMIN_* prefix)
    pub fn load() -> Result<Config> {
        let config = Self::load_layers(None)?;
        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file instead of deltamin.yaml
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        let config = Self::load_layers(Some(path))?;
        Self::validate(&config)
            .with_context(|| format!("Failed to load config from {}", path.display()))?;
        Ok(config)
    }

    /// Merge defaults, the config file and the environment without validating.
    ///
    /// Command-line flags are applied on top of the result by the command
    /// layer, which validates once everything is merged.
    pub fn load_layers(path: Option<&Path>) -> Result<Config> {
        let figment = Figment::new().merge(Serialized::defaults(Config::default()));
        let figment = match path {
            Some(path) => {
                if !path.exists() {
                    anyhow::bail!("Config file not found: {}", path.display());
                }
                figment.merge(Yaml::file(path))
            }
            None => figment.merge(Yaml::file(DEFAULT_CONFIG_FILE)),
        };

        let config: Config = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .with_context(|| match path {
                Some(path) => format!("Failed to load config from {}", path.display()),
                None => "Failed to extract configuration from figment".to_string(),
            })?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        let reduction = &config.reduction;
        if reduction.min_granularity < 2 {
            return Err(ConfigError::InvalidMinGranularity(reduction.min_granularity));
        }

        if reduction.max_workers == 0 {
            return Err(ConfigError::InvalidMaxWorkers(reduction.max_workers));
        }

        if reduction.oracle_timeout_ms == Some(0) {
            return Err(ConfigError::InvalidOracleTimeout(0));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        Ok(())
    }
}
