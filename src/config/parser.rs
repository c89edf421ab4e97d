//! Configuration file parsing (HOCON format).

use std::path::Path;

use hocon::HoconLoader;
use tracing::info;

use crate::common::error::ConfigError;
use crate::config::env::apply_env_overrides;
use crate::config::types::Config;
use crate::config::validate::validate_config;

/// Load configuration from a HOCON file.
pub fn load_config(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let path = path.as_ref();

    HoconLoader::new()
        .load_file(path)
        .map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            message: e.to_string(),
        })?
        .resolve()
        .map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })
}

/// Load configuration from a HOCON string.
pub fn load_config_str(content: &str) -> Result<Config, ConfigError> {
    HoconLoader::new()
        .load_str(content)
        .map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })?
        .resolve()
        .map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })
}

/// Load the config file (if present), apply environment overrides and validate.
///
/// A missing file falls back to defaults so the bot can be configured purely
/// through the environment.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let path = path.as_ref();

    let config = if path.exists() {
        load_config(path)?
    } else {
        info!(
            "Config file {} not found, using defaults and environment",
            path.display()
        );
        Config::default()
    };

    let config = apply_env_overrides(config);
    validate_config(&config)?;
    Ok(config)
}
