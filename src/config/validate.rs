//! Configuration validation.
//!
//! Validates configuration values and provides helpful error messages.

use fancy_regex::Regex;

use crate::common::error::ConfigError;
use crate::config::types::Config;

/// Validate a configuration and return detailed errors.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let mut errors = Vec::new();

    // Discord
    if config.discord.token.is_empty() {
        errors.push(
            "discord.token is required (or set RUSTLINK_DISCORD_TOKEN)".to_string(),
        );
    }
    if config.discord.token == "YOUR_DISCORD_TOKEN_HERE" {
        errors.push("discord.token has not been configured (still using placeholder)".to_string());
    }
    if config.discord.guild_id == Some(0) {
        errors.push("discord.guild_id must be non-zero".to_string());
    }

    // Storage
    if config.storage.path.trim().is_empty() {
        errors.push("storage.path must not be empty".to_string());
    }

    // Timeouts
    if config.query.timeout_secs == 0 {
        errors.push("query.timeout_secs must be non-zero".to_string());
    }
    if config.lookup.timeout_secs == 0 {
        errors.push("lookup.timeout_secs must be non-zero".to_string());
    }

    // Lookup endpoints
    for (field, value) in [
        ("lookup.api_base_url", &config.lookup.api_base_url),
        ("lookup.site_base_url", &config.lookup.site_base_url),
    ] {
        if !value.starts_with("http://") && !value.starts_with("https://") {
            errors.push(format!("{} must be an http(s) URL (got '{}')", field, value));
        }
    }

    if Regex::new(&config.lookup.map_link_pattern).is_err() {
        errors.push(format!(
            "lookup.map_link_pattern is not a valid regex: '{}'",
            config.lookup.map_link_pattern
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError {
            message: errors.join("\n"),
        })
    }
}
