//! Environment variable overrides for configuration.
//!
//! Supports overriding config values with environment variables:
//! - `RUSTLINK_DISCORD_TOKEN` - Discord bot token (`DISCORD_BOT_TOKEN` is also accepted)
//! - `RUSTLINK_DISCORD_GUILD_ID` - Guild to register slash commands on
//! - `RUSTLINK_STORAGE_PATH` - Registry file location
//! - `RUSTLINK_BATTLEMETRICS_TOKEN` - BattleMetrics API token
//!
//! A `.env` file in the working directory is loaded first, if present.

use std::env;

use tracing::debug;

use crate::config::types::Config;

/// Environment variable prefix for all config overrides.
const ENV_PREFIX: &str = "RUSTLINK";

/// Token variable used by earlier revisions of the bot.
const LEGACY_TOKEN_VAR: &str = "DISCORD_BOT_TOKEN";

/// Load `.env` into the process environment. Missing file is fine.
pub fn load_dotenv() {
    match dotenvy::dotenv() {
        Ok(path) => debug!("Loaded environment from {}", path.display()),
        Err(e) if e.not_found() => {}
        Err(e) => debug!("Ignoring unreadable .env file: {}", e),
    }
}

/// Apply environment variable overrides to a config.
pub fn apply_env_overrides(mut config: Config) -> Config {
    // Prefixed token wins over the legacy name
    if let Ok(token) = env::var(format!("{}_DISCORD_TOKEN", ENV_PREFIX)) {
        config.discord.token = token;
    } else if let Ok(token) = env::var(LEGACY_TOKEN_VAR) {
        config.discord.token = token;
    }

    if let Ok(guild_id) = env::var(format!("{}_DISCORD_GUILD_ID", ENV_PREFIX)) {
        if let Ok(id) = guild_id.parse() {
            config.discord.guild_id = Some(id);
        }
    }

    if let Ok(path) = env::var(format!("{}_STORAGE_PATH", ENV_PREFIX)) {
        config.storage.path = path;
    }

    if let Ok(token) = env::var(format!("{}_BATTLEMETRICS_TOKEN", ENV_PREFIX)) {
        if !token.is_empty() {
            config.lookup.api_token = Some(token);
        }
    }

    config
}

/// Get the config file path from environment or use default.
///
/// Checks `RUSTLINK_CONFIG` environment variable, otherwise returns "rustlink.conf".
pub fn get_config_path() -> String {
    env::var(format!("{}_CONFIG", ENV_PREFIX)).unwrap_or_else(|_| "rustlink.conf".to_string())
}
