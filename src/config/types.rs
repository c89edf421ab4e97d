//! Configuration type definitions.

use std::time::Duration;

use serde::Deserialize;

/// Default BattleMetrics API endpoint.
pub const DEFAULT_API_BASE_URL: &str = "https://api.battlemetrics.com";

/// Default BattleMetrics website, used for listing pages.
pub const DEFAULT_SITE_BASE_URL: &str = "https://www.battlemetrics.com";

/// Default pattern an anchor href must match to count as a map link.
pub const DEFAULT_MAP_LINK_PATTERN: &str = r"rustmaps\.com/map/";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub discord: DiscordConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub query: QueryConfig,
    #[serde(default)]
    pub lookup: LookupConfig,
}

/// Discord bot configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DiscordConfig {
    #[serde(default)]
    pub token: String,
    /// Register slash commands on this guild only (instant) instead of globally.
    pub guild_id: Option<u64>,
}

/// Where the server registry is persisted.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_path")]
    pub path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
        }
    }
}

/// A2S query settings.
#[derive(Debug, Clone, Deserialize)]
pub struct QueryConfig {
    #[serde(default = "default_query_timeout_secs")]
    pub timeout_secs: u64,
}

impl QueryConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_query_timeout_secs(),
        }
    }
}

/// Server directory (BattleMetrics) and map link settings.
#[derive(Debug, Clone, Deserialize)]
pub struct LookupConfig {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_site_base_url")]
    pub site_base_url: String,
    #[serde(default = "default_lookup_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_map_link_pattern")]
    pub map_link_pattern: String,
    /// Optional BattleMetrics API token (raises rate limits).
    pub api_token: Option<String>,
}

impl LookupConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            site_base_url: default_site_base_url(),
            timeout_secs: default_lookup_timeout_secs(),
            map_link_pattern: default_map_link_pattern(),
            api_token: None,
        }
    }
}

fn default_storage_path() -> String {
    "servers.json".to_string()
}

fn default_query_timeout_secs() -> u64 {
    3
}

fn default_lookup_timeout_secs() -> u64 {
    10
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_site_base_url() -> String {
    DEFAULT_SITE_BASE_URL.to_string()
}

fn default_map_link_pattern() -> String {
    DEFAULT_MAP_LINK_PATTERN.to_string()
}
