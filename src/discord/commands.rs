//! Bot commands (/link, /pop, /wipe, /map, /list).
//!
//! Parsing and dispatch are independent of serenity so each command can be
//! exercised without a Discord connection. Every command produces exactly one
//! textual reply; errors are turned into replies here.

use std::sync::Arc;

use tracing::{info, warn};

use crate::common::error::RegistryError;
use crate::common::types::{format_address, parse_address};
use crate::lookup::{LookupResolver, MapLinkResult};
use crate::query::QueryClient;
use crate::registry::RegistryStore;

/// Fixed reply for /wipe.
pub const WIPE_UNSUPPORTED: &str = "⚠️ Wipe times are not available: the server query protocol \
does not report uptime or wipe dates, so they can't be estimated.";

/// Fixed reply for /list on an empty registry.
pub const NO_SERVERS: &str = "📭 No servers linked yet. Use `/link` to add one.";

/// A parsed bot command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotCommand {
    Link { name: String, address: String },
    Pop { name: String },
    Wipe { name: String },
    Map { name: String },
    List,
}

impl BotCommand {
    /// Build a command from its name and an option lookup.
    pub fn parse(
        command: &str,
        option: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, String> {
        let required = |key: &str| {
            option(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| format!("Missing required option `{}`", key))
        };

        match command {
            "link" => Ok(Self::Link {
                name: required("name")?,
                address: required("address")?,
            }),
            "pop" => Ok(Self::Pop {
                name: required("name")?,
            }),
            "wipe" => Ok(Self::Wipe {
                name: required("name")?,
            }),
            "map" => Ok(Self::Map {
                name: required("name")?,
            }),
            "list" => Ok(Self::List),
            other => Err(format!("Unknown command `{}`", other)),
        }
    }

    /// Command name as registered with Discord.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Link { .. } => "link",
            Self::Pop { .. } => "pop",
            Self::Wipe { .. } => "wipe",
            Self::Map { .. } => "map",
            Self::List => "list",
        }
    }

    /// Commands that make outbound calls must acknowledge first.
    pub fn needs_defer(&self) -> bool {
        matches!(self, Self::Pop { .. } | Self::Map { .. })
    }
}

/// Executes commands against the registry, query client and lookup resolver.
pub struct CommandDispatcher {
    registry: Arc<RegistryStore>,
    query: QueryClient,
    lookup: LookupResolver,
}

impl CommandDispatcher {
    pub fn new(registry: Arc<RegistryStore>, query: QueryClient, lookup: LookupResolver) -> Self {
        Self {
            registry,
            query,
            lookup,
        }
    }

    /// Run a command and produce its reply.
    pub async fn dispatch(&self, command: BotCommand) -> String {
        match command {
            BotCommand::Link { name, address } => self.link(&name, &address).await,
            BotCommand::Pop { name } => self.pop(&name).await,
            BotCommand::Wipe { name } => self.wipe(&name),
            BotCommand::Map { name } => self.map(&name).await,
            BotCommand::List => self.list().await,
        }
    }

    /// Handle /link.
    pub async fn link(&self, name: &str, address: &str) -> String {
        let (host, port) = match parse_address(address) {
            Ok(parsed) => parsed,
            Err(e) => return format!("❌ {}", e),
        };

        match self.registry.upsert(name, &host, port as u32).await {
            Ok(entry) => format!("🔗 Linked `{}` to `{}`.", entry.name, entry.address()),
            Err(e @ RegistryError::Validation(_)) => format!("❌ {}", e),
            Err(e) => {
                warn!("Failed to link {}: {}", name, e);
                format!("❌ Failed to save server list: {}", e)
            }
        }
    }

    /// Handle /pop.
    pub async fn pop(&self, name: &str) -> String {
        let entry = match self.registry.get(name).await {
            Ok(entry) => entry,
            Err(e) => return not_found_reply(name, e),
        };

        match self.query.query(&entry.host, entry.port).await {
            Ok(info) => {
                let mut reply = format!(
                    "🌍 `{}`\n👥 Players: {}/{}",
                    info.name, info.players, info.max_players
                );
                if let Some(uptime) = info.uptime {
                    let minutes = uptime.as_secs() / 60;
                    reply.push_str(&format!("\n⏱️ Uptime: {}h {}m", minutes / 60, minutes % 60));
                }
                reply
            }
            Err(e) => {
                warn!("Query of {} ({}) failed: {}", name, entry.address(), e);
                format!("❌ Failed to fetch server info: {}", e)
            }
        }
    }

    /// Handle /wipe. Never touches the registry or the network.
    pub fn wipe(&self, name: &str) -> String {
        info!("Wipe requested for {} (unsupported)", name);
        WIPE_UNSUPPORTED.to_string()
    }

    /// Handle /map.
    pub async fn map(&self, name: &str) -> String {
        let entry = match self.registry.get(name).await {
            Ok(entry) => entry,
            Err(e) => return not_found_reply(name, e),
        };

        match self.lookup.resolve(&entry.host, entry.port).await {
            Ok(MapLinkResult::Resolved(url)) => format!("🗺️ Map for `{}`: {}", name, url),
            Ok(MapLinkResult::PageFoundNoLink(page_url)) => format!(
                "🗺️ No map link found for `{}`. Server page: {}",
                name, page_url
            ),
            Ok(MapLinkResult::NoListingFound) => format!(
                "❌ `{}` is not listed on BattleMetrics.",
                format_address(&entry.host, entry.port)
            ),
            Ok(MapLinkResult::NoExactMatch) => format!(
                "❌ No BattleMetrics listing matches `{}` exactly.",
                format_address(&entry.host, entry.port)
            ),
            Err(e) => {
                warn!("Map lookup for {} ({}) failed: {}", name, entry.address(), e);
                format!("❌ Map lookup failed: {}", e)
            }
        }
    }

    /// Handle /list.
    pub async fn list(&self) -> String {
        let entries = self.registry.list().await;
        if entries.is_empty() {
            return NO_SERVERS.to_string();
        }

        let lines: Vec<String> = entries.iter().map(|e| e.to_string()).collect();
        format!("📋 Linked servers:\n```\n{}\n```", lines.join("\n"))
    }
}

fn not_found_reply(name: &str, error: RegistryError) -> String {
    match error {
        RegistryError::NotFound { .. } => {
            format!("❌ Server `{}` not found. Use `/link` first.", name)
        }
        other => format!("❌ {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::LookupConfig;
    use crate::query::packets::tests::info_datagram;
    use serde_json::json;
    use std::collections::HashMap;
    use std::time::Duration;
    use tempfile::TempDir;
    use tokio::net::UdpSocket;
    use wiremock::matchers::{any, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct Fixture {
        _dir: TempDir,
        registry: Arc<RegistryStore>,
        dispatcher: CommandDispatcher,
    }

    async fn fixture(directory: &MockServer) -> Fixture {
        let dir = TempDir::new().unwrap();
        let registry = Arc::new(
            RegistryStore::open(dir.path().join("servers.json"))
                .await
                .unwrap(),
        );
        let lookup = LookupResolver::new(&LookupConfig {
            api_base_url: directory.uri(),
            site_base_url: directory.uri(),
            ..LookupConfig::default()
        })
        .unwrap();
        let dispatcher = CommandDispatcher::new(
            Arc::clone(&registry),
            QueryClient::new(Duration::from_millis(500)),
            lookup,
        );
        Fixture {
            _dir: dir,
            registry,
            dispatcher,
        }
    }

    fn options(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_parse_commands() {
        let link = BotCommand::parse(
            "link",
            options(&[("name", "main"), ("address", "1.2.3.4:28015")]),
        )
        .unwrap();
        assert_eq!(
            link,
            BotCommand::Link {
                name: "main".to_string(),
                address: "1.2.3.4:28015".to_string()
            }
        );
        assert_eq!(BotCommand::parse("list", options(&[])).unwrap(), BotCommand::List);
        assert!(BotCommand::parse("map", options(&[("name", "main")]))
            .unwrap()
            .needs_defer());
        assert!(!BotCommand::parse("wipe", options(&[("name", "main")]))
            .unwrap()
            .needs_defer());
    }

    #[test]
    fn test_parse_rejects_missing_options_and_unknown_commands() {
        assert!(BotCommand::parse("link", options(&[("name", "main")])).is_err());
        assert!(BotCommand::parse("pop", options(&[("name", "   ")])).is_err());
        assert!(BotCommand::parse("nuke", options(&[])).is_err());
    }

    #[tokio::test]
    async fn test_link_then_list() {
        let directory = MockServer::start().await;
        let f = fixture(&directory).await;

        assert_eq!(f.dispatcher.list().await, NO_SERVERS);

        let reply = f.dispatcher.link("main", "203.0.113.7:28015").await;
        assert_eq!(reply, "🔗 Linked `main` to `203.0.113.7:28015`.");
        f.dispatcher.link("alt", "play.example.com:28016").await;

        let reply = f.dispatcher.list().await;
        assert!(reply.contains("alt -> play.example.com:28016\nmain -> 203.0.113.7:28015"));
    }

    #[tokio::test]
    async fn test_malformed_link_reports_error_and_keeps_registry() {
        let directory = MockServer::start().await;
        let f = fixture(&directory).await;
        f.dispatcher.link("main", "203.0.113.7:28015").await;

        for bad in ["203.0.113.8", "203.0.113.8:port", "203.0.113.8:70000"] {
            let reply = f.dispatcher.link("main", bad).await;
            assert!(reply.starts_with("❌"), "unexpected reply {}", reply);
        }

        let entry = f.registry.get("main").await.unwrap();
        assert_eq!(entry.address(), "203.0.113.7:28015");
    }

    #[tokio::test]
    async fn test_unlinked_name_is_not_found() {
        let directory = MockServer::start().await;
        let f = fixture(&directory).await;

        let expected = "❌ Server `ghost` not found. Use `/link` first.";
        assert_eq!(f.dispatcher.pop("ghost").await, expected);
        assert_eq!(f.dispatcher.map("ghost").await, expected);
    }

    #[tokio::test]
    async fn test_wipe_is_always_unsupported_without_network() {
        let directory = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&directory)
            .await;
        let f = fixture(&directory).await;
        f.dispatcher.link("main", "203.0.113.7:28015").await;

        assert_eq!(f.dispatcher.wipe("main"), WIPE_UNSUPPORTED);
        assert_eq!(f.dispatcher.wipe("ghost"), WIPE_UNSUPPORTED);
        assert_eq!(
            f.dispatcher
                .dispatch(BotCommand::Wipe {
                    name: "main".to_string()
                })
                .await,
            WIPE_UNSUPPORTED
        );
    }

    #[tokio::test]
    async fn test_pop_formats_population() {
        let directory = MockServer::start().await;
        let f = fixture(&directory).await;

        let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = server.local_addr().unwrap().port();
        tokio::spawn(async move {
            let mut buf = [0u8; 1400];
            let (_, peer) = server.recv_from(&mut buf).await.unwrap();
            server
                .send_to(&info_datagram("[EU] Weekly", 87, 150, None), peer)
                .await
                .unwrap();
        });

        f.dispatcher.link("eu", &format!("127.0.0.1:{}", port)).await;
        let reply = f.dispatcher.pop("eu").await;
        assert_eq!(reply, "🌍 `[EU] Weekly`\n👥 Players: 87/150");
    }

    #[tokio::test]
    async fn test_pop_timeout_is_reported() {
        let directory = MockServer::start().await;
        let f = fixture(&directory).await;

        let silent = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = silent.local_addr().unwrap().port();
        f.dispatcher.link("quiet", &format!("127.0.0.1:{}", port)).await;

        let reply = f.dispatcher.pop("quiet").await;
        assert!(reply.starts_with("❌ Failed to fetch server info"));
    }

    #[tokio::test]
    async fn test_map_replies_for_each_outcome() {
        let directory = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/servers"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{
                    "id": "7",
                    "attributes": { "ip": "203.0.113.7", "port": 28015 }
                }]
            })))
            .mount(&directory)
            .await;
        Mock::given(method("GET"))
            .and(path("/servers/rust/7"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"<a href="https://rustmaps.com/map/abc123">map</a>"#),
            )
            .mount(&directory)
            .await;
        let f = fixture(&directory).await;

        f.dispatcher.link("main", "203.0.113.7:28015").await;
        assert_eq!(
            f.dispatcher.map("main").await,
            "🗺️ Map for `main`: https://rustmaps.com/map/abc123"
        );

        f.dispatcher.link("other", "203.0.113.7:28099").await;
        assert_eq!(
            f.dispatcher.map("other").await,
            "❌ No BattleMetrics listing matches `203.0.113.7:28099` exactly."
        );
    }

    #[tokio::test]
    async fn test_map_directory_failure_is_reported() {
        let directory = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/servers"))
            .respond_with(ResponseTemplate::new(429).set_body_string("Too Many Requests"))
            .mount(&directory)
            .await;
        let f = fixture(&directory).await;
        f.dispatcher.link("main", "203.0.113.7:28015").await;

        let reply = f.dispatcher.map("main").await;
        assert!(reply.contains("429"));
        assert!(reply.contains("Too Many Requests"));
    }
}
