//! rustlink - Discord bot for Rust game servers
//!
//! Links short names to server addresses and answers population and map
//! questions about them through slash commands.

mod common;
mod config;
mod discord;
mod lookup;
mod query;
mod registry;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info, warn};

use config::env::{get_config_path, load_dotenv};
use config::load_and_validate;
use discord::{CommandDispatcher, DiscordBotBuilder};
use lookup::LookupResolver;
use query::QueryClient;
use registry::RegistryStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("rustlink v{} starting...", env!("CARGO_PKG_VERSION"));

    load_dotenv();

    let config_path = get_config_path();
    info!("Loading configuration from {}...", config_path);

    let config = load_and_validate(&config_path).map_err(|e| {
        error!("Failed to load configuration: {}", e);
        error!(
            "Provide {} or set RUSTLINK_DISCORD_TOKEN in the environment.",
            config_path
        );
        e
    })?;

    info!("Configuration loaded successfully");
    info!("  Registry file: {}", config.storage.path);
    info!("  Query timeout: {}s", config.query.timeout_secs);
    info!("  Directory API: {}", config.lookup.api_base_url);

    // A corrupt registry must not be silently replaced by an empty one.
    let registry = RegistryStore::open(&config.storage.path)
        .await
        .map_err(|e| {
            error!("Failed to load server registry: {}", e);
            error!("Fix or move the file away before restarting.");
            e
        })?;

    let query = QueryClient::new(config.query.timeout());
    let lookup = LookupResolver::new(&config.lookup).context("Failed to set up map lookup")?;
    let dispatcher = Arc::new(CommandDispatcher::new(Arc::new(registry), query, lookup));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let discord_bot = DiscordBotBuilder::new(config.discord.clone(), dispatcher, shutdown_rx)
        .build()
        .await?;

    info!("Starting Discord bot...");
    let mut discord_task = tokio::spawn(discord_bot.run());

    let shutdown = tokio::select! {
        biased;
        _ = shutdown_signal() => {
            info!("Shutdown signal received - disconnecting...");
            true
        }
        _ = &mut discord_task => false,
    };

    if shutdown {
        if let Err(e) = shutdown_tx.send(true) {
            warn!("Discord task already exited: {}", e);
        }
        match tokio::time::timeout(Duration::from_secs(5), discord_task).await {
            Ok(Ok(())) => info!("Discord disconnected gracefully"),
            Ok(Err(e)) => warn!("Discord task panicked: {}", e),
            Err(_) => warn!("Discord shutdown timed out"),
        }
    }

    info!("Exiting...");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
