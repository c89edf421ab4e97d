//! Discord bot client abstraction.
//!
//! Provides a high-level interface for creating and running the Discord bot,
//! hiding serenity implementation details from the rest of the application.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use backon::BackoffBuilder;
use serenity::async_trait;
use serenity::http::HttpBuilder;
use serenity::model::application::Interaction;
use serenity::model::gateway::Ready;
use serenity::prelude::*;
use serenity::Client;
use tokio::sync::{mpsc, watch};
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::config::types::DiscordConfig;
use crate::discord::commands::CommandDispatcher;
use crate::discord::handler::CommandHandler;

const MAX_RECONNECT_DELAY: Duration = Duration::from_secs(300);

#[derive(Debug, Clone)]
pub enum DiscordBotEvent {
    /// Bot connected and ready.
    Ready { context: Context, ready: Ready },
    /// Slash command or other interaction received.
    Interaction {
        context: Context,
        interaction: Interaction,
    },
}

struct DiscordBotEvents {
    discord_events_tx: mpsc::UnboundedSender<DiscordBotEvent>,
}

impl DiscordBotEvents {
    fn new(discord_events_tx: mpsc::UnboundedSender<DiscordBotEvent>) -> Self {
        Self { discord_events_tx }
    }
}

#[async_trait]
impl EventHandler for DiscordBotEvents {
    async fn ready(&self, context: Context, ready: Ready) {
        if let Err(error) = self
            .discord_events_tx
            .send(DiscordBotEvent::Ready { context, ready })
        {
            warn!("Failed to process discord event: {}", error);
        }
    }

    async fn interaction_create(&self, context: Context, interaction: Interaction) {
        if let Err(error) = self.discord_events_tx.send(DiscordBotEvent::Interaction {
            context,
            interaction,
        }) {
            warn!("Failed to process discord event: {}", error);
        }
    }
}

/// Builder for creating the Discord bot.
pub struct DiscordBotBuilder {
    config: DiscordConfig,
    dispatcher: Arc<CommandDispatcher>,
    shutdown_rx: watch::Receiver<bool>,
}

impl DiscordBotBuilder {
    /// Create a new Discord bot builder.
    pub fn new(
        config: DiscordConfig,
        dispatcher: Arc<CommandDispatcher>,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Self {
        Self {
            config,
            dispatcher,
            shutdown_rx,
        }
    }

    /// Build the Discord bot.
    pub async fn build(self) -> anyhow::Result<DiscordBot> {
        let (discord_events_tx, discord_events_rx) = mpsc::unbounded_channel::<DiscordBotEvent>();

        let client = build_client(&self.config.token, discord_events_tx.clone()).await?;
        let handler = CommandHandler::new(self.dispatcher, self.config.guild_id);

        match self.config.guild_id {
            Some(guild_id) => info!("Slash commands will be registered on guild {}", guild_id),
            None => info!("Slash commands will be registered globally"),
        }

        Ok(DiscordBot {
            client: Some(client),
            token: self.config.token,
            handler,
            discord_events_rx,
            discord_events_tx,
            shutdown_rx: self.shutdown_rx,
        })
    }
}

async fn build_client(
    token: &str,
    discord_events_tx: mpsc::UnboundedSender<DiscordBotEvent>,
) -> anyhow::Result<Client> {
    // Slash commands arrive as interactions; no message content is needed.
    let intents = GatewayIntents::GUILDS;

    let reqwest_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(15))
        .connect_timeout(Duration::from_secs(10))
        .build()
        .context("Failed to build Discord HTTP client")?;

    let http = HttpBuilder::new(token).client(reqwest_client).build();

    let events = DiscordBotEvents::new(discord_events_tx);
    let client = serenity::client::ClientBuilder::new_with_http(http, intents)
        .event_handler(events)
        .await
        .context("Failed to create Discord client")?;
    Ok(client)
}

pub struct DiscordBot {
    client: Option<Client>,
    token: String,
    handler: CommandHandler,
    discord_events_rx: mpsc::UnboundedReceiver<DiscordBotEvent>,
    discord_events_tx: mpsc::UnboundedSender<DiscordBotEvent>,
    shutdown_rx: watch::Receiver<bool>,
}

impl DiscordBot {
    pub async fn run(mut self) {
        // Extract shard manager before we move client into run_connection
        let shard_manager = self.client.as_ref().map(|c| c.shard_manager.clone());
        let client = &mut self.client;
        let discord_events_rx = &mut self.discord_events_rx;
        let handler = &self.handler;
        let shutdown_rx = &mut self.shutdown_rx;

        // Only this branch watches for shutdown; the gateway is closed after
        // the select so no other branch can cancel it.
        let shutdown_requested = tokio::select! {
            _ = Self::run_connection(client, &self.token, &self.discord_events_tx) => false,
            _ = Self::process_events(discord_events_rx, handler) => false,
            _ = wait_for_shutdown(shutdown_rx) => true,
        };

        if shutdown_requested {
            if let Some(manager) = shard_manager {
                info!("Initiating graceful Discord shutdown...");
                manager.shutdown_all().await;
                info!("Discord shutdown complete");
            }
        }
        info!("Discord task ended");
    }

    async fn run_connection(
        client: &mut Option<Client>,
        token: &str,
        discord_events_tx: &mpsc::UnboundedSender<DiscordBotEvent>,
    ) {
        /// 5s initial, 5min max, factor 1.1, with jitter, unlimited retries.
        fn discord_backoff() -> impl Iterator<Item = Duration> {
            backon::ExponentialBuilder::default()
                .with_min_delay(Duration::from_secs(5))
                .with_max_delay(MAX_RECONNECT_DELAY)
                .with_factor(1.1)
                .with_jitter()
                .without_max_times()
                .build()
        }

        let mut backoff = discord_backoff();

        loop {
            info!("Connecting to Discord...");

            let mut client = match client.take() {
                Some(client) => client,
                None => match build_client(token, discord_events_tx.clone()).await {
                    Ok(client) => {
                        backoff = discord_backoff();
                        client
                    }
                    Err(e) => {
                        error!("Failed to rebuild Discord client: {:#}", e);
                        let delay = backoff.next().unwrap_or(MAX_RECONNECT_DELAY);
                        warn!("Retrying in {:.1}s...", delay.as_secs_f64());
                        sleep(delay).await;
                        continue;
                    }
                },
            };

            match client.start().await {
                Ok(()) => {
                    info!("Discord client disconnected normally");
                    break;
                }
                Err(e) => {
                    error!("Discord client error: {}", e);
                    let delay = backoff.next().unwrap_or(MAX_RECONNECT_DELAY);
                    warn!(
                        "Discord disconnected. Reconnecting in {:.1}s...",
                        delay.as_secs_f64(),
                    );
                    sleep(delay).await;
                }
            }
        }
    }

    async fn process_events(
        discord_events_rx: &mut mpsc::UnboundedReceiver<DiscordBotEvent>,
        handler: &CommandHandler,
    ) {
        while let Some(event) = discord_events_rx.recv().await {
            match event {
                DiscordBotEvent::Ready { context, ready } => {
                    handler.handle_ready(&context, &ready).await;
                }
                DiscordBotEvent::Interaction {
                    context,
                    interaction,
                } => {
                    // Commands may wait on the network; never block the event loop.
                    let handler = handler.clone();
                    tokio::spawn(async move {
                        handler.handle_interaction(&context, interaction).await;
                    });
                }
            }
        }
        debug!("Discord events channel closed.");
    }
}

/// Resolve once shutdown is requested or the sender is gone.
async fn wait_for_shutdown(shutdown_rx: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown_rx.borrow_and_update() {
            info!("Shutdown signal received");
            return;
        }
        if shutdown_rx.changed().await.is_err() {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_wait_for_shutdown_ignores_false_and_returns_on_true() {
        let (tx, mut rx) = watch::channel(false);
        let waiter = tokio::spawn(async move { wait_for_shutdown(&mut rx).await });

        tx.send(false).unwrap();
        sleep(Duration::from_millis(50)).await;
        assert!(!waiter.is_finished());

        tx.send(true).unwrap();
        tokio_test::assert_ok!(timeout(Duration::from_secs(1), waiter).await).unwrap();
    }

    #[tokio::test]
    async fn test_wait_for_shutdown_when_already_requested_or_sender_dropped() {
        let (tx, mut rx) = watch::channel(true);
        tokio_test::assert_ok!(timeout(Duration::from_secs(1), wait_for_shutdown(&mut rx)).await);
        drop(tx);

        let (tx, mut rx) = watch::channel(false);
        drop(tx);
        tokio_test::assert_ok!(timeout(Duration::from_secs(1), wait_for_shutdown(&mut rx)).await);
    }
}
