//! Discord interaction handling.
//!
//! Registers the slash commands once the gateway is ready and turns each
//! incoming command interaction into exactly one reply.

use std::sync::Arc;

use serenity::builder::{
    CreateCommand, CreateCommandOption, CreateInteractionResponse,
    CreateInteractionResponseMessage, EditInteractionResponse,
};
use serenity::model::application::{Command, CommandInteraction, CommandOptionType, Interaction};
use serenity::model::gateway::Ready;
use serenity::model::id::GuildId;
use serenity::prelude::*;
use tracing::{debug, error, info, warn};

use crate::common::text::{truncate_chars, DISCORD_MESSAGE_LIMIT};
use crate::discord::commands::{BotCommand, CommandDispatcher};

/// Handles gateway events forwarded by the bot client.
#[derive(Clone)]
pub struct CommandHandler {
    dispatcher: Arc<CommandDispatcher>,
    guild_id: Option<GuildId>,
}

impl CommandHandler {
    pub fn new(dispatcher: Arc<CommandDispatcher>, guild_id: Option<u64>) -> Self {
        Self {
            dispatcher,
            guild_id: guild_id.map(GuildId::new),
        }
    }

    /// Register slash commands, on the configured guild or globally.
    pub async fn handle_ready(&self, context: &Context, ready: &Ready) {
        info!("Discord bot connected as {}", ready.user.name);

        let commands = slash_commands();
        let count = commands.len();
        let result = match self.guild_id {
            Some(guild_id) => guild_id.set_commands(&context.http, commands).await,
            None => Command::set_global_commands(&context.http, commands).await,
        };

        match result {
            Ok(_) => match self.guild_id {
                Some(guild_id) => info!("Registered {} commands on guild {}", count, guild_id),
                None => info!("Registered {} global commands", count),
            },
            Err(e) => error!("Failed to register slash commands: {}", e),
        }
    }

    /// Answer one interaction. Non-command interactions are ignored.
    pub async fn handle_interaction(&self, context: &Context, interaction: Interaction) {
        let Interaction::Command(command) = interaction else {
            return;
        };

        info!(
            "/{} from {} ({:?})",
            command.data.name, command.user.name, command.guild_id
        );

        let parsed = BotCommand::parse(&command.data.name, |key| {
            option_value(&command, key).map(str::to_string)
        });

        let bot_command = match parsed {
            Ok(bot_command) => bot_command,
            Err(message) => {
                warn!("Rejected /{}: {}", command.data.name, message);
                self.respond(context, &command, format!("❌ {}", message)).await;
                return;
            }
        };

        if bot_command.needs_defer() {
            if let Err(e) = command.defer(&context.http).await {
                error!("Failed to defer /{}: {}", bot_command.name(), e);
                return;
            }
            let reply = self.dispatcher.dispatch(bot_command).await;
            let reply = truncate_chars(&reply, DISCORD_MESSAGE_LIMIT);
            if let Err(e) = command
                .edit_response(&context.http, EditInteractionResponse::new().content(reply))
                .await
            {
                error!("Failed to edit deferred response: {}", e);
            }
        } else {
            let reply = self.dispatcher.dispatch(bot_command).await;
            self.respond(context, &command, reply).await;
        }
    }

    async fn respond(&self, context: &Context, command: &CommandInteraction, reply: String) {
        let reply = truncate_chars(&reply, DISCORD_MESSAGE_LIMIT);
        debug!("Replying to /{}: {}", command.data.name, reply);

        let message = CreateInteractionResponseMessage::new().content(reply);
        if let Err(e) = command
            .create_response(&context.http, CreateInteractionResponse::Message(message))
            .await
        {
            error!("Failed to respond to /{}: {}", command.data.name, e);
        }
    }
}

fn option_value<'a>(command: &'a CommandInteraction, name: &str) -> Option<&'a str> {
    command
        .data
        .options
        .iter()
        .find(|option| option.name == name)
        .and_then(|option| option.value.as_str())
}

fn name_option() -> CreateCommandOption {
    CreateCommandOption::new(CommandOptionType::String, "name", "Linked server name")
        .required(true)
}

/// Slash command definitions.
pub fn slash_commands() -> Vec<CreateCommand> {
    vec![
        CreateCommand::new("link")
            .description("Link a server address to a name")
            .add_option(name_option())
            .add_option(
                CreateCommandOption::new(
                    CommandOptionType::String,
                    "address",
                    "Server address as host:port",
                )
                .required(true),
            ),
        CreateCommand::new("pop")
            .description("Show current population of a linked server")
            .add_option(name_option()),
        CreateCommand::new("wipe")
            .description("Wipe times (not available for Rust servers)")
            .add_option(name_option()),
        CreateCommand::new("map")
            .description("Show the map link of a linked server")
            .add_option(name_option()),
        CreateCommand::new("list").description("List linked servers"),
    ]
}
