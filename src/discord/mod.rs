//! Discord bot integration.
//!
//! Slash commands are parsed and executed by [`commands`], answered by
//! [`handler`], and delivered over the gateway connection kept by [`client`].

pub mod client;
pub mod commands;
pub mod handler;

pub use client::DiscordBotBuilder;
pub use commands::CommandDispatcher;
