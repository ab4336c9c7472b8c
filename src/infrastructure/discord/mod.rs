//! Discord REST client and gateway connection.

mod client;
mod dto;
pub mod gateway;

pub use client::{DISCORD_API_BASE, DiscordRestClient};
pub use gateway::{
    BotPresence, DispatchEvent, GatewayClient, GatewayClientConfig, GatewayEventKind,
    GatewayIntents,
};
