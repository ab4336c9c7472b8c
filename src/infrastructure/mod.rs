//! Infrastructure layer with external service adapters.

/// Application configuration.
pub mod config;
/// Discord REST client and gateway.
pub mod discord;
/// FTP transfer sessions.
pub mod ftp;
/// HTTP downloads.
pub mod http;
/// Preview encoding.
pub mod image;

pub use config::{AppConfig, CliArgs, ConfigError, ConfigStore, LogLevel};
pub use discord::{BotPresence, DiscordRestClient, GatewayClient, GatewayClientConfig};
pub use ftp::{FtpSettings, FtpTransferSession};
pub use http::HttpFetcher;
pub use image::{CodecPreviewGenerator, PreviewSettings};
