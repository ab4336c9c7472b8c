use super::app_config::LogLevel;
use crate::domain::entities::UserId;
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "gallery-courier",
    version,
    about = "Publishes images the owner reacts to onto an FTP-hosted gallery",
    long_about = None
)]
pub struct CliArgs {
    /// Configuration file path.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log file path, used with --production.
    #[arg(long, value_name = "PATH")]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Write plain logs to the log file instead of the console.
    #[arg(long)]
    pub production: bool,

    /// Discord user whose reactions trigger publications.
    #[arg(long, value_name = "ID")]
    pub owner_id: Option<UserId>,

    /// Reaction emoji that triggers a publication.
    #[arg(long, value_name = "EMOJI")]
    pub trigger_emoji: Option<String>,

    /// Discord bot token.
    #[arg(long, env = "DISCORD_TOKEN", hide_env_values = true)]
    pub discord_token: Option<String>,

    /// FTP server host.
    #[arg(long, env = "FTP_HOST")]
    pub ftp_host: Option<String>,

    /// FTP login user.
    #[arg(long, env = "FTP_USER")]
    pub ftp_user: Option<String>,

    /// FTP login password.
    #[arg(long, env = "FTP_PASSWORD", hide_env_values = true)]
    pub ftp_password: Option<String>,
}
