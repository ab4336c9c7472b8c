//! Application configuration.

use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use super::args::CliArgs;
use super::storage::ConfigError;
use crate::application::dto::CommitOrder;
use crate::application::services::{BusyPolicy, CacheLayout, WorkerConfig};
use crate::domain::entities::{RemoteLayout, Secret, UserId};
use crate::infrastructure::discord::BotPresence;
use crate::infrastructure::ftp::FtpSettings;
use crate::infrastructure::image::PreviewSettings;

pub(super) const APP_NAME: &str = "gallery-courier";
pub(super) const APP_QUALIFIER: &str = "com";
pub(super) const APP_ORGANIZATION: &str = "linuxmobile";

/// Log level configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level.
    Trace,
    /// Debug level.
    Debug,
    /// Info level.
    #[default]
    Info,
    /// Warning level.
    Warn,
    /// Error level.
    Error,
}

impl LogLevel {
    /// Converts to tracing level.
    #[must_use]
    pub const fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Trace => write!(f, "trace"),
            Self::Debug => write!(f, "debug"),
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Application configuration: TOML file layered under CLI flags and
/// environment secrets.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Configuration file path.
    #[serde(skip)]
    pub config: Option<PathBuf>,

    /// Log file path.
    #[serde(skip)]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Plain log output to a file instead of the console.
    #[serde(default)]
    pub production: bool,

    #[serde(default)]
    pub discord: DiscordConfig,

    #[serde(default)]
    pub ftp: FtpConfig,

    /// Remote directory layout.
    #[serde(default)]
    pub remote: RemoteLayout,

    #[serde(default)]
    pub manifest: ManifestConfig,

    /// Local cache directories.
    #[serde(default)]
    pub cache: CacheLayout,

    #[serde(default)]
    pub preview: PreviewSettings,

    #[serde(default)]
    pub publish: PublishConfig,

    #[serde(default)]
    pub http: HttpConfig,
}

/// Bot identity and trigger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordConfig {
    /// Only this user's reactions publish anything.
    #[serde(default)]
    pub owner_id: Option<UserId>,

    #[serde(default = "default_trigger_emoji")]
    pub trigger_emoji: String,

    #[serde(default = "default_presence")]
    pub presence: BotPresence,

    /// Bot token, from the environment only.
    #[serde(skip)]
    pub token: Secret,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            owner_id: None,
            trigger_emoji: default_trigger_emoji(),
            presence: default_presence(),
            token: Secret::default(),
        }
    }
}

fn default_trigger_emoji() -> String {
    "📤".to_string()
}

fn default_presence() -> BotPresence {
    BotPresence::playing("Uploading images. Hopefully.")
}

/// FTP endpoint. The password never touches the file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FtpConfig {
    #[serde(default)]
    pub host: String,

    #[serde(default = "default_ftp_port")]
    pub port: u16,

    #[serde(default)]
    pub user: String,

    /// Socket timeout in seconds, unset to wait indefinitely.
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    #[serde(skip)]
    pub password: Secret,
}

impl Default for FtpConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: default_ftp_port(),
            user: String::new(),
            timeout_secs: None,
            password: Secret::default(),
        }
    }
}

const fn default_ftp_port() -> u16 {
    21
}

impl FtpConfig {
    #[must_use]
    pub fn settings(&self) -> FtpSettings {
        FtpSettings {
            host: self.host.clone(),
            port: self.port,
            user: self.user.clone(),
            password: self.password.clone(),
            timeout: self.timeout_secs.map(Duration::from_secs),
        }
    }
}

/// Public origin of the live manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestConfig {
    #[serde(default = "default_manifest_url")]
    pub url: String,
}

impl Default for ManifestConfig {
    fn default() -> Self {
        Self {
            url: default_manifest_url(),
        }
    }
}

fn default_manifest_url() -> String {
    "https://sinon.jagudev.net/database.json".to_string()
}

/// Publication scheduling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishConfig {
    #[serde(default)]
    pub busy_policy: BusyPolicy,

    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Upload the manifest after the image and preview.
    #[serde(default)]
    pub commit_manifest_last: bool,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            busy_policy: BusyPolicy::default(),
            queue_capacity: default_queue_capacity(),
            commit_manifest_last: false,
        }
    }
}

const fn default_queue_capacity() -> usize {
    8
}

impl PublishConfig {
    #[must_use]
    pub const fn worker_config(&self) -> WorkerConfig {
        WorkerConfig {
            policy: self.busy_policy,
            queue_capacity: self.queue_capacity,
        }
    }

    #[must_use]
    pub const fn commit_order(&self) -> CommitOrder {
        if self.commit_manifest_last {
            CommitOrder::ManifestLast
        } else {
            CommitOrder::ManifestFirst
        }
    }
}

/// HTTP downloads.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Whole-request timeout in seconds, unset to wait indefinitely.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl HttpConfig {
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

impl AppConfig {
    /// Merges CLI arguments and environment secrets into the configuration.
    pub fn merge_with_args(&mut self, args: CliArgs) {
        if let Some(config_path) = args.config {
            self.config = Some(config_path);
        }
        if let Some(log_path) = args.log_path {
            self.log_path = Some(log_path);
        }
        if let Some(log_level) = args.log_level {
            self.log_level = log_level;
        }
        if args.production {
            self.production = true;
        }
        if let Some(owner_id) = args.owner_id {
            self.discord.owner_id = Some(owner_id);
        }
        if let Some(emoji) = args.trigger_emoji {
            self.discord.trigger_emoji = emoji;
        }
        if let Some(token) = args.discord_token {
            self.discord.token = Secret::new(token);
        }
        if let Some(host) = args.ftp_host {
            self.ftp.host = host;
        }
        if let Some(user) = args.ftp_user {
            self.ftp.user = user;
        }
        if let Some(password) = args.ftp_password {
            self.ftp.password = Secret::new(password);
        }
    }

    /// Checks that everything needed to start is present.
    ///
    /// # Errors
    /// Returns `ConfigError::Invalid` naming the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.discord.owner_id.is_none() {
            return Err(ConfigError::invalid(
                "discord.owner_id is required (or pass --owner-id)",
            ));
        }
        if self.discord.trigger_emoji.trim().is_empty() {
            return Err(ConfigError::invalid("discord.trigger_emoji must not be empty"));
        }
        if self.discord.token.is_empty() {
            return Err(ConfigError::invalid("DISCORD_TOKEN is not set"));
        }
        if self.ftp.host.trim().is_empty() {
            return Err(ConfigError::invalid("ftp.host is required (or set FTP_HOST)"));
        }
        if self.ftp.password.is_empty() {
            return Err(ConfigError::invalid("FTP_PASSWORD is not set"));
        }
        if self.preview.png_quality_min > self.preview.png_quality_max
            || self.preview.png_quality_max > 100
        {
            return Err(ConfigError::invalid(format!(
                "preview quality range {}-{} is not within 0-100 in ascending order",
                self.preview.png_quality_min, self.preview.png_quality_max
            )));
        }
        if !(1..=100).contains(&self.preview.jpeg_quality) {
            return Err(ConfigError::invalid("preview.jpeg_quality must be within 1-100"));
        }
        Ok(())
    }

    /// Returns default configuration directory.
    #[must_use]
    pub fn default_config_dir() -> Option<PathBuf> {
        ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Returns default configuration file path.
    #[must_use]
    pub fn default_config_path() -> Option<PathBuf> {
        Self::default_config_dir().map(|dir| dir.join("config.toml"))
    }

    /// Returns default log file path.
    #[must_use]
    pub fn default_log_path() -> Option<PathBuf> {
        ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
            .map(|dirs| dirs.data_dir().join("gallery-courier.log"))
    }

    /// Returns effective log path.
    #[must_use]
    pub fn effective_log_path(&self) -> Option<PathBuf> {
        self.log_path.clone().or_else(Self::default_log_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn valid() -> AppConfig {
        let mut config = AppConfig::default();
        config.discord.owner_id = Some(UserId(548_558_443_624_005_632));
        config.discord.token = Secret::new("token");
        config.ftp.host = "ftp.example.net".to_string();
        config.ftp.password = Secret::new("hunter2");
        config
    }

    #[test]
    fn test_parse_sections() {
        let toml_content = r#"
            log_level = "debug"
            production = true

            [discord]
            owner_id = 548558443624005632

            [discord.presence]
            status = "idle"

            [ftp]
            host = "ftp.example.net"
            user = "sinon"

            [remote]
            site_dir = "www"

            [preview]
            jpeg_quality = 80

            [publish]
            busy_policy = "reject"
            commit_manifest_last = true
        "#;

        let config: AppConfig = toml::from_str(toml_content).unwrap();
        assert_eq!(config.log_level, LogLevel::Debug);
        assert!(config.production);
        assert_eq!(config.discord.owner_id, Some(UserId(548_558_443_624_005_632)));
        assert_eq!(config.discord.trigger_emoji, "📤");
        assert!(config.discord.presence.activity.is_none());
        assert_eq!(config.ftp.port, 21);
        assert_eq!(config.remote.site_dir, "www");
        assert_eq!(config.remote.manifest_name, "database.json");
        assert_eq!(config.preview.jpeg_quality, 80);
        assert_eq!(config.preview.png_quality_max, 72);
        assert_eq!(config.publish.worker_config().policy, BusyPolicy::Reject);
        assert_eq!(config.publish.commit_order(), CommitOrder::ManifestLast);
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.log_level, LogLevel::Info);
        assert!(!config.production);
        assert_eq!(config.manifest.url, "https://sinon.jagudev.net/database.json");
        assert_eq!(config.cache, CacheLayout::default());
        assert_eq!(config.publish.commit_order(), CommitOrder::ManifestFirst);
        assert_eq!(config.publish.queue_capacity, 8);
        assert!(config.http.timeout().is_none());
        assert_eq!(
            config
                .discord
                .presence
                .activity
                .as_ref()
                .map(|a| a.name.as_str()),
            Some("Uploading images. Hopefully.")
        );
    }

    #[test]
    fn test_secrets_are_not_serialized() {
        let config = valid();
        let text = toml::to_string(&config).unwrap();
        assert!(!text.contains("hunter2"));
        assert!(!text.contains("token"));
    }

    #[test]
    fn test_merge_with_args() {
        let args = CliArgs::try_parse_from([
            "gallery-courier",
            "--owner-id",
            "42",
            "--trigger-emoji",
            "🚀",
            "--production",
            "--log-level",
            "warn",
        ])
        .unwrap();
        let mut config = AppConfig::default();

        config.merge_with_args(args);

        assert_eq!(config.discord.owner_id, Some(UserId(42)));
        assert_eq!(config.discord.trigger_emoji, "🚀");
        assert!(config.production);
        assert_eq!(config.log_level, LogLevel::Warn);
    }

    #[test]
    fn test_validate() {
        assert!(valid().validate().is_ok());

        let mut missing_owner = valid();
        missing_owner.discord.owner_id = None;
        assert!(missing_owner.validate().unwrap_err().to_string().contains("owner_id"));

        let mut missing_password = valid();
        missing_password.ftp.password = Secret::default();
        assert!(missing_password.validate().is_err());

        let mut inverted = valid();
        inverted.preview.png_quality_min = 90;
        assert!(inverted.validate().unwrap_err().to_string().contains("90-72"));
    }
}
