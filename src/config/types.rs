//! Core configuration types and loading.

use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::defaults::*;
use super::validation::{ValidationError, validate};

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {}", join_errors(.0))]
    Invalid(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Bot configuration, one TOML file.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Who owns this bot.
    pub admin: AdminConfig,
    /// Identity of the command bot.
    pub bot: BotConfig,
    /// Where to connect.
    pub server: ServerConfig,
    /// Keepalive probing.
    #[serde(default)]
    pub keepalive: KeepaliveConfig,
    /// Reconnect backoff.
    #[serde(default)]
    pub reconnect: ReconnectConfig,
    /// Journal file.
    #[serde(default)]
    pub journal: JournalConfig,
    /// Static channel and admin lists.
    #[serde(default)]
    pub settings: SettingsConfig,
    /// Optional passive watcher session.
    pub watcher: Option<WatcherConfig>,
    /// Central Auth lookups used by the `ca` command.
    #[serde(default)]
    pub centralauth: CentralAuthConfig,
}

impl Config {
    /// Load and validate configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        validate(&config).map_err(ConfigError::Invalid)?;
        Ok(config)
    }
}

/// `[admin]`
#[derive(Debug, Clone, Deserialize)]
pub struct AdminConfig {
    /// Nickname of the bot owner.
    pub owner: String,
}

/// `[bot]`
#[derive(Clone, Deserialize)]
pub struct BotConfig {
    pub botname: String,
    pub botaccount: String,
    pub botpassword: String,
    /// Command prefix; must be exactly one character.
    pub botcmdchar: String,
    /// Home channel. Always joined, never left.
    pub botchannel: String,
}

impl BotConfig {
    /// The command prefix as a `char`. Validation guarantees it exists.
    pub fn command_char(&self) -> char {
        self.botcmdchar.chars().next().unwrap_or('!')
    }
}

impl fmt::Debug for BotConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BotConfig")
            .field("botname", &self.botname)
            .field("botaccount", &self.botaccount)
            .field("botpassword", &"<redacted>")
            .field("botcmdchar", &self.botcmdchar)
            .field("botchannel", &self.botchannel)
            .finish()
    }
}

/// `[server]`
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Hostname of the IRC server.
    pub url: String,
    pub port: u16,
    /// Wrap the connection in TLS (default: true).
    #[serde(default = "default_true")]
    pub tls: bool,
    /// Seconds allowed for the TCP and TLS handshakes.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Seconds allowed between connecting and `RPL_WELCOME`.
    #[serde(default = "default_registration_timeout")]
    pub registration_timeout_secs: u64,
}

/// `[keepalive]`
#[derive(Debug, Clone, Deserialize)]
pub struct KeepaliveConfig {
    /// Seconds between keepalive probes.
    #[serde(default = "default_keepalive_interval")]
    pub interval_secs: u64,
    /// Unanswered probes before the link is declared dead. Also the
    /// reconnect budget.
    #[serde(default = "default_max_missed")]
    pub max_missed: u32,
}

impl Default for KeepaliveConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_keepalive_interval(),
            max_missed: default_max_missed(),
        }
    }
}

/// `[reconnect]`
#[derive(Debug, Clone, Deserialize)]
pub struct ReconnectConfig {
    #[serde(default = "default_reconnect_delay")]
    pub delay_secs: u64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            delay_secs: default_reconnect_delay(),
        }
    }
}

/// `[journal]`
#[derive(Debug, Clone, Deserialize)]
pub struct JournalConfig {
    #[serde(default = "default_journal_path")]
    pub path: PathBuf,
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            path: default_journal_path(),
        }
    }
}

/// `[settings]` - the static settings store.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SettingsConfig {
    /// Channels to join besides the home channel.
    #[serde(default)]
    pub channels: Vec<String>,
    /// Nicknames allowed to use privileged commands.
    #[serde(default)]
    pub admins: Vec<String>,
}

/// `[watcher]`
#[derive(Clone, Deserialize)]
pub struct WatcherConfig {
    pub nickname: String,
    /// Services account; SASL is skipped when absent.
    pub account: Option<String>,
    pub password: Option<String>,
    /// Channel the feed is relayed to (default: the bot's home channel).
    pub channel: Option<String>,
}

impl fmt::Debug for WatcherConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatcherConfig")
            .field("nickname", &self.nickname)
            .field("account", &self.account)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("channel", &self.channel)
            .finish()
    }
}

/// `[centralauth]`
#[derive(Debug, Clone, Deserialize)]
pub struct CentralAuthConfig {
    /// MediaWiki `api.php` endpoint.
    #[serde(default = "default_centralauth_url")]
    pub api_url: String,
    #[serde(default = "default_lookup_timeout")]
    pub timeout_secs: u64,
}

impl Default for CentralAuthConfig {
    fn default() -> Self {
        Self {
            api_url: default_centralauth_url(),
            timeout_secs: default_lookup_timeout(),
        }
    }
}
