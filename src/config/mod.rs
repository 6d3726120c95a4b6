//! Configuration loading and management.
//!
//! - [`types`]: the TOML schema (`Config` and its sections)
//! - [`defaults`]: serde default functions
//! - [`validation`]: startup checks that the schema alone cannot express

mod defaults;
mod types;
mod validation;

pub use types::{
    AdminConfig, BotConfig, CentralAuthConfig, Config, ConfigError, JournalConfig,
    KeepaliveConfig, ReconnectConfig, ServerConfig, SettingsConfig, WatcherConfig,
};
pub use validation::{ValidationError, validate};
