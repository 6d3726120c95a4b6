//! Settings storage: which channels to sit in and who counts as an admin.

use async_trait::async_trait;
use thiserror::Error;

use crate::config::SettingsConfig;

/// Channel and admin lists loaded at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BotSettings {
    pub channels: Vec<String>,
    pub admins: Vec<String>,
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings store unavailable: {0}")]
    Unavailable(String),
}

/// Source of [`BotSettings`].
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn load(&self) -> Result<BotSettings, SettingsError>;
}

/// Settings taken verbatim from the `[settings]` config section.
#[derive(Debug, Clone, Default)]
pub struct StaticSettings {
    settings: BotSettings,
}

impl StaticSettings {
    pub fn new(settings: BotSettings) -> Self {
        Self { settings }
    }
}

impl From<&SettingsConfig> for StaticSettings {
    fn from(config: &SettingsConfig) -> Self {
        Self::new(BotSettings {
            channels: config.channels.clone(),
            admins: config.admins.clone(),
        })
    }
}

#[async_trait]
impl SettingsStore for StaticSettings {
    async fn load(&self) -> Result<BotSettings, SettingsError> {
        Ok(self.settings.clone())
    }
}
