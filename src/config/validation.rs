//! Configuration validation.
//!
//! Validates configuration at startup to catch common errors early.

use super::Config;
use cabal_proto::ChannelExt;
use thiserror::Error;

/// Validation errors for configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("admin.owner is required")]
    MissingOwner,
    #[error("bot.botname is required")]
    MissingBotName,
    #[error("bot.botcmdchar must be exactly one character, got {0:?}")]
    InvalidCommandChar(String),
    #[error("bot.botchannel is not a channel name: {0:?}")]
    InvalidHomeChannel(String),
    #[error("server.url is required")]
    MissingServerUrl,
    #[error("server.port must be non-zero")]
    InvalidPort,
    #[error("keepalive.interval_secs must be non-zero")]
    InvalidKeepaliveInterval,
    #[error("settings.channels contains a non-channel: {0:?}")]
    InvalidChannel(String),
    #[error("watcher.nickname is required")]
    MissingWatcherNick,
    #[error("watcher.account and watcher.password must be set together")]
    PartialWatcherCredentials,
}

/// Validate a configuration, returning all errors found.
pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.admin.owner.trim().is_empty() {
        errors.push(ValidationError::MissingOwner);
    }
    if config.bot.botname.trim().is_empty() {
        errors.push(ValidationError::MissingBotName);
    }

    let mut prefix = config.bot.botcmdchar.chars();
    match (prefix.next(), prefix.next()) {
        (Some(c), None) if !c.is_whitespace() => {}
        _ => errors.push(ValidationError::InvalidCommandChar(
            config.bot.botcmdchar.clone(),
        )),
    }

    if !config.bot.botchannel.is_channel_name() {
        errors.push(ValidationError::InvalidHomeChannel(
            config.bot.botchannel.clone(),
        ));
    }

    if config.server.url.trim().is_empty() {
        errors.push(ValidationError::MissingServerUrl);
    }
    if config.server.port == 0 {
        errors.push(ValidationError::InvalidPort);
    }
    if config.keepalive.interval_secs == 0 {
        errors.push(ValidationError::InvalidKeepaliveInterval);
    }

    for channel in &config.settings.channels {
        if !channel.is_channel_name() {
            errors.push(ValidationError::InvalidChannel(channel.clone()));
        }
    }

    if let Some(ref watcher) = config.watcher {
        if watcher.nickname.trim().is_empty() {
            errors.push(ValidationError::MissingWatcherNick);
        }
        if watcher.account.is_some() != watcher.password.is_some() {
            errors.push(ValidationError::PartialWatcherCredentials);
        }
        if let Some(ref channel) = watcher.channel
            && !channel.is_channel_name()
        {
            errors.push(ValidationError::InvalidChannel(channel.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
