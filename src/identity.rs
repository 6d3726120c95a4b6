//! Who the bot is and who it answers to.

use std::collections::HashSet;
use zeroize::Zeroizing;

use crate::config::Config;
use crate::settings::BotSettings;

pub const BOT_NAME: &str = "CabalBot";
pub const BOT_VERSION: &str = "v3.0";
pub const BOT_AUTHOR: &str = "Operator873";

/// Immutable bot identity, built once at startup and shared via `Arc`.
#[derive(Debug)]
pub struct BotIdentity {
    pub nickname: String,
    pub account: String,
    credential: Zeroizing<String>,
    pub owner: String,
    admins: HashSet<String>,
    pub command_char: char,
    pub home_channel: String,
}

impl BotIdentity {
    pub fn new(config: &Config, settings: &BotSettings) -> Self {
        Self {
            nickname: config.bot.botname.clone(),
            account: config.bot.botaccount.clone(),
            credential: Zeroizing::new(config.bot.botpassword.clone()),
            owner: config.admin.owner.clone(),
            admins: settings.admins.iter().cloned().collect(),
            command_char: config.bot.command_char(),
            home_channel: config.bot.botchannel.clone(),
        }
    }

    /// Services password for SASL.
    pub fn credential(&self) -> &str {
        &self.credential
    }

    /// Exact match against the configured owner.
    pub fn is_owner(&self, nick: &str) -> bool {
        self.owner == nick
    }

    /// Membership in the admin set.
    pub fn is_admin(&self, nick: &str) -> bool {
        self.admins.contains(nick)
    }

    /// Reply body for CTCP VERSION.
    pub fn version_reply(&self) -> String {
        format!(
            "{BOT_NAME} {BOT_VERSION} by {BOT_AUTHOR} // Owner: {} @ {}",
            self.owner, self.home_channel
        )
    }
}
