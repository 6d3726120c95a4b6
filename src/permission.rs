//! Permission predicates. Each is evaluated fresh on every call; callers
//! compose them.

use crate::channels::ChannelRoster;
use crate::classify::SourceIdentity;
use crate::identity::BotIdentity;

/// Permission checks against the bot identity and a channel roster.
#[derive(Debug, Clone, Copy)]
pub struct PermissionGuard<'a> {
    identity: &'a BotIdentity,
    roster: &'a ChannelRoster,
}

impl<'a> PermissionGuard<'a> {
    pub fn new(identity: &'a BotIdentity, roster: &'a ChannelRoster) -> Self {
        Self { identity, roster }
    }

    pub fn is_owner(&self, source: &SourceIdentity) -> bool {
        self.identity.is_owner(&source.nick)
    }

    pub fn is_admin(&self, source: &SourceIdentity) -> bool {
        self.identity.is_admin(&source.nick)
    }

    /// Channel operator in `channel`, or a bot admin.
    pub fn is_channel_admin(&self, source: &SourceIdentity, channel: &str) -> bool {
        self.roster.is_operator(channel, &source.nick) || self.is_admin(source)
    }

    /// Allowed to drive the bot by private message.
    pub fn is_privileged(&self, source: &SourceIdentity) -> bool {
        self.is_owner(source) || self.is_admin(source)
    }
}
