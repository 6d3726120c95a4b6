//! Turns inbound protocol messages into typed events.

use cabal_proto::{ChannelExt, Command, Ctcp, CtcpKind, Message, Prefix, irc_eq};

use crate::channels::ChannelSet;

/// Who sent a message, split out of `nick!user@host`.
///
/// Extraction is total: anything missing is an empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceIdentity {
    pub nick: String,
    pub user: String,
    /// Hostname or cloak.
    pub host: String,
}

impl SourceIdentity {
    pub fn from_mask(mask: &str) -> Self {
        Self::from_prefix(Some(&Prefix::new_from_str(mask)))
    }

    pub fn from_prefix(prefix: Option<&Prefix>) -> Self {
        match prefix {
            Some(Prefix::Nickname(nick, user, host)) => Self {
                nick: nick.clone(),
                user: user.clone(),
                host: host.clone(),
            },
            Some(Prefix::ServerName(_)) | None => Self::default(),
        }
    }

    /// `nick!user@host`
    pub fn mask(&self) -> String {
        format!("{}!{}@{}", self.nick, self.user, self.host)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// CTCP request other than ACTION (VERSION, PING, ...).
    ControlQuery,
    /// CTCP ACTION (`/me`).
    ActionNotice,
    ChannelMessage,
    DirectMessage,
}

/// One inbound `PRIVMSG` worth reacting to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEvent {
    pub kind: EventKind,
    pub source: SourceIdentity,
    /// Channel name, or our own nick for direct messages.
    pub target: String,
    /// Message body exactly as received, CTCP delimiters included.
    pub payload: String,
}

impl InboundEvent {
    /// The CTCP request carried by a control query or action.
    pub fn ctcp(&self) -> Option<Ctcp<'_>> {
        match self.kind {
            EventKind::ControlQuery | EventKind::ActionNotice => Ctcp::parse(&self.payload),
            _ => None,
        }
    }

    /// Where replies go: the channel, or the sender for private traffic.
    pub fn reply_target(&self) -> &str {
        if self.target.is_channel_name() {
            &self.target
        } else {
            &self.source.nick
        }
    }

    pub fn is_private(&self) -> bool {
        !self.target.is_channel_name()
    }
}

/// Classifies messages relative to the bot's current nick and channels.
#[derive(Debug, Clone, Copy)]
pub struct EventClassifier<'a> {
    nickname: &'a str,
    channels: &'a ChannelSet,
}

impl<'a> EventClassifier<'a> {
    pub fn new(nickname: &'a str, channels: &'a ChannelSet) -> Self {
        Self { nickname, channels }
    }

    /// `None` for anything that is not a `PRIVMSG` to us or to one of our
    /// channels.
    pub fn classify(&self, message: &Message) -> Option<InboundEvent> {
        let Command::PRIVMSG(target, text) = &message.command else {
            return None;
        };

        let private = irc_eq(target, self.nickname);
        if !private && !(target.is_channel_name() && self.channels.contains(target)) {
            return None;
        }

        let kind = match Ctcp::parse(text) {
            Some(Ctcp {
                kind: CtcpKind::Action,
                ..
            }) => EventKind::ActionNotice,
            Some(_) => EventKind::ControlQuery,
            None if private => EventKind::DirectMessage,
            None => EventKind::ChannelMessage,
        };

        Some(InboundEvent {
            kind,
            source: SourceIdentity::from_prefix(message.prefix.as_ref()),
            target: target.clone(),
            payload: text.clone(),
        })
    }
}
