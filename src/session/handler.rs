//! The seam between a session and the logic reacting to its traffic.

use async_trait::async_trait;
use cabal_proto::Message;

use super::outbox::Outbox;
use crate::channels::{ChannelRoster, ChannelSet};
use crate::classify::EventClassifier;

/// Read-only view of a live session handed to handlers.
#[derive(Debug, Clone, Copy)]
pub struct Link<'a> {
    pub outbox: &'a Outbox,
    pub channels: &'a ChannelSet,
    pub roster: &'a ChannelRoster,
    /// Nick the server currently knows us by.
    pub nickname: &'a str,
}

impl<'a> Link<'a> {
    pub fn classifier(&self) -> EventClassifier<'a> {
        EventClassifier::new(self.nickname, self.channels)
    }
}

/// Reacts to inbound traffic on a connected session.
///
/// Called once per message, after the session has done its own bookkeeping
/// (PONG, roster updates). The next message is not read until the call
/// returns.
#[async_trait]
pub trait EventHandler: Send + 'static {
    /// Registration finished and the channel joins were sent.
    async fn on_connected(&mut self, _link: &Link<'_>) {}

    async fn on_message(&mut self, link: &Link<'_>, message: &Message);
}
