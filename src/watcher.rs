//! Passive watcher session: relays a change feed into a channel.
//!
//! The watcher never dispatches commands. It answers CTCP VERSION and PING
//! like the command bot and otherwise only speaks when the feed produces a
//! line.

use async_trait::async_trait;
use cabal_proto::Message;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::bot::answer_ctcp;
use crate::classify::EventKind;
use crate::identity::BotIdentity;
use crate::journal::Journal;
use crate::responder::Responder;
use crate::session::{EventHandler, Link, Outbox, OutboxError};

/// Lines to relay, produced elsewhere.
pub type ChangeFeed = mpsc::Receiver<String>;

pub struct Watcher {
    identity: Arc<BotIdentity>,
    journal: Journal,
    channel: String,
    feed: Option<ChangeFeed>,
    relay: Option<JoinHandle<()>>,
}

impl Watcher {
    pub fn new(
        identity: Arc<BotIdentity>,
        journal: Journal,
        channel: impl Into<String>,
        feed: Option<ChangeFeed>,
    ) -> Self {
        Self {
            identity,
            journal,
            channel: channel.into(),
            feed,
            relay: None,
        }
    }
}

impl Drop for Watcher {
    fn drop(&mut self) {
        if let Some(relay) = self.relay.take() {
            relay.abort();
        }
    }
}

async fn relay(mut feed: ChangeFeed, outbox: Outbox, channel: String) {
    while let Some(line) = feed.recv().await {
        match outbox.privmsg(&channel, &line) {
            Ok(()) => {}
            Err(OutboxError::MessageTooLong { actual, limit }) => {
                warn!(actual, limit, "feed line too long, skipped");
            }
            Err(OutboxError::Closed) => break,
        }
    }
    debug!(channel = %channel, "feed relay stopped");
}

#[async_trait]
impl EventHandler for Watcher {
    async fn on_connected(&mut self, link: &Link<'_>) {
        info!(nick = %link.nickname, channel = %self.channel, "watcher ready");
        if let Some(feed) = self.feed.take() {
            let outbox = link.outbox.clone();
            self.relay = Some(tokio::spawn(relay(feed, outbox, self.channel.clone())));
        }
    }

    async fn on_message(&mut self, link: &Link<'_>, message: &Message) {
        let Some(event) = link.classifier().classify(message) else {
            return;
        };
        if event.kind == EventKind::ControlQuery {
            let responder = Responder::new(link.outbox, &self.identity, &self.journal);
            answer_ctcp(&responder, &self.identity, &event);
        }
    }
}
