//! The command bot: journals traffic, answers CTCP, dispatches commands.

use async_trait::async_trait;
use cabal_proto::{Ctcp, CtcpKind, Message};
use std::sync::Arc;
use tracing::{debug, info};

use crate::classify::{EventKind, InboundEvent};
use crate::dispatch::CommandDispatcher;
use crate::identity::BotIdentity;
use crate::journal::{Category, Journal};
use crate::responder::Responder;
use crate::session::{EventHandler, Link};

pub struct CabalBot {
    identity: Arc<BotIdentity>,
    journal: Journal,
    dispatcher: CommandDispatcher,
}

impl CabalBot {
    pub fn new(identity: Arc<BotIdentity>, journal: Journal, dispatcher: CommandDispatcher) -> Self {
        Self {
            identity,
            journal,
            dispatcher,
        }
    }

    /// Handle one classified event.
    pub async fn handle_event(&self, link: &Link<'_>, event: &InboundEvent) {
        match event.kind {
            EventKind::ActionNotice => {
                let text = event.ctcp().and_then(|c| c.params).unwrap_or_default();
                self.journal.record(
                    Category::Action,
                    format_args!("{}: {} ==> {}", event.target, event.source.nick, text),
                );
            }
            EventKind::ControlQuery => {
                let responder = Responder::new(link.outbox, &self.identity, &self.journal);
                answer_ctcp(&responder, &self.identity, event);
            }
            EventKind::DirectMessage => {
                self.journal.record(
                    Category::Pm,
                    format_args!("From {}: {}", event.source.mask(), event.payload),
                );
                let outcome = self.dispatcher.dispatch(link, event).await;
                debug!(?outcome, "private message dispatched");
            }
            EventKind::ChannelMessage => {
                let outcome = self.dispatcher.dispatch(link, event).await;
                debug!(?outcome, target = %event.target, "channel message dispatched");
            }
        }
    }
}

/// Reply to CTCP VERSION and PING. Other queries are ignored.
pub fn answer_ctcp(responder: &Responder<'_>, identity: &BotIdentity, event: &InboundEvent) {
    let Some(query) = event.ctcp() else {
        return;
    };
    let nick = event.source.nick.as_str();
    if nick.is_empty() {
        return;
    }
    match query.kind {
        CtcpKind::Version => {
            let version = identity.version_reply();
            responder.ctcp_reply(nick, &Ctcp::reply(CtcpKind::Version, Some(version.as_str())));
        }
        CtcpKind::Ping => {
            if let Some(token) = query.params {
                responder.ctcp_reply(nick, &Ctcp::reply(CtcpKind::Ping, Some(token)));
            }
        }
        ref other => debug!(kind = %other, source = %nick, "ignoring CTCP query"),
    }
}

#[async_trait]
impl EventHandler for CabalBot {
    async fn on_connected(&mut self, link: &Link<'_>) {
        info!(
            nick = %link.nickname,
            home = %self.identity.home_channel,
            commands = ?self.dispatcher.table().names(),
            "command bot ready"
        );
    }

    async fn on_message(&mut self, link: &Link<'_>, message: &Message) {
        if let Some(event) = link.classifier().classify(message) {
            self.handle_event(link, &event).await;
        }
    }
}
