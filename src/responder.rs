//! Outbound text with graceful handling of over-long lines.

use tracing::warn;

use crate::identity::BotIdentity;
use crate::journal::{Category, Journal};
use crate::session::{Outbox, OutboxError};

/// What happened to a [`Responder::send`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    /// Too long; the owner was pinged instead.
    Substituted,
    /// The session is gone.
    Dropped,
}

/// Sends text for handlers. Defaults to the home channel.
#[derive(Debug, Clone, Copy)]
pub struct Responder<'a> {
    outbox: &'a Outbox,
    identity: &'a BotIdentity,
    journal: &'a Journal,
}

impl<'a> Responder<'a> {
    pub fn new(outbox: &'a Outbox, identity: &'a BotIdentity, journal: &'a Journal) -> Self {
        Self {
            outbox,
            identity,
            journal,
        }
    }

    /// Send `message` to `target`, or to the home channel.
    ///
    /// An over-long message is never sent. It is journaled and replaced
    /// by a short notice pinging the owner.
    pub fn send(&self, message: &str, target: Option<&str>) -> Delivery {
        let target = target.unwrap_or(self.identity.home_channel.as_str());
        match self.outbox.privmsg(target, message) {
            Ok(()) => Delivery::Sent,
            Err(OutboxError::MessageTooLong { actual, limit }) => {
                warn!(target = %target, actual, limit, "response too long");
                self.journal.record(Category::MsgTooLong, message);
                let notice = format!(
                    "I tried to send a response that was too long. Pinging {}",
                    self.identity.owner
                );
                match self.outbox.privmsg(target, &notice) {
                    Ok(()) => Delivery::Substituted,
                    Err(e) => {
                        warn!(target = %target, error = %e, "failed to send substitute");
                        Delivery::Dropped
                    }
                }
            }
            Err(OutboxError::Closed) => {
                warn!(target = %target, "session closed, response dropped");
                Delivery::Dropped
            }
        }
    }

    /// Reply to a CTCP query as a `NOTICE`.
    pub fn ctcp_reply(&self, target: &str, reply: &cabal_proto::Ctcp<'_>) -> Delivery {
        match self.outbox.ctcp_reply(target, reply) {
            Ok(()) => Delivery::Sent,
            Err(e) => {
                warn!(target = %target, error = %e, "failed to send CTCP reply");
                Delivery::Dropped
            }
        }
    }
}
