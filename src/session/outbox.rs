//! Outbound queue from handlers to the session that owns the transport.

use cabal_proto::{Ctcp, MAX_IRC_LINE_LEN, Message};
use thiserror::Error;
use tokio::sync::mpsc;

/// One request for the session's writer.
#[derive(Debug, Clone, PartialEq)]
pub enum Outgoing {
    Message(Message),
    /// Send `QUIT :<reason>` and end the session.
    Quit(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OutboxError {
    #[error("message too long: {actual} bytes (limit: {limit})")]
    MessageTooLong { actual: usize, limit: usize },
    #[error("session is closed")]
    Closed,
}

/// Cloneable sender side of a session's outbound queue.
///
/// Line length is checked here, before queueing, so an over-long message
/// never reaches the wire.
#[derive(Debug, Clone)]
pub struct Outbox {
    tx: mpsc::UnboundedSender<Outgoing>,
    limit: usize,
}

impl Outbox {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Outgoing>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                tx,
                limit: MAX_IRC_LINE_LEN,
            },
            rx,
        )
    }

    pub fn send(&self, message: Message) -> Result<(), OutboxError> {
        let actual = message.wire_len();
        if actual > self.limit {
            return Err(OutboxError::MessageTooLong {
                actual,
                limit: self.limit,
            });
        }
        self.tx
            .send(Outgoing::Message(message))
            .map_err(|_| OutboxError::Closed)
    }

    pub fn privmsg(&self, target: &str, text: &str) -> Result<(), OutboxError> {
        self.send(Message::privmsg(target, text))
    }

    /// CTCP replies travel as `NOTICE`.
    pub fn ctcp_reply(&self, target: &str, reply: &Ctcp<'_>) -> Result<(), OutboxError> {
        self.send(Message::notice(target, reply.to_string()))
    }

    /// Ask the session to quit with `reason` and stop.
    pub fn quit(&self, reason: &str) -> Result<(), OutboxError> {
        self.tx
            .send(Outgoing::Quit(reason.to_string()))
            .map_err(|_| OutboxError::Closed)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
