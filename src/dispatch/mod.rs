//! Command parsing, the command table, and dispatch.
//!
//! Channel messages must be addressed to the bot (`CabalBot: !hi`); unknown
//! commands there are dropped silently. Private messages are only accepted
//! from the owner or an admin, may skip the address, and get a short hint
//! for unknown commands.

pub mod commands;
mod parser;

pub use self::parser::{Addressing, CommandParser, ParsedCommand};

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{Instrument, debug, info_span};

use self::commands::{CaCommand, HiCommand};
use crate::centralauth::AccountLookup;
use crate::classify::{EventKind, InboundEvent, SourceIdentity};
use crate::identity::BotIdentity;
use crate::journal::{Category, Journal};
use crate::permission::PermissionGuard;
use crate::responder::Responder;
use crate::session::Link;

/// Everything a command sees.
pub struct CommandContext<'a> {
    pub source: &'a SourceIdentity,
    /// Channel the command came from, or the sender for private messages.
    pub reply_target: &'a str,
    pub args: &'a str,
    pub prefix: char,
    pub responder: Responder<'a>,
    pub permissions: PermissionGuard<'a>,
}

#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn handle(&self, ctx: &CommandContext<'_>);
}

/// Static, read-only name -> handler table.
pub struct CommandTable {
    handlers: HashMap<&'static str, Box<dyn CommandHandler>>,
}

impl CommandTable {
    pub fn new(lookup: Arc<dyn AccountLookup>) -> Self {
        let mut handlers: HashMap<&'static str, Box<dyn CommandHandler>> = HashMap::new();
        handlers.insert("hi", Box::new(HiCommand));
        handlers.insert("ca", Box::new(CaCommand::new(lookup)));
        Self { handlers }
    }

    /// Case-insensitive lookup.
    pub fn get(&self, name: &str) -> Option<&dyn CommandHandler> {
        self.handlers
            .get(name.to_lowercase().as_str())
            .map(|handler| handler.as_ref())
    }

    /// Command names, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.handlers.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

/// What [`CommandDispatcher::dispatch`] did with an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Not a command (unaddressed, no prefix, or not a message kind).
    Ignored,
    /// Private message from someone without privileges.
    Denied,
    Unknown(String),
    Handled(String),
}

pub struct CommandDispatcher {
    identity: Arc<BotIdentity>,
    journal: Journal,
    table: CommandTable,
}

impl CommandDispatcher {
    pub fn new(identity: Arc<BotIdentity>, journal: Journal, table: CommandTable) -> Self {
        Self {
            identity,
            journal,
            table,
        }
    }

    pub fn table(&self) -> &CommandTable {
        &self.table
    }

    pub async fn dispatch(&self, link: &Link<'_>, event: &InboundEvent) -> DispatchOutcome {
        let parser = CommandParser::new(link.nickname, self.identity.command_char);
        let permissions = PermissionGuard::new(&self.identity, link.roster);
        let responder = Responder::new(link.outbox, &self.identity, &self.journal);

        let addressing = match event.kind {
            EventKind::ChannelMessage => Addressing::Required,
            EventKind::DirectMessage => {
                if !permissions.is_privileged(&event.source) {
                    debug!(source = %event.source.nick, "ignoring private message from unprivileged user");
                    return DispatchOutcome::Denied;
                }
                Addressing::Optional
            }
            EventKind::ControlQuery | EventKind::ActionNotice => return DispatchOutcome::Ignored,
        };

        let Some(command) = parser.parse(&event.payload, addressing) else {
            return DispatchOutcome::Ignored;
        };

        let Some(handler) = self.table.get(&command.name) else {
            debug!(command = %command.name, target = %event.target, "unknown command");
            if event.kind == EventKind::DirectMessage {
                let known: Vec<String> = self
                    .table
                    .names()
                    .iter()
                    .map(|name| format!("{}{}", self.identity.command_char, name))
                    .collect();
                let hint = format!("Unrecognized command. Known commands: {}", known.join(", "));
                responder.send(&hint, Some(event.source.nick.as_str()));
            }
            return DispatchOutcome::Unknown(command.name);
        };

        self.journal.record(
            Category::Command,
            format_args!(
                "{} in {} did command: {}",
                event.source.mask(),
                event.target,
                event.payload
            ),
        );

        let ctx = CommandContext {
            source: &event.source,
            reply_target: event.reply_target(),
            args: &command.args,
            prefix: self.identity.command_char,
            responder,
            permissions,
        };
        let span = info_span!("command", name = %command.name, source = %event.source.nick);
        handler.handle(&ctx).instrument(span).await;

        DispatchOutcome::Handled(command.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::centralauth::{GlobalAccount, LookupError};
    use crate::channels::{ChannelRoster, ChannelSet};
    use crate::classify::EventClassifier;
    use crate::identity::test_support::identity;
    use crate::session::{Outbox, Outgoing};
    use cabal_proto::Message;
    use tokio::sync::mpsc;

    struct FakeLookup;

    #[async_trait]
    impl AccountLookup for FakeLookup {
        async fn lookup(&self, account: &str) -> Result<Option<GlobalAccount>, LookupError> {
            match account {
                "Example" => Ok(Some(GlobalAccount {
                    name: "Example".to_string(),
                    home: Some("enwiki".to_string()),
                    ..Default::default()
                })),
                "Broken" => Err(LookupError::BadResponse("boom".to_string())),
                _ => Ok(None),
            }
        }
    }

    struct Fixture {
        dispatcher: CommandDispatcher,
        outbox: Outbox,
        rx: mpsc::UnboundedReceiver<Outgoing>,
        channels: ChannelSet,
        roster: ChannelRoster,
        journal: Journal,
        path: std::path::PathBuf,
        _dir: tempfile::TempDir,
    }

    impl Fixture {
        async fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("cabal.log");
            let journal = Journal::open(&path).await.unwrap();
            let table = CommandTable::new(Arc::new(FakeLookup));
            let dispatcher = CommandDispatcher::new(Arc::new(identity()), journal.clone(), table);
            let (outbox, rx) = Outbox::channel();
            Self {
                dispatcher,
                outbox,
                rx,
                channels: ChannelSet::with_channels("#cabal", ["#cvn-wp"]),
                roster: ChannelRoster::new(),
                journal,
                path,
                _dir: dir,
            }
        }

        async fn run(&mut self, line: &str) -> DispatchOutcome {
            let link = Link {
                outbox: &self.outbox,
                channels: &self.channels,
                roster: &self.roster,
                nickname: "CabalBot",
            };
            let message: Message = line.parse().unwrap();
            let event = EventClassifier::new("CabalBot", &self.channels)
                .classify(&message)
                .unwrap();
            self.dispatcher.dispatch(&link, &event).await
        }

        fn sent(&mut self) -> Vec<Message> {
            let mut out = Vec::new();
            while let Ok(Outgoing::Message(m)) = self.rx.try_recv() {
                out.push(m);
            }
            out
        }

        async fn journal(&self) -> Vec<String> {
            self.journal.flush().await;
            tokio::fs::read_to_string(&self.path)
                .await
                .unwrap_or_default()
                .lines()
                .map(str::to_string)
                .collect()
        }
    }

    #[tokio::test]
    async fn test_hi_in_channel() {
        let mut fx = Fixture::new().await;
        let outcome = fx.run(":Alice!alice@wikimedia/Alice PRIVMSG #cabal :CabalBot: !hi").await;
        assert_eq!(outcome, DispatchOutcome::Handled("hi".to_string()));
        assert_eq!(
            fx.sent(),
            vec![Message::privmsg("#cabal", "Hello Alice! I saw your message!")]
        );

        let journal = fx.journal().await;
        assert_eq!(journal.len(), 1);
        assert!(journal[0].ends_with(
            " -- COMMAND > Alice!alice@wikimedia/Alice in #cabal did command: CabalBot: !hi"
        ));
    }

    #[tokio::test]
    async fn test_unaddressed_channel_message_has_no_effect() {
        let mut fx = Fixture::new().await;
        let outcome = fx.run(":Bob!b@h PRIVMSG #cabal :!hi").await;
        assert_eq!(outcome, DispatchOutcome::Ignored);
        assert!(fx.sent().is_empty());
        assert!(fx.journal().await.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_channel_command_is_silent() {
        let mut fx = Fixture::new().await;
        let outcome = fx.run(":Bob!b@h PRIVMSG #cabal :CabalBot: !frobnicate").await;
        assert_eq!(outcome, DispatchOutcome::Unknown("frobnicate".to_string()));
        assert!(fx.sent().is_empty());
        assert!(fx.journal().await.is_empty());
    }

    #[tokio::test]
    async fn test_private_command_from_admin() {
        let mut fx = Fixture::new().await;
        let outcome = fx.run(":Alice!a@h PRIVMSG CabalBot :!hi").await;
        assert_eq!(outcome, DispatchOutcome::Handled("hi".to_string()));
        assert_eq!(
            fx.sent(),
            vec![Message::privmsg("Alice", "Hello Alice! I saw your message!")]
        );
    }

    #[tokio::test]
    async fn test_private_command_from_stranger_is_denied() {
        let mut fx = Fixture::new().await;
        let outcome = fx.run(":Mallory!m@h PRIVMSG CabalBot :!hi").await;
        assert_eq!(outcome, DispatchOutcome::Denied);
        assert!(fx.sent().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_private_command_gets_hint() {
        let mut fx = Fixture::new().await;
        let outcome = fx.run(":Operator873!o@h PRIVMSG CabalBot :!frobnicate").await;
        assert_eq!(outcome, DispatchOutcome::Unknown("frobnicate".to_string()));
        assert_eq!(
            fx.sent(),
            vec![Message::privmsg(
                "Operator873",
                "Unrecognized command. Known commands: !ca, !hi"
            )]
        );
    }

    #[tokio::test]
    async fn test_ca_replies_in_home_channel() {
        let mut fx = Fixture::new().await;
        fx.run(":Bob!b@h PRIVMSG #cvn-wp :CabalBot: !ca Example").await;
        let sent = fx.sent();
        assert_eq!(sent.len(), 1);
        let line = sent[0].to_string();
        assert!(line.starts_with("PRIVMSG #cabal :Example: home enwiki,"));

        fx.run(":Bob!b@h PRIVMSG #cvn-wp :CabalBot: !ca Nobody").await;
        assert_eq!(
            fx.sent(),
            vec![Message::privmsg("#cabal", "Nobody does not have a global account.")]
        );

        fx.run(":Operator873!o@h PRIVMSG CabalBot :!ca Broken").await;
        assert_eq!(
            fx.sent(),
            vec![Message::privmsg("#cabal", "Central Auth lookup for Broken failed.")]
        );
    }

    #[tokio::test]
    async fn test_ca_without_args_prints_usage() {
        let mut fx = Fixture::new().await;
        fx.run(":Bob!b@h PRIVMSG #cvn-wp :CabalBot: !CA").await;
        assert_eq!(
            fx.sent(),
            vec![Message::privmsg("#cabal", "Usage: !ca <account>")]
        );
    }

    #[test]
    fn test_table_names() {
        let table = CommandTable::new(Arc::new(FakeLookup));
        assert_eq!(table.names(), vec!["ca", "hi"]);
        assert!(table.get("HI").is_some());
        assert!(table.get("hello").is_none());
    }
}
