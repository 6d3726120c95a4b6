//! Config fixtures and fake collaborators.

use async_trait::async_trait;
use cabal_proto::Message;
use cabalbot::centralauth::{AccountLookup, GlobalAccount, LookupError};
use cabalbot::channels::ChannelSet;
use cabalbot::config::Config;
use cabalbot::journal::Journal;
use cabalbot::session::{
    EventHandler, KeepaliveMonitor, Link, ReconnectPolicy, Registration, SaslCredentials,
    SessionConfig,
};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::{mpsc, watch};

/// A config pointing at a mock server, plus a scratch directory for the
/// journal.
pub struct TestEnv {
    pub config: Config,
    pub dir: TempDir,
}

impl TestEnv {
    pub fn new(port: u16) -> anyhow::Result<Self> {
        Self::with_extra(port, "")
    }

    /// `extra` is appended verbatim to the generated TOML.
    pub fn with_extra(port: u16, extra: &str) -> anyhow::Result<Self> {
        let dir = tempfile::tempdir()?;
        let journal = dir.path().join("cabal.log");
        let text = format!(
            r##"
[admin]
owner = "Operator873"

[bot]
botname = "CabalBot"
botaccount = "CabalBot"
botpassword = "hunter2"
botcmdchar = "!"
botchannel = "#cabal"

[server]
url = "127.0.0.1"
port = {port}
tls = false
connect_timeout_secs = 2
registration_timeout_secs = 5

[reconnect]
delay_secs = 0

[journal]
path = "{journal}"

[settings]
channels = ["#cvn-wp"]
admins = ["Alice"]
{extra}
"##,
            journal = journal.display().to_string().replace('\\', "/"),
        );
        let config = Config::from_toml(&text)?;
        Ok(Self { config, dir })
    }

    pub fn journal_path(&self) -> PathBuf {
        self.config.journal.path.clone()
    }

    pub async fn open_journal(&self) -> anyhow::Result<Journal> {
        Ok(Journal::open(self.journal_path()).await?)
    }

    pub async fn read_journal(&self) -> String {
        tokio::fs::read_to_string(self.journal_path())
            .await
            .unwrap_or_default()
    }
}

/// Session settings for talking to a mock server, with short timers.
pub fn session_config(port: u16, credentials: bool) -> SessionConfig {
    SessionConfig {
        label: "test",
        host: "127.0.0.1".to_string(),
        port,
        tls: false,
        connect_timeout: Duration::from_secs(2),
        registration_timeout: Duration::from_secs(5),
        registration: Registration {
            nickname: "CabalBot".to_string(),
            username: "CabalBot".to_string(),
            realname: "CabalBot".to_string(),
            credentials: credentials.then(|| SaslCredentials::new("CabalBot", "hunter2")),
        },
        channels: ChannelSet::with_channels("#cabal", ["#cvn-wp"]),
        keepalive: KeepaliveMonitor::new(Duration::from_secs(60), 2),
        reconnect: ReconnectPolicy::new(2, Duration::from_millis(50)),
    }
}

/// Forwards every inbound message (and connect notifications) to the test,
/// and publishes the session's channel set after each one.
pub struct RecordingHandler {
    tx: mpsc::UnboundedSender<Recorded>,
    channels: watch::Sender<Vec<String>>,
}

#[derive(Debug)]
pub enum Recorded {
    Connected { nickname: String },
    Message(Message),
}

impl RecordingHandler {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Recorded>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (channels, _) = watch::channel(Vec::new());
        (Self { tx, channels }, rx)
    }

    /// Channel set as of the last handled event.
    pub fn channels(&self) -> watch::Receiver<Vec<String>> {
        self.channels.subscribe()
    }

    fn publish_channels(&self, link: &Link<'_>) {
        let current: Vec<String> = link.channels.iter().map(str::to_string).collect();
        self.channels.send_replace(current);
    }
}

#[async_trait]
impl EventHandler for RecordingHandler {
    async fn on_connected(&mut self, link: &Link<'_>) {
        self.publish_channels(link);
        let _ = self.tx.send(Recorded::Connected {
            nickname: link.nickname.to_string(),
        });
    }

    async fn on_message(&mut self, link: &Link<'_>, message: &Message) {
        self.publish_channels(link);
        let _ = self.tx.send(Recorded::Message(message.clone()));
    }
}

/// Canned Central Auth answers keyed by account name.
#[derive(Default)]
pub struct FakeLookup {
    accounts: HashMap<String, GlobalAccount>,
}

impl FakeLookup {
    pub fn with(mut self, account: GlobalAccount) -> Self {
        self.accounts.insert(account.name.clone(), account);
        self
    }
}

#[async_trait]
impl AccountLookup for FakeLookup {
    async fn lookup(&self, account: &str) -> Result<Option<GlobalAccount>, LookupError> {
        Ok(self.accounts.get(account).cloned())
    }
}
