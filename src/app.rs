//! Wiring: builds both sessions from config and supervises them.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::bot::CabalBot;
use crate::centralauth::AccountLookup;
use crate::channels::ChannelSet;
use crate::config::{Config, WatcherConfig};
use crate::dispatch::{CommandDispatcher, CommandTable};
use crate::error::SessionError;
use crate::identity::{BOT_NAME, BotIdentity};
use crate::journal::{Category, Journal};
use crate::session::{
    KeepaliveMonitor, ReconnectPolicy, Registration, SaslCredentials, Session, SessionConfig,
    SessionHandle,
};
use crate::settings::{BotSettings, SettingsError, SettingsStore};
use crate::watcher::{ChangeFeed, Watcher};

/// Quit reason on Ctrl-C / SIGTERM.
pub const INTERRUPT_REASON: &str = "Killed by a KeyboardInterrupt";
/// Quit reason when a session fails or a task panics.
pub const FATAL_REASON: &str = "CabalBot encountered an error and unexpectedly closed.";

/// How long sessions get to send QUIT before their tasks are aborted.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error("{label} session failed: {detail}")]
    SessionFailed { label: &'static str, detail: String },
}

/// Handles to every live session, for coordinated shutdown.
#[derive(Debug, Clone)]
pub struct AppContext {
    sessions: Vec<SessionHandle>,
    journal: Journal,
}

impl AppContext {
    pub fn new(journal: Journal) -> Self {
        Self {
            sessions: Vec::new(),
            journal,
        }
    }

    pub fn register(&mut self, handle: SessionHandle) {
        self.sessions.push(handle);
    }

    pub fn sessions(&self) -> &[SessionHandle] {
        &self.sessions
    }

    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    /// Ask every session to quit with `reason`. Returns how many were
    /// still running.
    pub fn shutdown(&self, reason: &str) -> usize {
        self.sessions
            .iter()
            .filter(|session| {
                let live = session.disconnect(reason);
                debug!(label = session.label(), live, reason, "disconnect requested");
                live
            })
            .count()
    }
}

/// External collaborators handed to [`launch`].
pub struct Collaborators {
    pub settings: Box<dyn SettingsStore>,
    pub lookup: Arc<dyn AccountLookup>,
    pub feed: Option<ChangeFeed>,
}

fn keepalive(config: &Config) -> KeepaliveMonitor {
    KeepaliveMonitor::new(
        Duration::from_secs(config.keepalive.interval_secs),
        config.keepalive.max_missed,
    )
}

fn reconnect(config: &Config) -> ReconnectPolicy {
    ReconnectPolicy::new(
        config.keepalive.max_missed,
        Duration::from_secs(config.reconnect.delay_secs),
    )
}

/// Session settings for the command bot.
pub fn bot_session_config(
    config: &Config,
    identity: &BotIdentity,
    settings: &BotSettings,
) -> SessionConfig {
    SessionConfig {
        label: "bot",
        host: config.server.url.clone(),
        port: config.server.port,
        tls: config.server.tls,
        connect_timeout: Duration::from_secs(config.server.connect_timeout_secs),
        registration_timeout: Duration::from_secs(config.server.registration_timeout_secs),
        registration: Registration {
            nickname: identity.nickname.clone(),
            username: identity.account.clone(),
            realname: BOT_NAME.to_string(),
            credentials: Some(SaslCredentials::new(
                identity.account.clone(),
                identity.credential(),
            )),
        },
        channels: ChannelSet::with_channels(
            identity.home_channel.clone(),
            settings.channels.iter().cloned(),
        ),
        keepalive: keepalive(config),
        reconnect: reconnect(config),
    }
}

/// Session settings for the passive watcher.
pub fn watcher_session_config(
    config: &Config,
    watcher: &WatcherConfig,
    settings: &BotSettings,
) -> SessionConfig {
    let home = watcher
        .channel
        .clone()
        .unwrap_or_else(|| config.bot.botchannel.clone());
    let credentials = match (&watcher.account, &watcher.password) {
        (Some(account), Some(password)) => {
            Some(SaslCredentials::new(account.clone(), password.clone()))
        }
        _ => None,
    };

    SessionConfig {
        label: "watcher",
        host: config.server.url.clone(),
        port: config.server.port,
        tls: config.server.tls,
        connect_timeout: Duration::from_secs(config.server.connect_timeout_secs),
        registration_timeout: Duration::from_secs(config.server.registration_timeout_secs),
        registration: Registration {
            nickname: watcher.nickname.clone(),
            username: watcher
                .account
                .clone()
                .unwrap_or_else(|| watcher.nickname.clone()),
            realname: format!("{BOT_NAME} watcher"),
            credentials,
        },
        channels: ChannelSet::with_channels(home, settings.channels.iter().cloned()),
        keepalive: keepalive(config),
        reconnect: reconnect(config),
    }
}

/// Supervised, running sessions.
pub struct Running {
    context: AppContext,
    tasks: JoinSet<(&'static str, Result<(), SessionError>)>,
}

/// Load settings, build the sessions, and spawn them.
pub async fn launch(
    config: &Config,
    journal: Journal,
    collaborators: Collaborators,
) -> Result<Running, AppError> {
    let settings = collaborators.settings.load().await?;
    let identity = Arc::new(BotIdentity::new(config, &settings));
    info!(
        nick = %identity.nickname,
        home = %identity.home_channel,
        channels = settings.channels.len(),
        admins = settings.admins.len(),
        "starting sessions"
    );

    let mut context = AppContext::new(journal.clone());
    let mut tasks = JoinSet::new();

    let dispatcher = CommandDispatcher::new(
        identity.clone(),
        journal.clone(),
        CommandTable::new(collaborators.lookup),
    );
    let bot = CabalBot::new(identity.clone(), journal.clone(), dispatcher);
    let (session, handle) = Session::new(bot_session_config(config, &identity, &settings), bot);
    context.register(handle);
    tasks.spawn(async move { ("bot", session.run().await) });

    if let Some(ref watcher_config) = config.watcher {
        let session_config = watcher_session_config(config, watcher_config, &settings);
        let watcher = Watcher::new(
            identity.clone(),
            journal.clone(),
            session_config.channels.home().to_string(),
            collaborators.feed,
        );
        let (session, handle) = Session::new(session_config, watcher);
        context.register(handle);
        tasks.spawn(async move { ("watcher", session.run().await) });
    }

    Ok(Running { context, tasks })
}

impl Running {
    pub fn context(&self) -> &AppContext {
        &self.context
    }

    /// Supervise until every session ends, one fails, or `interrupt`
    /// resolves. A failure journals `UNHANDLED EXCEPTION` and disconnects
    /// the remaining sessions.
    pub async fn run_until<F>(mut self, interrupt: F) -> Result<(), AppError>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(interrupt);
        loop {
            tokio::select! {
                _ = &mut interrupt => {
                    info!("interrupted, disconnecting sessions");
                    self.context.shutdown(INTERRUPT_REASON);
                    self.drain().await;
                    return Ok(());
                }
                joined = self.tasks.join_next() => match joined {
                    None => return Ok(()),
                    Some(Ok((label, Ok(())))) => info!(label, "session ended"),
                    Some(Ok((label, Err(e)))) => {
                        return Err(self.fail(label, e.to_string()).await);
                    }
                    Some(Err(e)) => {
                        return Err(self.fail("unknown", e.to_string()).await);
                    }
                },
            }
        }
    }

    async fn fail(&mut self, label: &'static str, detail: String) -> AppError {
        error!(label, error = %detail, "session failed, shutting down");
        self.context
            .journal
            .record(Category::UnhandledException, format_args!("{label}: {detail}"));
        let live = self.context.shutdown(FATAL_REASON);
        if live > 0 {
            warn!(live, "disconnecting remaining sessions");
        }
        self.drain().await;
        self.context.journal.flush().await;
        AppError::SessionFailed { label, detail }
    }

    async fn drain(&mut self) {
        let tasks = &mut self.tasks;
        let drained = timeout(SHUTDOWN_GRACE, async {
            while let Some(joined) = tasks.join_next().await {
                if let Ok((label, Err(e))) = joined {
                    warn!(label, error = %e, "session ended with error during shutdown");
                }
            }
        })
        .await;
        if drained.is_err() {
            warn!("sessions did not stop in time, aborting");
            self.tasks.abort_all();
        }
        self.context.journal.flush().await;
    }
}
