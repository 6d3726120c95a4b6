//! One IRC connection and everything needed to keep it alive.
//!
//! A [`Session`] owns the transport. It connects (optionally over TLS),
//! registers through the [`auth::Authenticator`], joins its channels, then
//! serves inbound traffic to an [`EventHandler`] while draining its
//! [`Outbox`] and probing the link with the [`keepalive::KeepaliveMonitor`].
//! Transport failures reconnect under the [`reconnect::ReconnectPolicy`];
//! authentication failures end the session.

pub mod auth;
pub mod handler;
pub mod keepalive;
pub mod outbox;
pub mod reconnect;
pub mod tls;

pub use self::auth::{AuthError, Registration, SaslCredentials};
pub use self::handler::{EventHandler, Link};
pub use self::keepalive::KeepaliveMonitor;
pub use self::outbox::{Outbox, OutboxError, Outgoing};
pub use self::reconnect::ReconnectPolicy;

use cabal_proto::{ChannelExt, Command, Message, ProtocolError, Response, Transport, irc_eq};
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at, timeout_at};
use tokio_rustls::rustls::ClientConfig;
use tracing::{Instrument, debug, error, info, info_span, warn};

use self::auth::{AuthAction, Authenticator};
use self::keepalive::Probe;
use crate::channels::{ChannelRoster, ChannelSet};
use crate::error::SessionError;

/// Messages queued while disconnected; older ones are dropped first.
const MAX_BACKLOG: usize = 64;

/// Lifecycle of a session, observable through [`SessionHandle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Authenticating,
    Joining,
    Connected,
    Reconnecting,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Authenticating => "authenticating",
            Self::Joining => "joining",
            Self::Connected => "connected",
            Self::Reconnecting => "reconnecting",
        };
        f.write_str(name)
    }
}

/// Everything a session needs, fixed at construction.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Short name for logs (`bot`, `watcher`).
    pub label: &'static str,
    pub host: String,
    pub port: u16,
    pub tls: bool,
    pub connect_timeout: Duration,
    pub registration_timeout: Duration,
    pub registration: Registration,
    pub channels: ChannelSet,
    pub keepalive: KeepaliveMonitor,
    pub reconnect: ReconnectPolicy,
}

/// Control surface for a running session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    label: &'static str,
    outbox: Outbox,
    state: watch::Receiver<SessionState>,
}

impl SessionHandle {
    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn outbox(&self) -> &Outbox {
        &self.outbox
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Wait until the session reaches `target`. Returns `false` if the
    /// session went away first.
    pub async fn wait_for(&self, target: SessionState) -> bool {
        let mut rx = self.state.clone();
        rx.wait_for(|state| *state == target).await.is_ok()
    }

    /// Ask the session to send `QUIT :<reason>` and stop. Returns `false`
    /// if it had already stopped.
    pub fn disconnect(&self, reason: &str) -> bool {
        self.outbox.quit(reason).is_ok()
    }
}

enum SelectResult {
    Outgoing(Outgoing),
    Inbound(Result<Option<Message>, ProtocolError>),
    Tick,
}

pub struct Session<H> {
    label: &'static str,
    host: String,
    port: u16,
    tls: bool,
    /// Built on the first TLS connect and reused across reconnects.
    tls_config: Option<Arc<ClientConfig>>,
    connect_timeout: Duration,
    registration_timeout: Duration,
    registration: Registration,
    reconnect: ReconnectPolicy,
    keepalive: KeepaliveMonitor,
    channels: ChannelSet,
    roster: ChannelRoster,
    nickname: String,
    handler: H,
    outbox: Outbox,
    rx: mpsc::UnboundedReceiver<Outgoing>,
    backlog: VecDeque<Message>,
    state: watch::Sender<SessionState>,
}

impl<H: EventHandler> Session<H> {
    pub fn new(config: SessionConfig, handler: H) -> (Self, SessionHandle) {
        let (outbox, rx) = Outbox::channel();
        let (state, state_rx) = watch::channel(SessionState::Disconnected);
        let handle = SessionHandle {
            label: config.label,
            outbox: outbox.clone(),
            state: state_rx,
        };
        let session = Self {
            label: config.label,
            host: config.host,
            port: config.port,
            tls: config.tls,
            tls_config: None,
            connect_timeout: config.connect_timeout,
            registration_timeout: config.registration_timeout,
            nickname: config.registration.nickname.clone(),
            registration: config.registration,
            reconnect: config.reconnect,
            keepalive: config.keepalive,
            channels: config.channels,
            roster: ChannelRoster::new(),
            handler,
            outbox,
            rx,
            backlog: VecDeque::new(),
            state,
        };
        (session, handle)
    }

    pub fn spawn(self) -> JoinHandle<Result<(), SessionError>> {
        tokio::spawn(self.run())
    }

    /// Run until a voluntary quit (`Ok`) or a fatal error.
    pub async fn run(mut self) -> Result<(), SessionError> {
        let span = info_span!("session", label = self.label);
        let result = self.run_inner().instrument(span).await;
        self.set_state(SessionState::Disconnected);
        result
    }

    async fn run_inner(&mut self) -> Result<(), SessionError> {
        let mut attempt = 0u32;
        loop {
            let error = match self.connect_and_serve(&mut attempt).await {
                Ok(()) => return Ok(()),
                Err(e) => e,
            };

            if !error.is_recoverable() {
                error!(error = %error, code = error.error_code(), "session failed");
                return Err(error);
            }

            attempt += 1;
            let Some(delay) = self.reconnect.delay_for(attempt) else {
                let attempts = attempt - 1;
                error!(error = %error, attempts, "reconnect budget exhausted");
                return Err(SessionError::RetriesExhausted { attempts });
            };

            warn!(
                error = %error,
                code = error.error_code(),
                attempt,
                max_attempts = self.reconnect.max_attempts(),
                delay_ms = delay.as_millis() as u64,
                "connection lost, reconnecting"
            );
            self.set_state(SessionState::Reconnecting);
            if self.backoff(delay).await {
                return Ok(());
            }
        }
    }

    async fn connect_and_serve(&mut self, attempt: &mut u32) -> Result<(), SessionError> {
        self.set_state(SessionState::Connecting);
        info!(host = %self.host, port = self.port, tls = self.tls, "connecting");
        let tls_config = self.tls_config()?;
        let mut transport =
            tls::open_transport(&self.host, self.port, tls_config, self.connect_timeout).await?;

        self.set_state(SessionState::Authenticating);
        let Some(nickname) = self.register(&mut transport).await? else {
            return Ok(());
        };
        self.nickname = nickname;
        *attempt = 0;

        self.set_state(SessionState::Joining);
        self.roster.clear();
        self.keepalive.reset();
        let joins: Vec<Message> = self.channels.iter().map(Message::join).collect();
        for join in &joins {
            write(&mut transport, join).await?;
        }

        self.set_state(SessionState::Connected);
        info!(nick = %self.nickname, channels = self.channels.len(), "connected");

        let link = Link {
            outbox: &self.outbox,
            channels: &self.channels,
            roster: &self.roster,
            nickname: &self.nickname,
        };
        self.handler.on_connected(&link).await;

        while let Some(message) = self.backlog.pop_front() {
            write(&mut transport, &message).await?;
        }

        self.serve(&mut transport).await
    }

    /// Drive the authenticator to completion. `None` means a quit was
    /// requested before registration finished.
    async fn register(&mut self, transport: &mut Transport) -> Result<Option<String>, SessionError> {
        let mut auth = Authenticator::new(self.registration.clone());
        for message in auth.start() {
            write(transport, &message).await?;
        }

        let deadline = Instant::now() + self.registration_timeout;
        loop {
            let message = tokio::select! {
                biased;
                Some(out) = self.rx.recv() => match out {
                    Outgoing::Quit(reason) => {
                        send_quit(transport, &reason).await;
                        return Ok(None);
                    }
                    Outgoing::Message(message) => {
                        self.queue(message);
                        continue;
                    }
                },
                read = timeout_at(deadline, transport.read_message()) => match read {
                    Ok(read) => read?.ok_or(SessionError::Closed)?,
                    Err(_) => return Err(SessionError::RegistrationTimeout),
                },
            };

            if let Command::PING(token, server) = &message.command {
                let pong = Command::PONG(token.clone(), server.clone()).into();
                write(transport, &pong).await?;
                continue;
            }

            let mut completed = None;
            for action in auth.feed(&message)? {
                match action {
                    AuthAction::Send(reply) => write(transport, &reply).await?,
                    AuthAction::Complete { nickname } => completed = Some(nickname),
                }
            }
            if completed.is_some() {
                return Ok(completed);
            }
        }
    }

    async fn serve(&mut self, transport: &mut Transport) -> Result<(), SessionError> {
        let period = self.keepalive.interval();
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let event = tokio::select! {
                biased;
                Some(out) = self.rx.recv() => SelectResult::Outgoing(out),
                read = transport.read_message() => SelectResult::Inbound(read),
                _ = ticker.tick() => SelectResult::Tick,
            };

            match event {
                SelectResult::Outgoing(Outgoing::Message(message)) => {
                    write(transport, &message).await?;
                }
                SelectResult::Outgoing(Outgoing::Quit(reason)) => {
                    send_quit(transport, &reason).await;
                    return Ok(());
                }
                SelectResult::Inbound(Ok(Some(message))) => {
                    self.observe(transport, &message).await?;
                    let link = Link {
                        outbox: &self.outbox,
                        channels: &self.channels,
                        roster: &self.roster,
                        nickname: &self.nickname,
                    };
                    self.handler.on_message(&link, &message).await;
                }
                SelectResult::Inbound(Ok(None)) => return Err(SessionError::Closed),
                SelectResult::Inbound(Err(e)) => return Err(e.into()),
                SelectResult::Tick => match self.keepalive.on_tick() {
                    Probe::Send(token) => {
                        debug!(token = %token, outstanding = self.keepalive.outstanding(), "keepalive probe");
                        write(transport, &Message::ping(token)).await?;
                    }
                    Probe::Dead { missed } => return Err(SessionError::KeepaliveTimeout { missed }),
                },
            }
        }
    }

    /// Session-level bookkeeping for one inbound message.
    async fn observe(&mut self, transport: &mut Transport, message: &Message) -> Result<(), SessionError> {
        let source = message.source_nickname();

        match &message.command {
            Command::PING(token, server) => {
                let pong = Command::PONG(token.clone(), server.clone()).into();
                write(transport, &pong).await?;
            }
            Command::PONG(..) => self.keepalive.on_pong(),
            Command::ERROR(reason) => return Err(SessionError::ServerError(reason.clone())),
            Command::JOIN(channel, _) => {
                if let Some(nick) = source {
                    if self.is_me(nick) {
                        info!(channel = %channel, "joined");
                        self.channels.insert(channel.clone());
                        self.roster.drop_channel(channel);
                    }
                    self.roster.add_member(channel, nick);
                }
            }
            Command::PART(channel, _) => {
                if let Some(nick) = source {
                    if self.is_me(nick) {
                        info!(channel = %channel, "parted");
                        self.channels.remove(channel);
                        self.roster.drop_channel(channel);
                    } else {
                        self.roster.remove_member(channel, nick);
                    }
                }
            }
            Command::KICK(channel, nick, reason) => {
                if self.is_me(nick) {
                    warn!(channel = %channel, by = ?source, reason = ?reason, "kicked");
                    self.roster.drop_channel(channel);
                    if self.channels.is_home(channel) {
                        write(transport, &Message::join(channel.clone())).await?;
                    } else {
                        self.channels.remove(channel);
                    }
                } else {
                    self.roster.remove_member(channel, nick);
                }
            }
            Command::QUIT(_) => {
                if let Some(nick) = source {
                    self.roster.remove_everywhere(nick);
                }
            }
            Command::NICK(new) => {
                if let Some(old) = source {
                    if self.is_me(old) {
                        info!(old = %old, new = %new, "nickname changed");
                        self.nickname = new.clone();
                    }
                    self.roster.rename(old, new);
                }
            }
            Command::MODE(target, params) if target.is_channel_name() => {
                self.roster.apply_mode(target, params);
            }
            Command::Response(code, params) => self.observe_numeric(*code, params),
            _ => {}
        }
        Ok(())
    }

    fn observe_numeric(&mut self, code: Response, params: &[String]) {
        if code == Response::RPL_NAMREPLY {
            // <me> <symbol> <channel> :<names>
            if let [_, _, channel, names, ..] = params {
                self.roster.add_names(channel, names);
            }
        } else if code.is_join_failure() {
            if let Some(channel) = params.get(1) {
                let reason = params.last().map(String::as_str).unwrap_or_default();
                warn!(channel = %channel, code = code.code(), reason = %reason, "join failed");
                self.channels.remove(channel);
            }
        } else if code == Response::ERR_NICKNAMEINUSE {
            warn!(nick = %self.nickname, "could not reclaim nickname");
        }
    }

    fn is_me(&self, nick: &str) -> bool {
        irc_eq(nick, &self.nickname)
    }

    fn tls_config(&mut self) -> Result<Option<Arc<ClientConfig>>, SessionError> {
        if !self.tls {
            return Ok(None);
        }
        if let Some(config) = &self.tls_config {
            return Ok(Some(config.clone()));
        }
        let config = Arc::new(tls::client_config()?);
        self.tls_config = Some(config.clone());
        Ok(Some(config))
    }

    fn queue(&mut self, message: Message) {
        if self.backlog.len() >= MAX_BACKLOG {
            self.backlog.pop_front();
            warn!("outbound backlog full, dropping oldest message");
        }
        self.backlog.push_back(message);
    }

    /// Sleep before reconnecting. Returns `true` if a quit was requested.
    async fn backoff(&mut self, delay: Duration) -> bool {
        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);
        loop {
            tokio::select! {
                _ = &mut sleep => return false,
                Some(out) = self.rx.recv() => match out {
                    Outgoing::Quit(reason) => {
                        info!(reason = %reason, "quit requested while reconnecting");
                        return true;
                    }
                    Outgoing::Message(message) => self.queue(message),
                },
            }
        }
    }

    fn set_state(&self, state: SessionState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            debug!(from = %previous, to = %state, "session state");
        }
    }
}

async fn write(transport: &mut Transport, message: &Message) -> Result<(), SessionError> {
    match transport.write_message(message).await {
        Ok(()) => Ok(()),
        Err(ProtocolError::MessageTooLong { actual, limit }) => {
            warn!(actual, limit, "dropping over-long outbound line");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

async fn send_quit(transport: &mut Transport, reason: &str) {
    info!(reason = %reason, "quitting");
    if let Err(e) = transport.write_message(&Message::quit(reason)).await {
        debug!(error = %e, "failed to send QUIT");
    }
    if let Err(e) = transport.close().await {
        debug!(error = %e, "failed to close transport");
    }
}
