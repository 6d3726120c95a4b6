//! Registration and SASL PLAIN authentication.
//!
//! Sans-IO: the session feeds every inbound message to [`Authenticator::feed`]
//! until it reports [`AuthAction::Complete`] or an [`AuthError`]. The flow is
//! `CAP LS 302` / `NICK` / `USER`, then `CAP REQ :sasl`, `AUTHENTICATE PLAIN`,
//! the credential payload, and `CAP END` once the server answers `903`.
//! Registration completes on `001`.

use cabal_proto::{
    CapSubCommand, Command, Message, Response, chunk_payload, encode_plain,
};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

/// Capabilities requested whenever the server offers them.
const WANTED_CAPS: &[&str] = &["multi-prefix"];

/// Services account used for SASL PLAIN.
#[derive(Clone)]
pub struct SaslCredentials {
    pub account: String,
    password: Zeroizing<String>,
}

impl SaslCredentials {
    pub fn new(account: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            password: Zeroizing::new(password.into()),
        }
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for SaslCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SaslCredentials")
            .field("account", &self.account)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// What to register as.
#[derive(Debug, Clone)]
pub struct Registration {
    pub nickname: String,
    pub username: String,
    pub realname: String,
    /// SASL is mandatory when set.
    pub credentials: Option<SaslCredentials>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("server does not offer SASL")]
    SaslUnavailable,
    #[error("server rejected capabilities: {0}")]
    CapRejected(String),
    #[error("SASL failed ({code}): {reason}")]
    SaslFailed { code: u16, reason: String },
    #[error("nickname unavailable: {0}")]
    NicknameUnavailable(String),
    #[error("erroneous nickname: {0}")]
    ErroneousNickname(String),
    #[error("server closed registration: {0}")]
    ServerError(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum AuthAction {
    Send(Message),
    /// Registered; `nickname` is the nick the server welcomed us as.
    Complete { nickname: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    CapNegotiation,
    Authenticating,
    Registering,
    Done,
}

#[derive(Debug, Clone)]
pub struct Authenticator {
    registration: Registration,
    phase: Phase,
    nickname: String,
    available_caps: HashSet<String>,
    sasl_done: bool,
    /// Registered under the fallback nick; reclaim the real one after welcome.
    ghost_pending: bool,
}

impl Authenticator {
    pub fn new(registration: Registration) -> Self {
        let nickname = registration.nickname.clone();
        Self {
            registration,
            phase: Phase::Idle,
            nickname,
            available_caps: HashSet::new(),
            sasl_done: false,
            ghost_pending: false,
        }
    }

    /// Nick currently being registered.
    pub fn nickname(&self) -> &str {
        &self.nickname
    }

    pub fn is_complete(&self) -> bool {
        self.phase == Phase::Done
    }

    /// Opening burst: `CAP LS 302`, `NICK`, `USER`.
    pub fn start(&mut self) -> Vec<Message> {
        self.phase = Phase::CapNegotiation;
        let reg = &self.registration;
        vec![
            Command::CAP(None, CapSubCommand::LS, vec!["302".to_string()]).into(),
            Command::NICK(self.nickname.clone()).into(),
            Command::USER(reg.username.clone(), "0".to_string(), reg.realname.clone()).into(),
        ]
    }

    /// Feed one inbound message.
    pub fn feed(&mut self, msg: &Message) -> Result<Vec<AuthAction>, AuthError> {
        if matches!(self.phase, Phase::Idle | Phase::Done) {
            return Ok(Vec::new());
        }

        match &msg.command {
            Command::CAP(_, sub, params) => self.handle_cap(*sub, params),
            Command::AUTHENTICATE(data) => Ok(self.handle_authenticate(data)),
            Command::Response(code, params) => self.handle_numeric(*code, params),
            Command::ERROR(reason) => Err(AuthError::ServerError(reason.clone())),
            _ => Ok(Vec::new()),
        }
    }

    fn has_credentials(&self) -> bool {
        self.registration.credentials.is_some()
    }

    fn cap_end(&mut self) -> AuthAction {
        self.phase = Phase::Registering;
        AuthAction::Send(Command::CAP(None, CapSubCommand::END, Vec::new()).into())
    }

    fn handle_cap(
        &mut self,
        sub: CapSubCommand,
        params: &[String],
    ) -> Result<Vec<AuthAction>, AuthError> {
        let caps = params.last().map(String::as_str).unwrap_or_default();
        match sub {
            CapSubCommand::LS if self.phase == Phase::CapNegotiation => {
                for cap in caps.split_whitespace() {
                    let name = cap.split('=').next().unwrap_or(cap);
                    self.available_caps.insert(name.to_ascii_lowercase());
                }
                // `CAP * LS * :...` means more lines follow
                if params.len() >= 2 && params[0] == "*" {
                    return Ok(Vec::new());
                }
                self.request_caps()
            }
            CapSubCommand::ACK => {
                let acked: HashSet<&str> = caps.split_whitespace().collect();
                debug!(caps = %caps, "capabilities acknowledged");
                if self.has_credentials() && acked.contains("sasl") {
                    self.phase = Phase::Authenticating;
                    return Ok(vec![AuthAction::Send(
                        Command::AUTHENTICATE("PLAIN".to_string()).into(),
                    )]);
                }
                if self.phase == Phase::CapNegotiation {
                    return Ok(vec![self.cap_end()]);
                }
                Ok(Vec::new())
            }
            CapSubCommand::NAK => {
                warn!(caps = %caps, "capabilities rejected");
                if self.has_credentials() {
                    return Err(AuthError::CapRejected(caps.to_string()));
                }
                Ok(vec![self.cap_end()])
            }
            _ => Ok(Vec::new()),
        }
    }

    fn request_caps(&mut self) -> Result<Vec<AuthAction>, AuthError> {
        let mut wanted: Vec<&str> = WANTED_CAPS
            .iter()
            .copied()
            .filter(|cap| self.available_caps.contains(*cap))
            .collect();

        if self.has_credentials() {
            if !self.available_caps.contains("sasl") {
                return Err(AuthError::SaslUnavailable);
            }
            wanted.push("sasl");
        }

        if wanted.is_empty() {
            return Ok(vec![self.cap_end()]);
        }
        Ok(vec![AuthAction::Send(
            Command::CAP(None, CapSubCommand::REQ, vec![wanted.join(" ")]).into(),
        )])
    }

    fn handle_authenticate(&mut self, data: &str) -> Vec<AuthAction> {
        if self.phase != Phase::Authenticating || data != "+" {
            return Vec::new();
        }
        let Some(creds) = &self.registration.credentials else {
            return Vec::new();
        };
        let encoded = encode_plain(&creds.account, creds.password());
        chunk_payload(&encoded)
            .into_iter()
            .map(|chunk| AuthAction::Send(Command::AUTHENTICATE(chunk).into()))
            .collect()
    }

    fn handle_numeric(
        &mut self,
        code: Response,
        params: &[String],
    ) -> Result<Vec<AuthAction>, AuthError> {
        let reason = params.last().cloned().unwrap_or_default();

        if code.is_sasl_failure() {
            return Err(AuthError::SaslFailed {
                code: code.code(),
                reason,
            });
        }

        if code == Response::RPL_LOGGEDIN {
            info!(account = ?self.registration.credentials.as_ref().map(|c| &c.account), "logged in");
            Ok(Vec::new())
        } else if code == Response::RPL_SASLSUCCESS || code == Response::ERR_SASLALREADY {
            self.sasl_done = true;
            Ok(vec![self.cap_end()])
        } else if code == Response::ERR_NICKNAMEINUSE {
            self.handle_nick_in_use()
        } else if code == Response::ERR_ERRONEUSNICKNAME {
            Err(AuthError::ErroneousNickname(self.nickname.clone()))
        } else if code == Response::RPL_WELCOME {
            self.handle_welcome(params)
        } else {
            Ok(Vec::new())
        }
    }

    fn handle_nick_in_use(&mut self) -> Result<Vec<AuthAction>, AuthError> {
        if self.nickname != self.registration.nickname {
            return Err(AuthError::NicknameUnavailable(self.nickname.clone()));
        }
        self.nickname = format!("{}_", self.registration.nickname);
        self.ghost_pending = true;
        warn!(
            nick = %self.registration.nickname,
            fallback = %self.nickname,
            "nickname in use, registering with fallback"
        );
        Ok(vec![AuthAction::Send(
            Command::NICK(self.nickname.clone()).into(),
        )])
    }

    fn handle_welcome(&mut self, params: &[String]) -> Result<Vec<AuthAction>, AuthError> {
        if self.has_credentials() && !self.sasl_done {
            return Err(AuthError::SaslUnavailable);
        }
        if let Some(nick) = params.first().filter(|n| !n.is_empty() && n.as_str() != "*") {
            self.nickname = nick.clone();
        }
        self.phase = Phase::Done;

        let mut actions = Vec::new();
        if self.ghost_pending && self.has_credentials() {
            let wanted = &self.registration.nickname;
            info!(nick = %wanted, "reclaiming nickname from ghost");
            actions.push(AuthAction::Send(Message::privmsg(
                "NickServ",
                format!("GHOST {wanted}"),
            )));
            actions.push(AuthAction::Send(Command::NICK(wanted.clone()).into()));
        }
        self.ghost_pending = false;
        actions.push(AuthAction::Complete {
            nickname: self.nickname.clone(),
        });
        Ok(actions)
    }
}
