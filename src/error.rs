//! Session-level error hierarchy.
//!
//! Protocol errors come from `cabal_proto`; this module decides which
//! failures a session recovers from and which end the process.

use cabal_proto::ProtocolError;
use std::io;
use thiserror::Error;

use crate::session::auth::AuthError;

/// Errors that end one connection attempt or the whole session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("authentication failed: {0}")]
    Authentication(#[from] AuthError),

    #[error("transport error: {0}")]
    Transport(#[from] ProtocolError),

    #[error("connection failed: {0}")]
    Connect(#[source] io::Error),

    #[error("TLS setup failed: {0}")]
    Tls(String),

    #[error("connection closed by server")]
    Closed,

    #[error("server error: {0}")]
    ServerError(String),

    #[error("no PONG after {missed} keepalive probes")]
    KeepaliveTimeout { missed: u32 },

    #[error("registration timed out")]
    RegistrationTimeout,

    #[error("gave up after {attempts} reconnect attempts")]
    RetriesExhausted { attempts: u32 },
}

impl SessionError {
    /// Whether the session should reconnect rather than give up.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Authentication(_) | Self::Tls(_) | Self::RetriesExhausted { .. } => false,
            Self::Transport(_)
            | Self::Connect(_)
            | Self::Closed
            | Self::ServerError(_)
            | Self::KeepaliveTimeout { .. }
            | Self::RegistrationTimeout => true,
        }
    }

    /// Static label for structured logs.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Authentication(_) => "authentication",
            Self::Transport(_) => "transport",
            Self::Connect(_) => "connect",
            Self::Tls(_) => "tls",
            Self::Closed => "closed",
            Self::ServerError(_) => "server_error",
            Self::KeepaliveTimeout { .. } => "keepalive_timeout",
            Self::RegistrationTimeout => "registration_timeout",
            Self::RetriesExhausted { .. } => "retries_exhausted",
        }
    }
}
