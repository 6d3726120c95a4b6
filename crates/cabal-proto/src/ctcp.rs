//! CTCP (Client-to-Client Protocol) payloads.
//!
//! CTCP requests ride inside `PRIVMSG` bodies wrapped in `\x01`; replies go
//! back as `NOTICE`. Some clients drop the closing delimiter, so parsing
//! accepts a body that only starts with it.

use std::fmt;

pub(crate) const CTCP_DELIM: char = '\x01';

/// CTCP query kinds the bot cares about.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum CtcpKind {
    /// `/me` style action.
    Action,
    /// Client version query.
    Version,
    /// Liveness / latency probe.
    Ping,
    /// Local time query.
    Time,
    /// Supported CTCP list query.
    Clientinfo,
    /// Anything else, upper-cased.
    Unknown(String),
}

impl CtcpKind {
    /// Parse a CTCP sub-command name (case-insensitive).
    pub fn parse(name: &str) -> Self {
        match name.to_ascii_uppercase().as_str() {
            "ACTION" => Self::Action,
            "VERSION" => Self::Version,
            "PING" => Self::Ping,
            "TIME" => Self::Time,
            "CLIENTINFO" => Self::Clientinfo,
            other => Self::Unknown(other.to_owned()),
        }
    }

    /// Canonical upper-case name.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Action => "ACTION",
            Self::Version => "VERSION",
            Self::Ping => "PING",
            Self::Time => "TIME",
            Self::Clientinfo => "CLIENTINFO",
            Self::Unknown(s) => s,
        }
    }
}

impl fmt::Display for CtcpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed CTCP payload borrowing from the message body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ctcp<'a> {
    /// Sub-command.
    pub kind: CtcpKind,
    /// Everything after the sub-command, if non-empty.
    pub params: Option<&'a str>,
}

impl<'a> Ctcp<'a> {
    /// Parse a message body. Returns `None` when it is not CTCP.
    ///
    /// ```
    /// use cabal_proto::ctcp::{Ctcp, CtcpKind};
    ///
    /// let ctcp = Ctcp::parse("\x01PING 1700000000\x01").unwrap();
    /// assert_eq!(ctcp.kind, CtcpKind::Ping);
    /// assert_eq!(ctcp.params, Some("1700000000"));
    /// ```
    pub fn parse(text: &'a str) -> Option<Self> {
        let body = text.strip_prefix(CTCP_DELIM)?;
        let body = body.strip_suffix(CTCP_DELIM).unwrap_or(body);
        if body.is_empty() {
            return None;
        }

        let (command, params) = match body.split_once(' ') {
            Some((command, params)) => (command, Some(params).filter(|p| !p.is_empty())),
            None => (body, None),
        };

        Some(Self {
            kind: CtcpKind::parse(command),
            params,
        })
    }

    /// Whether a body is CTCP-framed.
    #[inline]
    pub fn is_ctcp(text: &str) -> bool {
        text.starts_with(CTCP_DELIM)
    }

    /// Build a reply of the given kind.
    pub fn reply(kind: CtcpKind, params: Option<&'a str>) -> Self {
        Self { kind, params }
    }

    /// Build an `ACTION`.
    pub fn action(text: &'a str) -> Self {
        Self {
            kind: CtcpKind::Action,
            params: Some(text),
        }
    }
}

impl fmt::Display for Ctcp<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", CTCP_DELIM, self.kind)?;
        if let Some(params) = self.params {
            write!(f, " {}", params)?;
        }
        write!(f, "{}", CTCP_DELIM)
    }
}
