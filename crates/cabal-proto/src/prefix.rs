//! Message source prefixes.
//!
//! A prefix names where a message came from: either a server name or a
//! `nick!user@host` mask. Parsing is lenient and total; a malformed mask
//! simply produces empty components.

use std::fmt;

/// Origin of an IRC message.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub enum Prefix {
    /// Server name (e.g. `tantalum.libera.chat`).
    ServerName(String),
    /// User mask: (nickname, username, hostname).
    Nickname(String, String, String),
}

impl Prefix {
    /// Parse a prefix string. Never fails.
    ///
    /// A bare name containing a dot is treated as a server; anything with
    /// `!` or `@` is a user mask.
    pub fn new_from_str(s: &str) -> Self {
        let (before_at, host) = match s.split_once('@') {
            Some((left, host)) => (left, Some(host)),
            None => (s, None),
        };
        let (nick, user) = match before_at.split_once('!') {
            Some((nick, user)) => (nick, Some(user)),
            None => (before_at, None),
        };

        if host.is_none() && user.is_none() && nick.contains('.') {
            return Prefix::ServerName(nick.to_owned());
        }

        Prefix::Nickname(
            nick.to_owned(),
            user.unwrap_or_default().to_owned(),
            host.unwrap_or_default().to_owned(),
        )
    }

    /// Build a user prefix from its components.
    pub fn new(nick: impl Into<String>, user: impl Into<String>, host: impl Into<String>) -> Self {
        Prefix::Nickname(nick.into(), user.into(), host.into())
    }

    /// Nickname, if this is a user prefix with a non-empty nick.
    pub fn nick(&self) -> Option<&str> {
        match self {
            Prefix::Nickname(nick, _, _) if !nick.is_empty() => Some(nick),
            _ => None,
        }
    }

    /// Username (ident), if present.
    pub fn user(&self) -> Option<&str> {
        match self {
            Prefix::Nickname(_, user, _) if !user.is_empty() => Some(user),
            _ => None,
        }
    }

    /// Hostname or cloak. For server prefixes this is the server name.
    pub fn host(&self) -> Option<&str> {
        match self {
            Prefix::ServerName(name) => Some(name),
            Prefix::Nickname(_, _, host) if !host.is_empty() => Some(host),
            _ => None,
        }
    }
}

impl From<&str> for Prefix {
    fn from(s: &str) -> Self {
        Prefix::new_from_str(s)
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Prefix::ServerName(name) => f.write_str(name),
            Prefix::Nickname(nick, user, host) => {
                f.write_str(nick)?;
                if !user.is_empty() {
                    write!(f, "!{}", user)?;
                }
                if !host.is_empty() {
                    write!(f, "@{}", host)?;
                }
                Ok(())
            }
        }
    }
}
