//! Owned IRC messages.

mod parse;

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use crate::chan::ChannelExt;
use crate::command::Command;
use crate::error::{MessageParseError, ProtocolError};
use crate::prefix::Prefix;

use self::parse::ParsedLine;

/// An IRCv3 message tag: key and optional (unescaped) value.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Tag(pub String, pub Option<String>);

/// An owned IRC message.
///
/// ```
/// use cabal_proto::Message;
///
/// let msg = Message::privmsg("#cabal", "Hello Alice! I saw your message!");
/// assert_eq!(msg.to_string(), "PRIVMSG #cabal :Hello Alice! I saw your message!\r\n");
/// ```
#[derive(Clone, PartialEq, Debug)]
pub struct Message {
    /// IRCv3 message tags.
    pub tags: Option<Vec<Tag>>,
    /// Message source.
    pub prefix: Option<Prefix>,
    /// Command and parameters.
    pub command: Command,
}

impl Message {
    /// Build a `PRIVMSG`.
    pub fn privmsg(target: impl Into<String>, text: impl Into<String>) -> Self {
        Command::PRIVMSG(target.into(), text.into()).into()
    }

    /// Build a `NOTICE`.
    pub fn notice(target: impl Into<String>, text: impl Into<String>) -> Self {
        Command::NOTICE(target.into(), text.into()).into()
    }

    /// Build a `JOIN` without a key.
    pub fn join(channel: impl Into<String>) -> Self {
        Command::JOIN(channel.into(), None).into()
    }

    /// Build a `PING` with the given token.
    pub fn ping(token: impl Into<String>) -> Self {
        Command::PING(token.into(), None).into()
    }

    /// Build a `QUIT` carrying a reason.
    pub fn quit(reason: impl Into<String>) -> Self {
        Command::QUIT(Some(reason.into())).into()
    }

    /// Attach a source prefix.
    #[must_use]
    pub fn with_prefix(mut self, prefix: Prefix) -> Self {
        self.prefix = Some(prefix);
        self
    }

    /// Nickname of the sender, when the source is a user.
    pub fn source_nickname(&self) -> Option<&str> {
        self.prefix.as_ref().and_then(Prefix::nick)
    }

    /// Where a reply should go: the channel for channel messages,
    /// otherwise the sender.
    pub fn response_target(&self) -> Option<&str> {
        match &self.command {
            Command::PRIVMSG(target, _) | Command::NOTICE(target, _)
                if target.is_channel_name() =>
            {
                Some(target)
            }
            _ => self.source_nickname(),
        }
    }

    /// Look up a tag value by key.
    pub fn tag_value(&self, key: &str) -> Option<&str> {
        self.tags
            .as_ref()?
            .iter()
            .find(|Tag(k, _)| k == key)
            .and_then(|Tag(_, v)| v.as_deref())
    }

    /// Serialized length on the wire, CRLF included.
    pub fn wire_len(&self) -> usize {
        self.to_string().len()
    }
}

impl From<Command> for Message {
    fn from(command: Command) -> Self {
        Message {
            tags: None,
            prefix: None,
            command,
        }
    }
}

fn unescape_tag_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some(':') => out.push(';'),
            Some('s') => out.push(' '),
            Some('r') => out.push('\r'),
            Some('n') => out.push('\n'),
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

fn escape_tag_value(f: &mut Formatter<'_>, value: &str) -> fmt::Result {
    for c in value.chars() {
        match c {
            ';' => f.write_str("\\:")?,
            ' ' => f.write_str("\\s")?,
            '\\' => f.write_str("\\\\")?,
            '\r' => f.write_str("\\r")?,
            '\n' => f.write_str("\\n")?,
            c => write!(f, "{}", c)?,
        }
    }
    Ok(())
}

fn parse_tags(raw: &str) -> Vec<Tag> {
    raw.split(';')
        .filter(|s| !s.is_empty())
        .map(|tag| match tag.split_once('=') {
            Some((key, value)) => Tag(key.to_owned(), Some(unescape_tag_value(value))),
            None => Tag(tag.to_owned(), None),
        })
        .collect()
}

impl FromStr for Message {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Message, Self::Err> {
        let invalid = |cause| ProtocolError::InvalidMessage {
            string: s.to_owned(),
            cause,
        };

        if s.trim_end_matches(['\r', '\n']).is_empty() {
            return Err(invalid(MessageParseError::EmptyMessage));
        }

        let line = ParsedLine::parse(s)
            .map_err(|position| invalid(MessageParseError::InvalidCommand { position }))?;

        let command = Command::new(line.command, line.params.to_vec()).map_err(invalid)?;

        Ok(Message {
            tags: line.tags.map(parse_tags),
            prefix: line.prefix.map(Prefix::new_from_str),
            command,
        })
    }
}

impl Display for Message {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if let Some(tags) = &self.tags {
            f.write_str("@")?;
            for (i, Tag(key, value)) in tags.iter().enumerate() {
                if i > 0 {
                    f.write_str(";")?;
                }
                f.write_str(key)?;
                if let Some(value) = value {
                    f.write_str("=")?;
                    escape_tag_value(f, value)?;
                }
            }
            f.write_str(" ")?;
        }

        if let Some(prefix) = &self.prefix {
            write!(f, ":{} ", prefix)?;
        }

        write!(f, "{}\r\n", self.command)
    }
}
