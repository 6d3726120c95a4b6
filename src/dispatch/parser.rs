//! Command line parsing. Pure; no connection state involved.

use cabal_proto::irc_eq;

/// Whether the message must open with the bot's nick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Addressing {
    /// Channel traffic: `CabalBot: !hi`.
    Required,
    /// Private traffic: `!hi` or `CabalBot: !hi`.
    Optional,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    /// Lower-cased, prefix stripped.
    pub name: String,
    /// Everything after the name, trimmed. May be empty.
    pub args: String,
}

#[derive(Debug, Clone, Copy)]
pub struct CommandParser<'a> {
    nickname: &'a str,
    prefix: char,
}

impl<'a> CommandParser<'a> {
    pub fn new(nickname: &'a str, prefix: char) -> Self {
        Self { nickname, prefix }
    }

    /// Parse `text` into a command, or `None` if it is not one for us.
    ///
    /// ```
    /// use cabalbot::dispatch::{Addressing, CommandParser};
    ///
    /// let parser = CommandParser::new("CabalBot", '!');
    /// let cmd = parser.parse("CabalBot: !ca Example User", Addressing::Required).unwrap();
    /// assert_eq!(cmd.name, "ca");
    /// assert_eq!(cmd.args, "Example User");
    /// assert!(parser.parse("!hi", Addressing::Required).is_none());
    /// ```
    pub fn parse(&self, text: &str, addressing: Addressing) -> Option<ParsedCommand> {
        let mut rest = text.trim();

        match self.strip_address(rest) {
            Some(after) => rest = after,
            None if addressing == Addressing::Required => return None,
            None => {}
        }
        // `CabalBot: CabalBot: !hi`
        if let Some(after) = self.strip_address(rest) {
            rest = after;
        }

        let body = rest.strip_prefix(self.prefix)?;
        let (name, args) = match body.split_once(char::is_whitespace) {
            Some((name, args)) => (name, args.trim()),
            None => (body, ""),
        };
        if name.is_empty() {
            return None;
        }

        Some(ParsedCommand {
            name: name.to_lowercase(),
            args: args.to_string(),
        })
    }

    /// If `text` opens with our nick (optionally followed by `:` or `,`),
    /// return what follows it.
    fn strip_address<'t>(&self, text: &'t str) -> Option<&'t str> {
        let (first, rest) = match text.split_once(char::is_whitespace) {
            Some((first, rest)) => (first, rest.trim_start()),
            None => (text, ""),
        };
        let first = first
            .strip_suffix(':')
            .or_else(|| first.strip_suffix(','))
            .unwrap_or(first);
        irc_eq(first, self.nickname).then_some(rest)
    }
}
