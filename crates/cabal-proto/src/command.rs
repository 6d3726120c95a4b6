//! IRC commands.
//!
//! The client only needs a small, typed subset of RFC 2812 plus the IRCv3
//! `CAP` and `AUTHENTICATE` commands. Numerics land in
//! [`Command::Response`] and anything else is preserved as
//! [`Command::Raw`].

use std::fmt::{self, Display, Formatter};

use crate::error::MessageParseError;
use crate::response::Response;

/// IRCv3 `CAP` subcommands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[allow(clippy::upper_case_acronyms)]
pub enum CapSubCommand {
    /// List capabilities offered by the server.
    LS,
    /// List capabilities currently enabled.
    LIST,
    /// Request capabilities.
    REQ,
    /// Server acknowledged a request.
    ACK,
    /// Server rejected a request.
    NAK,
    /// End negotiation.
    END,
    /// Server advertises new capabilities.
    NEW,
    /// Server withdraws capabilities.
    DEL,
}

impl CapSubCommand {
    /// Parse a subcommand keyword (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        let sub = match s.to_ascii_uppercase().as_str() {
            "LS" => Self::LS,
            "LIST" => Self::LIST,
            "REQ" => Self::REQ,
            "ACK" => Self::ACK,
            "NAK" => Self::NAK,
            "END" => Self::END,
            "NEW" => Self::NEW,
            "DEL" => Self::DEL,
            _ => return None,
        };
        Some(sub)
    }

    /// Keyword as sent on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::LS => "LS",
            Self::LIST => "LIST",
            Self::REQ => "REQ",
            Self::ACK => "ACK",
            Self::NAK => "NAK",
            Self::END => "END",
            Self::NEW => "NEW",
            Self::DEL => "DEL",
        }
    }
}

/// IRC command with its parameters.
#[derive(Clone, Debug, PartialEq)]
#[allow(clippy::upper_case_acronyms)]
pub enum Command {
    /// `PASS password`
    PASS(String),
    /// `NICK nickname`
    NICK(String),
    /// `USER username mode realname`
    USER(String, String, String),
    /// `QUIT [message]`
    QUIT(Option<String>),
    /// `JOIN channel [key]`
    JOIN(String, Option<String>),
    /// `PART channel [message]`
    PART(String, Option<String>),
    /// `KICK channel nick [comment]`
    KICK(String, String, Option<String>),
    /// `MODE target [modes and arguments]`
    MODE(String, Vec<String>),
    /// `PRIVMSG target text`
    PRIVMSG(String, String),
    /// `NOTICE target text`
    NOTICE(String, String),
    /// `PING token [server]`
    PING(String, Option<String>),
    /// `PONG token [server]`
    PONG(String, Option<String>),
    /// `ERROR message`
    ERROR(String),
    /// `CAP [target] subcommand [params]`
    CAP(Option<String>, CapSubCommand, Vec<String>),
    /// `AUTHENTICATE data`
    AUTHENTICATE(String),
    /// Numeric reply with its parameters (the first is usually our nick).
    Response(Response, Vec<String>),
    /// Any other command, kept verbatim.
    Raw(String, Vec<String>),
}

fn arg(args: &[&str], idx: usize) -> Option<String> {
    args.get(idx).map(|s| (*s).to_owned())
}

fn require(command: &str, args: &[&str], expected: usize) -> Result<(), MessageParseError> {
    if args.len() < expected {
        return Err(MessageParseError::NotEnoughArguments {
            command: command.to_owned(),
            expected,
            got: args.len(),
        });
    }
    Ok(())
}

impl Command {
    /// Build a command from its name and already-split parameters.
    pub fn new(cmd: &str, args: Vec<&str>) -> Result<Command, MessageParseError> {
        let upper = cmd.to_ascii_uppercase();
        let a = &args[..];

        let command = match upper.as_str() {
            "PASS" => {
                require(&upper, a, 1)?;
                Command::PASS(a[0].to_owned())
            }
            "NICK" => {
                require(&upper, a, 1)?;
                Command::NICK(a[0].to_owned())
            }
            "USER" => {
                require(&upper, a, 3)?;
                let realname = a.get(3).unwrap_or(&a[2]);
                Command::USER(a[0].to_owned(), a[1].to_owned(), (*realname).to_owned())
            }
            "QUIT" => Command::QUIT(arg(a, 0)),
            "JOIN" => {
                require(&upper, a, 1)?;
                Command::JOIN(a[0].to_owned(), arg(a, 1))
            }
            "PART" => {
                require(&upper, a, 1)?;
                Command::PART(a[0].to_owned(), arg(a, 1))
            }
            "KICK" => {
                require(&upper, a, 2)?;
                Command::KICK(a[0].to_owned(), a[1].to_owned(), arg(a, 2))
            }
            "MODE" => {
                require(&upper, a, 1)?;
                Command::MODE(
                    a[0].to_owned(),
                    a[1..].iter().map(|s| (*s).to_owned()).collect(),
                )
            }
            "PRIVMSG" => {
                require(&upper, a, 2)?;
                Command::PRIVMSG(a[0].to_owned(), a[1].to_owned())
            }
            "NOTICE" => {
                require(&upper, a, 2)?;
                Command::NOTICE(a[0].to_owned(), a[1].to_owned())
            }
            "PING" => {
                require(&upper, a, 1)?;
                Command::PING(a[0].to_owned(), arg(a, 1))
            }
            "PONG" => {
                require(&upper, a, 1)?;
                Command::PONG(a[0].to_owned(), arg(a, 1))
            }
            "ERROR" => Command::ERROR(arg(a, 0).unwrap_or_default()),
            "AUTHENTICATE" => {
                require(&upper, a, 1)?;
                Command::AUTHENTICATE(a[0].to_owned())
            }
            "CAP" => Self::parse_cap(a)?,
            _ if upper.len() == 3 && upper.bytes().all(|b| b.is_ascii_digit()) => {
                let code = upper.parse::<u16>().unwrap_or_default();
                Command::Response(
                    Response(code),
                    a.iter().map(|s| (*s).to_owned()).collect(),
                )
            }
            _ => Command::Raw(upper, a.iter().map(|s| (*s).to_owned()).collect()),
        };

        Ok(command)
    }

    /// `CAP` arrives as `CAP <target> <sub> ...` from servers and as
    /// `CAP <sub> ...` from clients.
    fn parse_cap(a: &[&str]) -> Result<Command, MessageParseError> {
        require("CAP", a, 1)?;
        if let Some(sub) = CapSubCommand::parse(a[0]) {
            let params = a[1..].iter().map(|s| (*s).to_owned()).collect();
            return Ok(Command::CAP(None, sub, params));
        }

        require("CAP", a, 2)?;
        match CapSubCommand::parse(a[1]) {
            Some(sub) => Ok(Command::CAP(
                Some(a[0].to_owned()),
                sub,
                a[2..].iter().map(|s| (*s).to_owned()).collect(),
            )),
            None => Ok(Command::Raw(
                "CAP".to_owned(),
                a.iter().map(|s| (*s).to_owned()).collect(),
            )),
        }
    }
}

/// Write middle parameters separated by spaces, then the last one as a
/// trailing parameter when it needs to be.
fn write_params(f: &mut Formatter<'_>, params: &[String]) -> fmt::Result {
    let Some((last, middle)) = params.split_last() else {
        return Ok(());
    };
    for p in middle {
        write!(f, " {}", p)?;
    }
    if last.is_empty() || last.contains(' ') || last.starts_with(':') {
        write!(f, " :{}", last)
    } else {
        write!(f, " {}", last)
    }
}

impl Display for Command {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Command::PASS(p) => write!(f, "PASS {}", p),
            Command::NICK(n) => write!(f, "NICK {}", n),
            Command::USER(u, m, r) => write!(f, "USER {} {} * :{}", u, m, r),
            Command::QUIT(Some(reason)) => write!(f, "QUIT :{}", reason),
            Command::QUIT(None) => f.write_str("QUIT"),
            Command::JOIN(chan, Some(key)) => write!(f, "JOIN {} {}", chan, key),
            Command::JOIN(chan, None) => write!(f, "JOIN {}", chan),
            Command::PART(chan, Some(reason)) => write!(f, "PART {} :{}", chan, reason),
            Command::PART(chan, None) => write!(f, "PART {}", chan),
            Command::KICK(chan, nick, Some(reason)) => {
                write!(f, "KICK {} {} :{}", chan, nick, reason)
            }
            Command::KICK(chan, nick, None) => write!(f, "KICK {} {}", chan, nick),
            Command::MODE(target, params) => {
                write!(f, "MODE {}", target)?;
                for p in params {
                    write!(f, " {}", p)?;
                }
                Ok(())
            }
            Command::PRIVMSG(target, text) => write!(f, "PRIVMSG {} :{}", target, text),
            Command::NOTICE(target, text) => write!(f, "NOTICE {} :{}", target, text),
            Command::PING(token, Some(server)) => write!(f, "PING {} :{}", token, server),
            Command::PING(token, None) => write!(f, "PING :{}", token),
            Command::PONG(token, Some(server)) => write!(f, "PONG {} :{}", token, server),
            Command::PONG(token, None) => write!(f, "PONG :{}", token),
            Command::ERROR(msg) => write!(f, "ERROR :{}", msg),
            Command::CAP(target, sub, params) => {
                f.write_str("CAP")?;
                if let Some(target) = target {
                    write!(f, " {}", target)?;
                }
                write!(f, " {}", sub.as_str())?;
                write_params(f, params)
            }
            Command::AUTHENTICATE(data) => write!(f, "AUTHENTICATE {}", data),
            Command::Response(code, params) => {
                write!(f, "{}", code)?;
                write_params(f, params)
            }
            Command::Raw(name, params) => {
                f.write_str(name)?;
                write_params(f, params)
            }
        }
    }
}
