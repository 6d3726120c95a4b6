//! # cabal-proto
//!
//! The slice of the IRC protocol CabalBot speaks: message parsing and
//! serialization, numeric replies, `nick!user@host` prefixes, CTCP, SASL
//! PLAIN, RFC 1459 case mapping and a tokio transport that enforces the
//! 512-byte line limit in both directions.
//!
//! ```rust
//! use cabal_proto::{Command, Message};
//!
//! let msg: Message = ":Alice!alice@user/alice PRIVMSG #cabal :CabalBot: !hi"
//!     .parse()
//!     .unwrap();
//! assert_eq!(msg.source_nickname(), Some("Alice"));
//! assert!(matches!(msg.command, Command::PRIVMSG(_, _)));
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod casemap;
pub mod chan;
pub mod command;
pub mod ctcp;
pub mod error;
pub mod message;
pub mod prefix;
pub mod response;
pub mod sasl;

#[cfg(feature = "tokio")]
pub mod irc;
#[cfg(feature = "tokio")]
pub mod line;
#[cfg(feature = "tokio")]
pub mod transport;

pub use self::casemap::{irc_eq, irc_lower_char, irc_to_lower};
pub use self::chan::ChannelExt;
pub use self::command::{CapSubCommand, Command};
pub use self::ctcp::{Ctcp, CtcpKind};
pub use self::error::{MessageParseError, ProtocolError};
pub use self::message::Message;
pub use self::prefix::Prefix;
pub use self::response::Response;
pub use self::sasl::{chunk_payload, encode_plain, SASL_CHUNK_SIZE};

#[cfg(feature = "tokio")]
pub use self::irc::IrcCodec;
#[cfg(feature = "tokio")]
pub use self::transport::Transport;

/// Maximum length of an IRC line in bytes, including the trailing CRLF.
pub const MAX_IRC_LINE_LEN: usize = 512;

/// Maximum inbound line length once IRCv3 message tags are allowed.
pub const MAX_TAGGED_LINE_LEN: usize = MAX_IRC_LINE_LEN + 8191;
