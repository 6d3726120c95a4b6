//! [`Message`]-level codec built on [`LineCodec`].

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::error::{ProtocolError, Result};
use crate::line::LineCodec;
use crate::message::Message;
use crate::{MAX_IRC_LINE_LEN, MAX_TAGGED_LINE_LEN};

/// Tokio codec for IRC messages.
///
/// Inbound lines may carry up to 8191 bytes of IRCv3 tags on top of the
/// classic 512-byte body; outbound lines are held to the classic limit.
pub struct IrcCodec {
    inner: LineCodec,
    send_limit: usize,
}

impl Default for IrcCodec {
    fn default() -> Self {
        Self {
            inner: LineCodec::with_max_len(MAX_TAGGED_LINE_LEN),
            send_limit: MAX_IRC_LINE_LEN,
        }
    }
}

impl IrcCodec {
    /// Codec with a custom limit for outbound lines.
    pub fn with_send_limit(send_limit: usize) -> Self {
        Self {
            send_limit,
            ..Self::default()
        }
    }

    /// The outbound line limit in bytes, CRLF included.
    pub fn send_limit(&self) -> usize {
        self.send_limit
    }

    /// Serialize a message for the wire.
    ///
    /// Anything after an embedded line break is dropped so a single
    /// message can never smuggle a second command, and NUL is refused.
    pub fn sanitize(mut data: String) -> Result<String> {
        if let Some(pos) = data.find(['\r', '\n']) {
            data.truncate(pos);
            data.push_str("\r\n");
        }

        if let Some(ch) = data.chars().find(|c| *c == '\0') {
            return Err(ProtocolError::IllegalControlChar(ch));
        }

        Ok(data)
    }
}

impl Decoder for IrcCodec {
    type Item = Message;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Message>> {
        loop {
            match self.inner.decode(src)? {
                // Blank keepalive lines carry nothing.
                Some(line) if line.trim_end_matches(['\r', '\n']).is_empty() => continue,
                Some(line) => match line.parse::<Message>() {
                    Ok(msg) => return Ok(Some(msg)),
                    Err(e) => {
                        // One unparseable line must not tear down the stream.
                        tracing::warn!(error = %e, "skipping malformed line");
                        continue;
                    }
                },
                None => return Ok(None),
            }
        }
    }
}

impl Encoder<Message> for IrcCodec {
    type Error = ProtocolError;

    fn encode(&mut self, msg: Message, dst: &mut BytesMut) -> Result<()> {
        let sanitized = Self::sanitize(msg.to_string())?;
        if sanitized.len() > self.send_limit {
            return Err(ProtocolError::MessageTooLong {
                actual: sanitized.len(),
                limit: self.send_limit,
            });
        }
        self.inner.encode(sanitized, dst)
    }
}
