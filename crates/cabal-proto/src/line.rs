//! Newline-delimited line codec for tokio.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::error::{ProtocolError, Result};
use crate::MAX_IRC_LINE_LEN;

/// Reads and writes `\n`-terminated lines, rejecting any line longer than
/// the configured limit. Inbound bytes that are not UTF-8 are replaced with
/// U+FFFD rather than failing the stream.
pub struct LineCodec {
    /// Index of next byte to check for newline.
    next_index: usize,
    max_len: usize,
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::with_max_len(MAX_IRC_LINE_LEN)
    }
}

impl LineCodec {
    /// Codec with a custom maximum line length in bytes.
    pub fn with_max_len(max_len: usize) -> Self {
        Self {
            next_index: 0,
            max_len,
        }
    }

    /// The maximum line length in bytes, CRLF included.
    pub fn max_len(&self) -> usize {
        self.max_len
    }
}

impl Decoder for LineCodec {
    type Item = String;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<String>> {
        if let Some(offset) = src[self.next_index..].iter().position(|b| *b == b'\n') {
            let line = src.split_to(self.next_index + offset + 1);
            self.next_index = 0;

            if line.len() > self.max_len {
                return Err(ProtocolError::MessageTooLong {
                    actual: line.len(),
                    limit: self.max_len,
                });
            }

            let data = match String::from_utf8(line.to_vec()) {
                Ok(data) => data,
                Err(e) => {
                    tracing::debug!(
                        byte_pos = e.utf8_error().valid_up_to(),
                        "replacing invalid UTF-8 in inbound line"
                    );
                    String::from_utf8_lossy(e.as_bytes()).into_owned()
                }
            };
            Ok(Some(data))
        } else {
            self.next_index = src.len();

            if src.len() > self.max_len {
                return Err(ProtocolError::MessageTooLong {
                    actual: src.len(),
                    limit: self.max_len,
                });
            }
            Ok(None)
        }
    }
}

impl Encoder<String> for LineCodec {
    type Error = ProtocolError;

    fn encode(&mut self, line: String, dst: &mut BytesMut) -> Result<()> {
        if line.len() > self.max_len {
            return Err(ProtocolError::MessageTooLong {
                actual: line.len(),
                limit: self.max_len,
            });
        }
        dst.extend_from_slice(line.as_bytes());
        Ok(())
    }
}
