//! Framed IRC transport over plain TCP or client-side TLS.

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;
use tokio_util::codec::Framed;

use crate::error::Result;
use crate::irc::IrcCodec;
use crate::message::Message;

/// A connected IRC stream speaking [`Message`]s.
#[allow(clippy::large_enum_variant)]
pub enum Transport {
    /// Plain TCP.
    Tcp {
        /// The framed codec for TCP.
        framed: Framed<TcpStream, IrcCodec>,
    },
    /// TLS as a client, for servers on 6697.
    ClientTls {
        /// The framed codec for TLS.
        framed: Framed<TlsStream<TcpStream>, IrcCodec>,
    },
}

macro_rules! with_framed {
    ($self:expr, $framed:ident => $body:expr) => {
        match $self {
            Transport::Tcp { $framed } => $body,
            Transport::ClientTls { $framed } => $body,
        }
    };
}

impl Transport {
    /// Wrap a connected TCP stream.
    pub fn tcp(stream: TcpStream) -> Self {
        if let Err(e) = stream.set_nodelay(true) {
            tracing::warn!(error = %e, "failed to set TCP_NODELAY");
        }
        Self::Tcp {
            framed: Framed::new(stream, IrcCodec::default()),
        }
    }

    /// Wrap an established client TLS stream.
    pub fn client_tls(stream: TlsStream<TcpStream>) -> Self {
        Self::ClientTls {
            framed: Framed::new(stream, IrcCodec::default()),
        }
    }

    /// Whether the transport is encrypted.
    pub fn is_tls(&self) -> bool {
        matches!(self, Self::ClientTls { .. })
    }

    /// Outbound line limit enforced by the codec.
    pub fn send_limit(&self) -> usize {
        with_framed!(self, framed => framed.codec().send_limit())
    }

    /// Read the next message. `Ok(None)` means the peer closed the
    /// connection.
    pub async fn read_message(&mut self) -> Result<Option<Message>> {
        with_framed!(self, framed => framed.next().await.transpose())
    }

    /// Write and flush one message.
    ///
    /// [`crate::ProtocolError::MessageTooLong`] leaves the connection usable; any
    /// other error means the transport is broken.
    pub async fn write_message(&mut self, message: &Message) -> Result<()> {
        with_framed!(self, framed => framed.send(message.clone()).await)
    }

    /// Flush pending output and shut down the write side.
    pub async fn close(&mut self) -> Result<()> {
        with_framed!(self, framed => SinkExt::<Message>::close(framed).await)
    }
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tcp { .. } => f.write_str("Transport::Tcp"),
            Self::ClientTls { .. } => f.write_str("Transport::ClientTls"),
        }
    }
}
