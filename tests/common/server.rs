//! Mock IRC server.
//!
//! Accepts connections from the bot and lets a test script both sides of
//! the conversation line by line.

use cabal_proto::Message;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;

pub const SERVER_NAME: &str = "irc.mock.test";

/// A listening mock server on an ephemeral port.
pub struct MockServer {
    listener: TcpListener,
    port: u16,
}

impl MockServer {
    pub async fn bind() -> anyhow::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let port = listener.local_addr()?.port();
        Ok(Self { listener, port })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Wait for the bot to connect.
    pub async fn accept(&self) -> anyhow::Result<ServerConn> {
        self.accept_timeout(Duration::from_secs(10)).await
    }

    pub async fn accept_timeout(&self, dur: Duration) -> anyhow::Result<ServerConn> {
        let (stream, _) = timeout(dur, self.listener.accept()).await??;
        Ok(ServerConn::new(stream))
    }
}

/// Server side of one bot connection.
pub struct ServerConn {
    reader: BufReader<OwnedReadHalf>,
    writer: BufWriter<OwnedWriteHalf>,
}

impl ServerConn {
    fn new(stream: TcpStream) -> Self {
        let (read_half, write_half) = stream.into_split();
        Self {
            reader: BufReader::new(read_half),
            writer: BufWriter::new(write_half),
        }
    }

    /// Send a raw IRC line; CRLF is added when missing.
    pub async fn send_raw(&mut self, line: &str) -> anyhow::Result<()> {
        self.writer.write_all(line.as_bytes()).await?;
        if !line.ends_with("\r\n") {
            self.writer.write_all(b"\r\n").await?;
        }
        self.writer.flush().await?;
        Ok(())
    }

    /// Send a line that need not be valid UTF-8; CRLF is added.
    pub async fn send_bytes(&mut self, line: &[u8]) -> anyhow::Result<()> {
        self.writer.write_all(line).await?;
        self.writer.write_all(b"\r\n").await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Next line from the bot, CRLF stripped.
    pub async fn recv_line(&mut self) -> anyhow::Result<String> {
        self.recv_line_timeout(Duration::from_secs(5)).await
    }

    pub async fn recv_line_timeout(&mut self, dur: Duration) -> anyhow::Result<String> {
        let mut line = String::new();
        let read = timeout(dur, self.reader.read_line(&mut line)).await??;
        if read == 0 {
            anyhow::bail!("connection closed");
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    pub async fn recv(&mut self) -> anyhow::Result<Message> {
        let line = self.recv_line().await?;
        line.parse::<Message>()
            .map_err(|e| anyhow::anyhow!("parse error on {line:?}: {e}"))
    }

    /// Read lines until one starts with `prefix`; returns it. Lines before
    /// it are skipped.
    pub async fn expect(&mut self, prefix: &str) -> anyhow::Result<String> {
        loop {
            let line = self.recv_line().await?;
            if line.starts_with(prefix) {
                return Ok(line);
            }
        }
    }

    /// Read lines until the connection closes; returns them all.
    pub async fn drain_until_closed(&mut self) -> Vec<String> {
        let mut lines = Vec::new();
        while let Ok(line) = self.recv_line().await {
            lines.push(line);
        }
        lines
    }

    /// Read the opening burst up to `NICK`; returns the requested nick.
    pub async fn read_nick(&mut self) -> anyhow::Result<String> {
        let line = self.expect("NICK ").await?;
        Ok(line.trim_start_matches("NICK ").to_string())
    }

    /// Play the server side of CAP/SASL registration for `nick`. Returns
    /// every line the bot sent after the welcome (its JOINs first); each
    /// JOIN is echoed back.
    pub async fn register(&mut self, nick: &str) -> anyhow::Result<Vec<String>> {
        let requested = self.read_nick().await?;
        anyhow::ensure!(requested == nick, "expected NICK {nick}, got NICK {requested}");
        self.complete_sasl(nick).await
    }

    /// Registration for a session without SASL credentials.
    pub async fn register_plain(&mut self, nick: &str) -> anyhow::Result<Vec<String>> {
        let requested = self.read_nick().await?;
        anyhow::ensure!(requested == nick, "expected NICK {nick}, got NICK {requested}");
        self.complete_plain(nick).await
    }

    /// SASL registration, picking up after `NICK`.
    pub async fn complete_sasl(&mut self, nick: &str) -> anyhow::Result<Vec<String>> {
        self.expect("USER ").await?;
        self.send_raw(&format!(":{SERVER_NAME} CAP * LS :multi-prefix sasl"))
            .await?;
        self.expect("CAP REQ").await?;
        self.send_raw(&format!(":{SERVER_NAME} CAP * ACK :multi-prefix sasl"))
            .await?;
        self.expect("AUTHENTICATE PLAIN").await?;
        self.send_raw("AUTHENTICATE +").await?;
        self.expect("AUTHENTICATE ").await?;
        self.send_raw(&format!(
            ":{SERVER_NAME} 900 {nick} {nick}!{nick}@cabal/bot {nick} :You are now logged in as {nick}"
        ))
        .await?;
        self.send_raw(&format!(
            ":{SERVER_NAME} 903 {nick} :SASL authentication successful"
        ))
        .await?;
        self.expect("CAP END").await?;
        self.welcome(nick).await
    }

    /// Capability-only registration, picking up after `NICK`.
    pub async fn complete_plain(&mut self, nick: &str) -> anyhow::Result<Vec<String>> {
        self.expect("USER ").await?;
        self.send_raw(&format!(":{SERVER_NAME} CAP * LS :multi-prefix"))
            .await?;
        self.expect("CAP REQ").await?;
        self.send_raw(&format!(":{SERVER_NAME} CAP * ACK :multi-prefix"))
            .await?;
        self.expect("CAP END").await?;
        self.welcome(nick).await
    }

    /// Send `001` and collect what the bot says until it goes quiet.
    pub async fn welcome(&mut self, nick: &str) -> anyhow::Result<Vec<String>> {
        self.send_raw(&format!(
            ":{SERVER_NAME} 001 {nick} :Welcome to the Mock IRC Network {nick}"
        ))
        .await?;

        let mut lines = Vec::new();
        while let Ok(line) = self.recv_line_timeout(Duration::from_millis(300)).await {
            if let Some(channel) = line.strip_prefix("JOIN ") {
                self.send_raw(&format!(":{nick}!{nick}@cabal/bot JOIN {channel}"))
                    .await?;
            }
            lines.push(line);
        }
        Ok(lines)
    }
}
