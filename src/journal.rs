//! Append-only activity journal.
//!
//! Every record is one line, `<timestamp> -- <category> > <text>`, written
//! by a single task so sessions never interleave partial lines.

use chrono::Local;
use std::fmt;
use std::io;
use std::path::Path;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};

/// Journal record categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Action,
    Pm,
    Command,
    MsgTooLong,
    UnhandledException,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Action => "ACTION",
            Self::Pm => "PM",
            Self::Command => "COMMAND",
            Self::MsgTooLong => "MSG TOO LONG",
            Self::UnhandledException => "UNHANDLED EXCEPTION",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

enum JournalOp {
    Record(String),
    Flush(oneshot::Sender<()>),
}

/// Handle to the journal writer task. Cheap to clone.
#[derive(Clone, Debug)]
pub struct Journal {
    tx: mpsc::UnboundedSender<JournalOp>,
}

impl Journal {
    /// Open (or create) the journal file in append mode and start the writer.
    pub async fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        info!(path = %path.display(), "journal opened");
        Ok(Self::from_writer(file))
    }

    /// Start a writer task over any async sink.
    pub fn from_writer<W>(writer: W) -> Self
    where
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(write_loop(writer, rx));
        Self { tx }
    }

    /// Append one record. Never blocks; a dead writer only costs a warning.
    pub fn record(&self, category: Category, text: impl fmt::Display) {
        let text = single_line(&text.to_string());
        info!(target: "journal", category = %category, "{}", text);
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S%.6f");
        let line = format_line(&timestamp.to_string(), category, &text);
        if self.tx.send(JournalOp::Record(line)).is_err() {
            warn!(category = %category, "journal writer is gone, record dropped");
        }
    }

    /// Wait until every record sent so far has reached the writer.
    pub async fn flush(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.tx.send(JournalOp::Flush(ack_tx)).is_ok() {
            let _ = ack_rx.await;
        }
    }
}

/// Render one journal line, newline included.
pub fn format_line(timestamp: &str, category: Category, text: &str) -> String {
    format!("{timestamp} -- {category} > {text}\n")
}

fn single_line(text: &str) -> String {
    text.trim_end_matches(['\r', '\n'])
        .replace(['\r', '\n'], " ")
}

async fn write_loop<W>(mut writer: W, mut rx: mpsc::UnboundedReceiver<JournalOp>)
where
    W: AsyncWrite + Unpin,
{
    while let Some(op) = rx.recv().await {
        match op {
            JournalOp::Record(line) => {
                let result = async {
                    writer.write_all(line.as_bytes()).await?;
                    writer.flush().await
                }
                .await;
                if let Err(e) = result {
                    warn!(error = %e, "failed to write journal record");
                }
            }
            JournalOp::Flush(ack) => {
                let _ = ack.send(());
            }
        }
    }
}
