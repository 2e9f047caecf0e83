use std::path::Path;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::entry::AuditEntry;
use crate::writer::{AuditWriteError, AuditWriter};

/// Buffer between request handlers and the writer task.
const CHANNEL_BUFFER: usize = 1024;

/// How often pending writes are flushed while entries keep arriving.
const FLUSH_INTERVAL: Duration = Duration::from_secs(1);

/// Cloneable handle for submitting [`AuditEntry`] values.
///
/// A sink is either backed by a background writer task or disabled, in which
/// case entries are dropped.
#[derive(Clone)]
pub struct AuditSink {
    tx: Option<mpsc::Sender<AuditEntry>>,
}

impl AuditSink {
    /// Open the log at `path` and spawn the writer task.
    ///
    /// The task exits after a final flush once every clone of the sink has
    /// been dropped. Write failures are logged and the entry is skipped.
    pub async fn start(
        path: impl AsRef<Path>,
    ) -> Result<(Self, JoinHandle<()>), AuditWriteError> {
        let writer = AuditWriter::open(path).await?;
        let (tx, rx) = mpsc::channel(CHANNEL_BUFFER);
        let handle = tokio::spawn(drain(writer, rx));
        Ok((Self { tx: Some(tx) }, handle))
    }

    /// A sink that discards everything.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.tx.is_some()
    }

    /// Queue `entry` for writing, waiting if the buffer is full.
    pub async fn log(&self, entry: AuditEntry) {
        let Some(tx) = &self.tx else {
            return;
        };
        if let Err(err) = tx.send(entry).await {
            tracing::warn!(
                event_type = ?err.0.event_type,
                "audit writer has stopped; entry dropped"
            );
        }
    }
}

async fn drain(mut writer: AuditWriter, mut rx: mpsc::Receiver<AuditEntry>) {
    let mut ticker = tokio::time::interval(FLUSH_INTERVAL);
    let mut dirty = false;

    loop {
        tokio::select! {
            maybe_entry = rx.recv() => {
                let Some(entry) = maybe_entry else {
                    break;
                };
                match writer.write(&entry).await {
                    Ok(()) => dirty = true,
                    Err(err) => tracing::error!(%err, "failed to write audit entry"),
                }
            }
            _ = ticker.tick(), if dirty => {
                match writer.flush().await {
                    Ok(()) => dirty = false,
                    Err(err) => tracing::error!(%err, "periodic audit flush failed"),
                }
            }
        }
    }

    if dirty {
        if let Err(err) = writer.flush().await {
            tracing::error!(%err, "final audit flush failed");
        }
    }
    tracing::debug!("audit writer stopped");
}
