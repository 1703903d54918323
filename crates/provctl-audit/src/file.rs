use std::io::Write;
use std::path::{Path, PathBuf};

use provctl_core::Event;
use tokio::sync::Mutex;

use crate::error::AuditError;
use crate::events::emit;
use crate::store::{BoxFuture, EventStore};

/// Event log stored as JSON lines, one event per line, append-only.
pub struct FileEventStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileEventStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the whole batch with a single `write_all` and one `sync_data`.
    async fn append(&self, events: &[Event]) -> Result<(), AuditError> {
        if events.is_empty() {
            return Ok(());
        }
        let mut batch = Vec::new();
        for event in events {
            serde_json::to_writer(&mut batch, event)?;
            batch.push(b'\n');
        }

        let _guard = self.write_lock.lock().await;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let committed_len = file.metadata()?.len();

        if let Err(e) = file.write_all(&batch).and_then(|()| file.sync_data()) {
            // Cut a torn batch back off so the log only ever holds whole batches.
            if let Err(truncate) = file.set_len(committed_len) {
                tracing::error!(
                    path = %self.path.display(),
                    error = %truncate,
                    "failed to truncate partially written event batch"
                );
            }
            return Err(e.into());
        }

        tracing::debug!(path = %self.path.display(), count = events.len(), "events appended");
        for event in events {
            emit(event);
        }
        Ok(())
    }

    async fn read_all(&self) -> Result<Vec<Event>, AuditError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let contents = std::fs::read_to_string(&self.path)?;
        contents
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(idx, line)| {
                serde_json::from_str(line).map_err(|source| AuditError::CorruptLog {
                    line: idx + 1,
                    source,
                })
            })
            .collect()
    }
}

impl EventStore for FileEventStore {
    fn record_events<'a>(&'a self, events: &'a [Event]) -> BoxFuture<'a, Result<(), AuditError>> {
        Box::pin(self.append(events))
    }

    fn events(&self) -> BoxFuture<'_, Result<Vec<Event>, AuditError>> {
        Box::pin(self.read_all())
    }
}
