use std::path::{Path, PathBuf};
use std::sync::Arc;

use provctl_core::State;
use tokio::sync::Mutex;

use crate::error::StorageError;
use crate::manager::{BoxFuture, StateLock, StateManager};
use crate::remote::S3Mirror;

/// State persisted as a JSON file, optionally dual-written to S3.
///
/// Writes go to local disk first (atomic: tmp + rename) so state is never
/// lost even if the S3 upload fails. Reads prefer S3 when a mirror is
/// configured and fall back to the local copy.
pub struct FileStateStore {
    path: PathBuf,
    mirror: Option<S3Mirror>,
    lock: Arc<Mutex<()>>,
}

impl FileStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            mirror: None,
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn with_mirror(mut self, mirror: S3Mirror) -> Self {
        self.mirror = Some(mirror);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sidecar file locked by [`StateManager::lock`], e.g. `state.json.lock`.
    pub fn lock_path(&self) -> PathBuf {
        self.path.with_extension("json.lock")
    }

    async fn flush(&self, state: &State) -> Result<(), StorageError> {
        // 1. Atomic local write
        let json = serde_json::to_vec_pretty(state)?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, &json)?;
        std::fs::rename(&tmp_path, &self.path)?;

        tracing::debug!(path = %self.path.display(), "state flushed to local disk");

        // 2. Upload to S3
        if let Some(mirror) = &self.mirror {
            match mirror.save(state).await {
                Ok(etag) => {
                    tracing::debug!(
                        bucket = %mirror.bucket,
                        key = %mirror.key,
                        etag = %etag,
                        "state flushed to S3"
                    );
                }
                Err(e) => {
                    // Local write succeeded; the next load falls back to it.
                    tracing::warn!(
                        error = %e,
                        "failed to upload state to S3 (local copy is safe)"
                    );
                }
            }
        }

        Ok(())
    }

    async fn load(&self) -> Result<State, StorageError> {
        if let Some(mirror) = &self.mirror {
            match mirror.load().await {
                Ok(Some(state)) => {
                    tracing::debug!(bucket = %mirror.bucket, key = %mirror.key, "state loaded from S3");
                    return Ok(state);
                }
                Ok(None) => {
                    tracing::debug!("no state in S3, trying local");
                }
                Err(e) => {
                    tracing::warn!(error = %e, "failed to load state from S3, trying local");
                }
            }
        }

        if self.path.exists() {
            let json = std::fs::read(&self.path)?;
            let state = State::from_json(&json)?;
            tracing::debug!(path = %self.path.display(), "state loaded from local disk");
            return Ok(state);
        }

        tracing::debug!("no existing state found, starting fresh");
        Ok(State::default())
    }
}

impl StateManager for FileStateStore {
    fn get_state(&self) -> BoxFuture<'_, Result<State, StorageError>> {
        Box::pin(self.load())
    }

    fn save_state<'a>(&'a self, state: &'a State) -> BoxFuture<'a, Result<(), StorageError>> {
        Box::pin(self.flush(state))
    }

    fn lock(&self) -> BoxFuture<'_, Result<StateLock, StorageError>> {
        let lock = Arc::clone(&self.lock);
        Box::pin(StateLock::acquire_with_file(lock, self.lock_path()))
    }
}
