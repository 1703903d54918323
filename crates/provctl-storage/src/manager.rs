use std::future::Future;
use std::pin::Pin;
use std::path::PathBuf;
use std::sync::Arc;

use provctl_core::State;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::error::StorageError;
use crate::lockfile::FileLock;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The only persistence boundary the engine writes through.
///
/// Methods return boxed futures for dyn compatibility.
pub trait StateManager: Send + Sync {
    /// Read the last committed state. A store that has never been written
    /// returns an empty `State`.
    fn get_state(&self) -> BoxFuture<'_, Result<State, StorageError>>;

    /// Replace the persisted state. Either the whole document is written or
    /// the previous one is left in place.
    fn save_state<'a>(&'a self, state: &'a State) -> BoxFuture<'a, Result<(), StorageError>>;

    /// Acquire the advisory state lock. Held for the full read-compare-write
    /// span of any operation that writes state back; released on drop.
    fn lock(&self) -> BoxFuture<'_, Result<StateLock, StorageError>>;
}

/// Guard for the advisory state lock.
///
/// Always holds the store's in-process mutex. File-backed stores also hold
/// an exclusive lock on a sidecar file so other processes sharing the state
/// file wait too.
#[must_use = "the state lock is released as soon as the guard is dropped"]
pub struct StateLock {
    _file: Option<FileLock>,
    _guard: OwnedMutexGuard<()>,
}

impl StateLock {
    pub async fn acquire(lock: Arc<Mutex<()>>) -> Self {
        let guard = lock.lock_owned().await;
        tracing::debug!("state lock acquired");
        Self {
            _file: None,
            _guard: guard,
        }
    }

    /// Take the in-process mutex, then the file lock at `path`.
    pub async fn acquire_with_file(
        lock: Arc<Mutex<()>>,
        path: PathBuf,
    ) -> Result<Self, StorageError> {
        let guard = lock.lock_owned().await;
        let file = FileLock::acquire(path).await?;
        tracing::debug!(path = %file.path().display(), "state lock acquired");
        Ok(Self {
            _file: Some(file),
            _guard: guard,
        })
    }

    /// Release the lock explicitly.
    pub fn unlock(self) {}
}

impl Drop for StateLock {
    fn drop(&mut self) {
        tracing::debug!("state lock released");
    }
}
