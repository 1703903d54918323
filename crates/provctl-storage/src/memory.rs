use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use provctl_core::State;
use tokio::sync::{Mutex, RwLock};

use crate::error::StorageError;
use crate::manager::{BoxFuture, StateLock, StateManager};

/// In-process state store.
#[derive(Default)]
pub struct MemoryStateStore {
    state: RwLock<State>,
    lock: Arc<Mutex<()>>,
    reject_saves: AtomicBool,
    saves: AtomicUsize,
}

impl MemoryStateStore {
    pub fn new(state: State) -> Self {
        Self {
            state: RwLock::new(state),
            ..Self::default()
        }
    }

    /// Make every subsequent save fail, leaving the stored state untouched.
    pub fn reject_saves(&self, reject: bool) {
        self.reject_saves.store(reject, Ordering::SeqCst);
    }

    /// Number of successful saves so far.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl StateManager for MemoryStateStore {
    fn get_state(&self) -> BoxFuture<'_, Result<State, StorageError>> {
        Box::pin(async move { Ok(self.state.read().await.clone()) })
    }

    fn save_state<'a>(&'a self, state: &'a State) -> BoxFuture<'a, Result<(), StorageError>> {
        Box::pin(async move {
            if self.reject_saves.load(Ordering::SeqCst) {
                return Err(StorageError::SaveRejected(
                    "memory store is rejecting saves".into(),
                ));
            }
            state.validate()?;
            *self.state.write().await = state.clone();
            self.saves.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }

    fn lock(&self) -> BoxFuture<'_, Result<StateLock, StorageError>> {
        let lock = Arc::clone(&self.lock);
        Box::pin(async move { Ok(StateLock::acquire(lock).await) })
    }
}
