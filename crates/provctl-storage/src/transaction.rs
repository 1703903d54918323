use provctl_core::State;

use crate::error::StorageError;
use crate::manager::StateManager;

/// A staged, all-or-nothing mutation of persisted state.
///
/// `begin` snapshots the committed state into a working copy. Nothing reaches
/// the store until `commit`; `rollback` (or dropping the transaction on an
/// early return) discards the working copy. A transaction cannot be left
/// open past its scope.
pub struct StateTransaction<'a> {
    store: &'a dyn StateManager,
    base: State,
    working: State,
    open: bool,
}

impl<'a> StateTransaction<'a> {
    pub async fn begin(store: &'a dyn StateManager) -> Result<Self, StorageError> {
        let base = store.get_state().await?;
        tracing::debug!(
            clusters = base.cluster_count(),
            node_pools = base.node_pool_count(),
            "state transaction opened"
        );
        Ok(Self {
            store,
            working: base.clone(),
            base,
            open: true,
        })
    }

    /// The working copy, including uncommitted changes.
    pub fn state(&self) -> &State {
        &self.working
    }

    pub fn state_mut(&mut self) -> &mut State {
        &mut self.working
    }

    /// The state as it was when the transaction began.
    pub fn base(&self) -> &State {
        &self.base
    }

    pub fn is_dirty(&self) -> bool {
        self.working != self.base
    }

    /// Persist the working copy. On error the store keeps its previous
    /// committed value.
    pub async fn commit(mut self) -> Result<(), StorageError> {
        self.open = false;
        if !self.is_dirty() {
            tracing::debug!("state transaction committed with no changes");
            return Ok(());
        }
        self.store.save_state(&self.working).await?;
        tracing::debug!(
            clusters = self.working.cluster_count(),
            node_pools = self.working.node_pool_count(),
            "state transaction committed"
        );
        Ok(())
    }

    pub fn rollback(mut self) {
        self.open = false;
        tracing::debug!("state transaction rolled back");
    }
}

impl Drop for StateTransaction<'_> {
    fn drop(&mut self) {
        if self.open {
            tracing::warn!("state transaction dropped without commit, changes discarded");
        }
    }
}
