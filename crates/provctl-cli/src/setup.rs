use std::sync::Arc;

use provctl_audit::{EventStore, FileEventStore};
use provctl_engine::snapshot::compute_changes;
use provctl_engine::{DriftDetector, Engine, RestoreChange, SimulatedProvider, SnapshotManager};
use provctl_storage::{FileStateStore, S3Mirror, StateManager};

use crate::config::{ProviderConfig, ProvctlConfig};

/// Everything a command needs, wired from one config.
pub struct Services {
    pub engine: Arc<Engine>,
    pub state: Arc<dyn StateManager>,
    pub events: Arc<dyn EventStore>,
    pub snapshots: Arc<SnapshotManager>,
}

impl Services {
    pub async fn build(config: &ProvctlConfig) -> eyre::Result<Self> {
        let mut store = FileStateStore::new(&config.state_path);
        if let Some(remote) = &config.remote_state {
            let mirror = S3Mirror::from_env(&remote.region, &remote.bucket, &remote.key).await;
            tracing::debug!(bucket = %remote.bucket, key = %remote.key, "state mirrored to S3");
            store = store.with_mirror(mirror);
        }
        let state: Arc<dyn StateManager> = Arc::new(store);
        let events: Arc<dyn EventStore> = Arc::new(FileEventStore::new(&config.event_log_path));

        let mut engine = Engine::new(Arc::clone(&state), Arc::clone(&events))
            .with_actor(config.actor.clone());
        for provider in &config.providers {
            match provider {
                ProviderConfig::Simulated {
                    name,
                    inventory_path,
                } => {
                    let simulated = SimulatedProvider::open(name.clone(), inventory_path)?;
                    engine.register_provider(Arc::new(simulated));
                }
            }
        }
        tracing::debug!(
            providers = engine.registry().len(),
            state_path = %config.state_path.display(),
            "engine ready"
        );

        let snapshots = SnapshotManager::new(&config.snapshot_dir, Arc::clone(&state))?
            .with_creator(config.actor.clone());

        Ok(Self {
            engine: Arc::new(engine),
            state,
            events,
            snapshots: Arc::new(snapshots),
        })
    }

    pub fn detector(&self) -> DriftDetector {
        DriftDetector::new(Arc::clone(&self.engine))
    }

    /// Compare state rebuilt from the whole event log with the persisted
    /// state. Each change is what the log says relative to the state file:
    /// `add` for a resource only the log knows, `remove` for one only the
    /// state holds. Empty when the two agree.
    pub async fn replay_divergence(&self) -> eyre::Result<Vec<RestoreChange>> {
        let replayed = self.events.replay_events(None).await?;
        let persisted = self.state.get_state().await?;
        Ok(compute_changes(&replayed, &persisted))
    }
}
