#![allow(dead_code)]

use std::sync::Arc;

use provctl_audit::{EventStore, MemoryEventStore};
use provctl_core::{
    Cluster, ClusterSpec, ControlPlaneSpec, NetworkSpec, Resource, ResourceMetadata, State,
    WorkerPoolSpec,
};
use provctl_engine::{DriftDetector, Engine, SimulatedProvider};
use provctl_storage::{MemoryStateStore, StateManager};

pub const PROVIDER: &str = "sim";

pub fn worker_pool(name: &str, desired_size: u32) -> WorkerPoolSpec {
    WorkerPoolSpec {
        name: name.to_string(),
        instance_type: "m5.large".to_string(),
        min_size: 1,
        max_size: 10,
        desired_size,
        ..WorkerPoolSpec::default()
    }
}

pub fn cluster(id: &str, version: &str, pools: &[(&str, u32)]) -> Cluster {
    cluster_on(PROVIDER, id, version, pools)
}

pub fn cluster_on(provider: &str, id: &str, version: &str, pools: &[(&str, u32)]) -> Cluster {
    Resource {
        id: id.to_string(),
        metadata: ResourceMetadata::named(id),
        spec: ClusterSpec {
            provider: provider.to_string(),
            region: "us-west-2".to_string(),
            network: NetworkSpec {
                vpc_cidr: "10.0.0.0/16".to_string(),
                availability_zones: vec!["us-west-2a".to_string(), "us-west-2b".to_string()],
                ..NetworkSpec::default()
            },
            control_plane: ControlPlaneSpec {
                version: version.to_string(),
                count: 3,
                ha: true,
                ..ControlPlaneSpec::default()
            },
            worker_pools: pools
                .iter()
                .map(|(name, size)| worker_pool(name, *size))
                .collect(),
            ..ClusterSpec::default()
        },
        status: Default::default(),
    }
}

/// Desired state holding `clusters`, with their worker pools expanded into
/// node pools.
pub fn desired(clusters: impl IntoIterator<Item = Cluster>) -> State {
    let mut state = State::new();
    for cluster in clusters {
        state.insert_cluster(cluster);
    }
    state.expand_worker_pools();
    state
}

pub struct Harness {
    pub engine: Arc<Engine>,
    pub state: Arc<MemoryStateStore>,
    pub events: Arc<MemoryEventStore>,
    pub provider: Arc<SimulatedProvider>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_state(State::new())
    }

    pub fn with_state(initial: State) -> Self {
        let state = Arc::new(MemoryStateStore::new(initial));
        let events = Arc::new(MemoryEventStore::new());
        let provider = Arc::new(SimulatedProvider::new(PROVIDER));

        let engine = Engine::new(
            state.clone() as Arc<dyn StateManager>,
            events.clone() as Arc<dyn EventStore>,
        )
        .with_actor("test")
        .with_provider(provider.clone());

        Self {
            engine: Arc::new(engine),
            state,
            events,
            provider,
        }
    }

    pub fn detector(&self) -> DriftDetector {
        DriftDetector::new(Arc::clone(&self.engine))
    }

    pub async fn persisted(&self) -> State {
        self.state.get_state().await.expect("read persisted state")
    }
}
