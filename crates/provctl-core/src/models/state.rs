use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::ids::ResourceKind;
use crate::models::cluster::Cluster;
use crate::models::event::ResourceRecord;
use crate::models::node_pool::NodePool;

/// The complete set of managed resources, either desired or actual.
///
/// Ordered maps keep iteration and serialization deterministic, which the
/// planner's ordering and the snapshot checksum both rely on. Keys always
/// equal the contained resource's `id`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct State {
    #[serde(default)]
    pub clusters: BTreeMap<String, Cluster>,
    #[serde(default)]
    pub node_pools: BTreeMap<String, NodePool>,
}

impl State {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON state document and check its invariants.
    pub fn from_json(bytes: &[u8]) -> Result<Self, CoreError> {
        let state: State = serde_json::from_slice(bytes)?;
        state.validate()?;
        Ok(state)
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty() && self.node_pools.is_empty()
    }

    pub fn cluster_count(&self) -> usize {
        self.clusters.len()
    }

    pub fn node_pool_count(&self) -> usize {
        self.node_pools.len()
    }

    pub fn insert_cluster(&mut self, cluster: Cluster) -> Option<Cluster> {
        self.clusters.insert(cluster.id.clone(), cluster)
    }

    pub fn insert_node_pool(&mut self, pool: NodePool) -> Option<NodePool> {
        self.node_pools.insert(pool.id.clone(), pool)
    }

    pub fn with_cluster(mut self, cluster: Cluster) -> Self {
        self.insert_cluster(cluster);
        self
    }

    /// Insert or replace whichever resource the record holds.
    pub fn upsert(&mut self, record: ResourceRecord) {
        match record {
            ResourceRecord::Cluster(cluster) => {
                self.insert_cluster(cluster);
            }
            ResourceRecord::NodePool(pool) => {
                self.insert_node_pool(pool);
            }
        }
    }

    pub fn remove(&mut self, kind: ResourceKind, id: &str) -> Option<ResourceRecord> {
        match kind {
            ResourceKind::Cluster => self.clusters.remove(id).map(ResourceRecord::Cluster),
            ResourceKind::NodePool => self.node_pools.remove(id).map(ResourceRecord::NodePool),
        }
    }

    pub fn contains(&self, kind: ResourceKind, id: &str) -> bool {
        match kind {
            ResourceKind::Cluster => self.clusters.contains_key(id),
            ResourceKind::NodePool => self.node_pools.contains_key(id),
        }
    }

    /// The subset of this state owned by `provider`.
    pub fn for_provider(&self, provider: &str) -> State {
        State {
            clusters: self
                .clusters
                .iter()
                .filter(|(_, c)| c.spec.provider == provider)
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            node_pools: self
                .node_pools
                .iter()
                .filter(|(_, p)| p.spec.provider == provider)
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }

    /// Add a standalone node pool for every worker pool a cluster declares
    /// that isn't already tracked.
    pub fn expand_worker_pools(&mut self) {
        let pools: Vec<NodePool> = self
            .clusters
            .values()
            .flat_map(|cluster| {
                cluster
                    .spec
                    .worker_pools
                    .iter()
                    .map(move |pool| NodePool::from_worker_pool(cluster, pool))
            })
            .filter(|pool| !self.node_pools.contains_key(&pool.id))
            .collect();
        for pool in pools {
            self.insert_node_pool(pool);
        }
    }

    /// Check that every map key equals the id of the resource stored under it.
    pub fn validate(&self) -> Result<(), CoreError> {
        for (key, cluster) in &self.clusters {
            if *key != cluster.id {
                return Err(CoreError::KeyMismatch {
                    kind: ResourceKind::Cluster,
                    key: key.clone(),
                    id: cluster.id.clone(),
                });
            }
        }
        for (key, pool) in &self.node_pools {
            if *key != pool.id {
                return Err(CoreError::KeyMismatch {
                    kind: ResourceKind::NodePool,
                    key: key.clone(),
                    id: pool.id.clone(),
                });
            }
        }
        Ok(())
    }

    /// Node pools whose cluster is not part of this state.
    pub fn orphaned_node_pools(&self) -> Vec<&NodePool> {
        self.node_pools
            .values()
            .filter(|p| !self.clusters.contains_key(&p.spec.cluster_id))
            .collect()
    }
}
