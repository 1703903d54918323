use serde::{Deserialize, Serialize};

use crate::ids::{node_pool_id, ResourceId};
use crate::models::cluster::{Cluster, WorkerPoolSpec};
use crate::models::resource::{Resource, ResourceMetadata, ResourceStatus};

pub type NodePool = Resource<NodePoolSpec>;

/// A worker pool tracked as a resource of its own, bound to its cluster.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodePoolSpec {
    pub cluster_id: String,
    pub provider: String,
    #[serde(flatten)]
    pub pool: WorkerPoolSpec,
}

impl NodePool {
    /// Materialize a standalone node pool from a pool declared in `cluster`.
    pub fn from_worker_pool(cluster: &Cluster, pool: &WorkerPoolSpec) -> Self {
        let mut metadata = ResourceMetadata::named(&pool.name);
        metadata.labels = pool.labels.clone();
        Resource {
            id: node_pool_id(&cluster.id, &pool.name),
            metadata,
            spec: NodePoolSpec {
                cluster_id: cluster.id.clone(),
                provider: cluster.spec.provider.clone(),
                pool: pool.clone(),
            },
            status: ResourceStatus::default(),
        }
    }

    pub fn resource_id(&self) -> ResourceId {
        ResourceId::node_pool(&self.spec.provider, &self.id, &self.metadata.name)
    }
}
