//! provctl-core
//!
//! Pure domain types for the provisioner: resource identifiers, cluster and
//! node pool specs, lifecycle status, the `State` maps, and audit events.
//! No I/O here. Every other crate builds on these types.

pub mod error;
pub mod ids;
pub mod models;

pub use crate::error::CoreError;
pub use crate::ids::{node_pool_id, ResourceId, ResourceKind};
pub use crate::models::cluster::{
    Cluster, ClusterSpec, ControlPlaneSpec, ControlPlaneType, IdentitySpec, NetworkSpec, SpotConfig,
    Subnet, Taint, WorkerPoolSpec,
};
pub use crate::models::event::{Event, EventKind, EventType, ResourceRecord};
pub use crate::models::node_pool::{NodePool, NodePoolSpec};
pub use crate::models::resource::{
    Condition, ConditionType, Phase, Resource, ResourceMetadata, ResourceStatus,
};
pub use crate::models::state::State;
