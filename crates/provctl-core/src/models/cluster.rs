use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ids::{node_pool_id, ResourceId};
use crate::models::resource::Resource;

pub type Cluster = Resource<ClusterSpec>;

/// Desired configuration of a cluster. Replaced wholesale by a new desired
/// state, never edited in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSpec {
    pub provider: String,
    pub region: String,
    #[serde(default)]
    pub network: NetworkSpec,
    pub control_plane: ControlPlaneSpec,
    #[serde(default)]
    pub worker_pools: Vec<WorkerPoolSpec>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub config: BTreeMap<String, serde_json::Value>,
}

impl ClusterSpec {
    pub fn worker_pool(&self, name: &str) -> Option<&WorkerPoolSpec> {
        self.worker_pools.iter().find(|p| p.name == name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkSpec {
    #[serde(default)]
    pub vpc_cidr: String,
    #[serde(default)]
    pub availability_zones: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subnets: Vec<Subnet>,
    #[serde(default)]
    pub nat_gateway: bool,
    #[serde(default)]
    pub private_cluster: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subnet {
    pub name: String,
    pub cidr: String,
    pub availability_zone: String,
    #[serde(default)]
    pub public: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlPlaneSpec {
    #[serde(rename = "type", default)]
    pub control_plane_type: ControlPlaneType,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_type: Option<String>,
    #[serde(default)]
    pub count: u32,
    #[serde(default)]
    pub ha: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<IdentitySpec>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ControlPlaneType {
    /// EKS, AKS
    #[default]
    Managed,
    /// VM based
    SelfManaged,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentitySpec {
    #[serde(rename = "type")]
    pub identity_type: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub service_accounts: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_arn: Option<String>,
}

/// A worker pool as declared inside a cluster spec.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerPoolSpec {
    pub name: String,
    pub instance_type: String,
    pub min_size: u32,
    pub max_size: u32,
    #[serde(default)]
    pub desired_size: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spot: Option<SpotConfig>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub taints: Vec<Taint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpotConfig {
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_price: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Taint {
    pub key: String,
    pub value: String,
    pub effect: String,
}

impl Cluster {
    pub fn resource_id(&self) -> ResourceId {
        ResourceId::cluster(&self.spec.provider, &self.id, &self.metadata.name)
    }

    /// Ids of the node pools this cluster declares.
    pub fn node_pool_ids(&self) -> impl Iterator<Item = String> + '_ {
        self.spec
            .worker_pools
            .iter()
            .map(|p| node_pool_id(&self.id, &p.name))
    }
}
