use std::fmt;

use serde::{Deserialize, Serialize};

/// The two kinds of entity the provisioner manages.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceKind {
    Cluster,
    NodePool,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cluster => "Cluster",
            Self::NodePool => "NodePool",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Composite key for addressing a managed resource.
///
/// `(kind, id)` is unique across live resources; `provider` routes actions to
/// the right cloud and `name` is carried for display.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct ResourceId {
    pub provider: String,
    pub kind: ResourceKind,
    pub id: String,
    pub name: String,
}

impl ResourceId {
    pub fn cluster(
        provider: impl Into<String>,
        id: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            provider: provider.into(),
            kind: ResourceKind::Cluster,
            id: id.into(),
            name: name.into(),
        }
    }

    pub fn node_pool(
        provider: impl Into<String>,
        id: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            provider: provider.into(),
            kind: ResourceKind::NodePool,
            id: id.into(),
            name: name.into(),
        }
    }

    /// Same `(kind, id)` regardless of provider or display name.
    pub fn same_resource(&self, other: &ResourceId) -> bool {
        self.kind == other.kind && self.id == other.id
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}/{}", self.provider, self.kind, self.id)
    }
}

/// Node pools are addressed as `<cluster id>/<pool name>`.
pub fn node_pool_id(cluster_id: &str, pool_name: &str) -> String {
    format!("{cluster_id}/{pool_name}")
}
