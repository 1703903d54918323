use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ids::{ResourceId, ResourceKind};
use crate::models::cluster::Cluster;
use crate::models::node_pool::NodePool;

/// An append-only audit record, written once per dispatched action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: Uuid,
    pub timestamp: jiff::Timestamp,
    pub resource: ResourceId,
    pub actor: String,
    pub event: EventKind,
}

impl Event {
    pub fn new(resource: ResourceId, actor: impl Into<String>, event: EventKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: jiff::Timestamp::now(),
            resource,
            actor: actor.into(),
            event,
        }
    }

    pub fn event_type(&self) -> EventType {
        self.event.event_type()
    }
}

/// What happened, with a payload typed per event type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum EventKind {
    /// The resource as the provider reported it after creation.
    Created(ResourceRecord),
    /// The resource as the provider reported it after the update.
    Updated(ResourceRecord),
    Deleted,
    Failed { error: String },
}

impl EventKind {
    pub fn event_type(&self) -> EventType {
        match self {
            Self::Created(_) => EventType::Created,
            Self::Updated(_) => EventType::Updated,
            Self::Deleted => EventType::Deleted,
            Self::Failed { .. } => EventType::Failed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    Created,
    Updated,
    Deleted,
    Failed,
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Either kind of managed resource, tagged by `kind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum ResourceRecord {
    Cluster(Cluster),
    NodePool(NodePool),
}

impl ResourceRecord {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::Cluster(_) => ResourceKind::Cluster,
            Self::NodePool(_) => ResourceKind::NodePool,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Self::Cluster(c) => &c.id,
            Self::NodePool(p) => &p.id,
        }
    }

    pub fn resource_id(&self) -> ResourceId {
        match self {
            Self::Cluster(c) => c.resource_id(),
            Self::NodePool(p) => p.resource_id(),
        }
    }

    pub fn status_mut(&mut self) -> &mut crate::models::resource::ResourceStatus {
        match self {
            Self::Cluster(c) => &mut c.status,
            Self::NodePool(p) => &mut p.status,
        }
    }

    pub fn metadata_mut(&mut self) -> &mut crate::models::resource::ResourceMetadata {
        match self {
            Self::Cluster(c) => &mut c.metadata,
            Self::NodePool(p) => &mut p.metadata,
        }
    }
}
