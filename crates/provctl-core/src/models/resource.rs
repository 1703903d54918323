use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A managed entity: identity, metadata, desired spec, and observed status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource<T> {
    pub id: String,
    pub metadata: ResourceMetadata,
    pub spec: T,
    #[serde(default)]
    pub status: ResourceStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceMetadata {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<jiff::Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<jiff::Timestamp>,
}

impl ResourceMetadata {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Observed lifecycle status. Written only by the reconciliation engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceStatus {
    pub phase: Phase,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ResourceStatus {
    /// Set (or replace) the condition of the given type.
    pub fn set_condition(&mut self, condition: Condition) {
        match self
            .conditions
            .iter_mut()
            .find(|c| c.condition_type == condition.condition_type)
        {
            Some(existing) => *existing = condition,
            None => self.conditions.push(condition),
        }
    }

    pub fn condition(&self, condition_type: ConditionType) -> Option<&Condition> {
        self.conditions
            .iter()
            .find(|c| c.condition_type == condition_type)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    #[default]
    Pending,
    Provisioning,
    Running,
    Updating,
    Deleting,
    /// Never persisted by a failed apply: the transaction rolls back, so the
    /// resource keeps its last committed phase and the failure is recorded
    /// as a `Failed` audit event instead.
    Failed,
}

impl Phase {
    /// Lifecycle edges the engine is allowed to take.
    ///
    /// Pending → Provisioning/Updating/Deleting → Running (deletion ends by
    /// removing the resource from state). `Failed` is reachable from every
    /// in-flight phase, and a failed resource may be retried.
    pub fn can_transition_to(self, next: Phase) -> bool {
        use Phase::*;
        match (self, next) {
            (Pending, Provisioning | Updating | Deleting) => true,
            (Running, Updating | Deleting) => true,
            (Provisioning | Updating, Running) => true,
            (Failed, Provisioning | Updating | Deleting) => true,
            (Pending | Provisioning | Updating | Deleting | Running, Failed) => true,
            _ => false,
        }
    }

    /// Phases during which a provider call is outstanding.
    pub fn is_in_flight(self) -> bool {
        matches!(self, Phase::Provisioning | Phase::Updating | Phase::Deleting)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(rename = "type")]
    pub condition_type: ConditionType,
    pub status: bool,
    pub last_transition_time: jiff::Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Condition {
    pub fn new(condition_type: ConditionType, status: bool) -> Self {
        Self {
            condition_type,
            status,
            last_transition_time: jiff::Timestamp::now(),
            reason: None,
            message: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConditionType {
    Ready,
    NetworkReady,
    ControlPlaneReady,
    NodesReady,
}
