use std::fmt;

use provctl_core::{ResourceId, ResourceRecord};
use serde::{Deserialize, Serialize};

/// One step of a plan, addressed to a single resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub resource: ResourceId,
    #[serde(rename = "action")]
    pub kind: ActionKind,
}

/// What to do, with the parameters that operation needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "parameters", rename_all = "snake_case")]
pub enum ActionKind {
    Create {
        desired: ResourceRecord,
    },
    Update {
        desired: ResourceRecord,
        changes: Vec<FieldChange>,
    },
    Delete,
    Noop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Create,
    Update,
    Delete,
    Noop,
}

impl ActionKind {
    pub fn action_type(&self) -> ActionType {
        match self {
            Self::Create { .. } => ActionType::Create,
            Self::Update { .. } => ActionType::Update,
            Self::Delete => ActionType::Delete,
            Self::Noop => ActionType::Noop,
        }
    }
}

impl Action {
    pub fn create(desired: ResourceRecord) -> Self {
        Self {
            resource: desired.resource_id(),
            kind: ActionKind::Create { desired },
        }
    }

    pub fn update(desired: ResourceRecord, changes: Vec<FieldChange>) -> Self {
        Self {
            resource: desired.resource_id(),
            kind: ActionKind::Update { desired, changes },
        }
    }

    pub fn delete(resource: ResourceId) -> Self {
        Self {
            resource,
            kind: ActionKind::Delete,
        }
    }

    pub fn action_type(&self) -> ActionType {
        self.kind.action_type()
    }
}

/// A single field that differs between desired and actual.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    pub field: String,
    pub expected: serde_json::Value,
    pub actual: serde_json::Value,
}

/// An ordered list of actions that moves actual state toward desired state.
///
/// A plan holds at most one action per `(kind, id)`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Plan {
    actions: Vec<Action>,
}

impl Plan {
    pub fn new() -> Self {
        Self::default()
    }

    /// A plan consisting of exactly one action.
    pub fn single(action: Action) -> Self {
        Self {
            actions: vec![action],
        }
    }

    /// Append an action, refusing a second action for the same resource.
    pub fn push(&mut self, action: Action) -> bool {
        if self.contains(&action.resource) {
            tracing::warn!(resource = %action.resource, "duplicate action dropped from plan");
            return false;
        }
        self.actions.push(action);
        true
    }

    pub fn contains(&self, resource: &ResourceId) -> bool {
        self.actions
            .iter()
            .any(|a| a.resource.same_resource(resource))
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn has_changes(&self) -> bool {
        self.actions
            .iter()
            .any(|a| a.action_type() != ActionType::Noop)
    }

    pub fn count(&self, action_type: ActionType) -> usize {
        self.actions
            .iter()
            .filter(|a| a.action_type() == action_type)
            .count()
    }
}

impl IntoIterator for Plan {
    type Item = Action;
    type IntoIter = std::vec::IntoIter<Action>;

    fn into_iter(self) -> Self::IntoIter {
        self.actions.into_iter()
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if !self.has_changes() {
            return writeln!(f, "No changes. Infrastructure is up-to-date.");
        }

        writeln!(f, "Infrastructure plan:")?;
        writeln!(f)?;
        for action in &self.actions {
            let resource = &action.resource;
            match &action.kind {
                ActionKind::Create { .. } => {
                    writeln!(f, "  + {} {} ({})", resource.kind, resource.name, resource.id)?;
                }
                ActionKind::Update { changes, .. } => {
                    writeln!(f, "  ~ {} {} ({})", resource.kind, resource.name, resource.id)?;
                    for change in changes {
                        writeln!(
                            f,
                            "      {}: {} -> {}",
                            change.field, change.actual, change.expected
                        )?;
                    }
                }
                ActionKind::Delete => {
                    writeln!(f, "  - {} {} ({})", resource.kind, resource.name, resource.id)?;
                }
                ActionKind::Noop => {}
            }
        }
        writeln!(f)?;
        writeln!(
            f,
            "Plan: {} to create, {} to update, {} to delete",
            self.count(ActionType::Create),
            self.count(ActionType::Update),
            self.count(ActionType::Delete)
        )
    }
}
