use std::collections::BTreeMap;

use provctl_core::{ResourceId, State};
use serde::Serialize;

use super::{ChangeAction, RestoreChange};

/// What restoring `target` over `current` would do to each resource.
///
/// Clusters first, then node pools. Within each kind: additions and
/// modifications in id order, then removals in id order. A resource counts
/// as modified when its spec differs.
pub fn compute_changes(target: &State, current: &State) -> Vec<RestoreChange> {
    let mut changes = diff_map(&target.clusters, &current.clusters, |c| c.resource_id(), |c| &c.spec);
    changes.extend(diff_map(
        &target.node_pools,
        &current.node_pools,
        |p| p.resource_id(),
        |p| &p.spec,
    ));
    changes
}

fn diff_map<T, S>(
    target: &BTreeMap<String, T>,
    current: &BTreeMap<String, T>,
    resource_id: impl Fn(&T) -> ResourceId,
    spec: impl Fn(&T) -> &S,
) -> Vec<RestoreChange>
where
    S: PartialEq + Serialize,
{
    let to_value = |r: &T| serde_json::to_value(spec(r)).ok();
    let mut changes = Vec::new();

    for (id, wanted) in target {
        match current.get(id) {
            None => changes.push(RestoreChange {
                action: ChangeAction::Add,
                resource: resource_id(wanted),
                before: None,
                after: to_value(wanted),
            }),
            Some(existing) if spec(existing) != spec(wanted) => changes.push(RestoreChange {
                action: ChangeAction::Modify,
                resource: resource_id(wanted),
                before: to_value(existing),
                after: to_value(wanted),
            }),
            Some(_) => {}
        }
    }

    for (id, existing) in current {
        if !target.contains_key(id) {
            changes.push(RestoreChange {
                action: ChangeAction::Remove,
                resource: resource_id(existing),
                before: to_value(existing),
                after: None,
            });
        }
    }

    changes
}
