use provctl_core::{Cluster, NodePool, ResourceRecord, State};
use serde_json::{json, Value};

use crate::plan::{Action, FieldChange, Plan};

/// Compares one field of a resource between desired and actual.
pub struct FieldCheck<T> {
    field: &'static str,
    extract: fn(&T) -> Value,
}

impl<T> FieldCheck<T> {
    pub const fn new(field: &'static str, extract: fn(&T) -> Value) -> Self {
        Self { field, extract }
    }

    pub fn field(&self) -> &'static str {
        self.field
    }

    pub fn compare(&self, desired: &T, actual: &T) -> Option<FieldChange> {
        let expected = (self.extract)(desired);
        let found = (self.extract)(actual);
        (expected != found).then(|| FieldChange {
            field: self.field.to_string(),
            expected,
            actual: found,
        })
    }
}

/// The fields whose divergence makes the planner emit an Update.
pub struct UpdatePolicy {
    cluster: Vec<FieldCheck<Cluster>>,
    node_pool: Vec<FieldCheck<NodePool>>,
}

impl Default for UpdatePolicy {
    fn default() -> Self {
        Self {
            cluster: vec![FieldCheck::new("controlPlane.version", |c: &Cluster| {
                json!(c.spec.control_plane.version)
            })],
            node_pool: vec![
                FieldCheck::new("instanceType", |p: &NodePool| {
                    json!(p.spec.pool.instance_type)
                }),
                FieldCheck::new("minSize", |p: &NodePool| json!(p.spec.pool.min_size)),
                FieldCheck::new("maxSize", |p: &NodePool| json!(p.spec.pool.max_size)),
                FieldCheck::new("desiredSize", |p: &NodePool| {
                    json!(p.spec.pool.desired_size)
                }),
            ],
        }
    }
}

impl UpdatePolicy {
    /// A policy with no checks: existing resources are never updated.
    pub fn empty() -> Self {
        Self {
            cluster: Vec::new(),
            node_pool: Vec::new(),
        }
    }

    pub fn with_cluster_check(mut self, check: FieldCheck<Cluster>) -> Self {
        self.cluster.push(check);
        self
    }

    pub fn with_node_pool_check(mut self, check: FieldCheck<NodePool>) -> Self {
        self.node_pool.push(check);
        self
    }

    pub fn cluster_changes(&self, desired: &Cluster, actual: &Cluster) -> Vec<FieldChange> {
        self.cluster
            .iter()
            .filter_map(|check| check.compare(desired, actual))
            .collect()
    }

    pub fn node_pool_changes(&self, desired: &NodePool, actual: &NodePool) -> Vec<FieldChange> {
        self.node_pool
            .iter()
            .filter_map(|check| check.compare(desired, actual))
            .collect()
    }
}

/// Diffs desired against actual state under an [`UpdatePolicy`].
#[derive(Default)]
pub struct Planner {
    policy: UpdatePolicy,
}

impl Planner {
    pub fn new(policy: UpdatePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &UpdatePolicy {
        &self.policy
    }

    /// Produce the ordered plan that turns `actual` into `desired`.
    ///
    /// Order: cluster creates, node pool creates, cluster updates, node pool
    /// updates, node pool deletes, cluster deletes. Each group is sorted by id
    /// because `State` keeps its maps ordered.
    pub fn plan(&self, desired: &State, actual: &State) -> Plan {
        let mut plan = Plan::new();

        for (id, cluster) in &desired.clusters {
            if !actual.clusters.contains_key(id) {
                plan.push(Action::create(ResourceRecord::Cluster(cluster.clone())));
            }
        }
        for (id, pool) in &desired.node_pools {
            if !actual.node_pools.contains_key(id) {
                plan.push(Action::create(ResourceRecord::NodePool(pool.clone())));
            }
        }

        for (id, cluster) in &desired.clusters {
            if let Some(existing) = actual.clusters.get(id) {
                let changes = self.policy.cluster_changes(cluster, existing);
                if !changes.is_empty() {
                    plan.push(Action::update(
                        ResourceRecord::Cluster(cluster.clone()),
                        changes,
                    ));
                }
            }
        }
        for (id, pool) in &desired.node_pools {
            if let Some(existing) = actual.node_pools.get(id) {
                let changes = self.policy.node_pool_changes(pool, existing);
                if !changes.is_empty() {
                    plan.push(Action::update(
                        ResourceRecord::NodePool(pool.clone()),
                        changes,
                    ));
                }
            }
        }

        for (id, pool) in &actual.node_pools {
            if !desired.node_pools.contains_key(id) {
                plan.push(Action::delete(pool.resource_id()));
            }
        }
        for (id, cluster) in &actual.clusters {
            if !desired.clusters.contains_key(id) {
                plan.push(Action::delete(cluster.resource_id()));
            }
        }

        plan
    }
}

/// Plan with the default update policy.
pub fn generate_plan(desired: &State, actual: &State) -> Plan {
    Planner::default().plan(desired, actual)
}
