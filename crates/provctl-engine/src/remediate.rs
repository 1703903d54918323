use provctl_core::{Cluster, NodePool, ResourceId, ResourceKind, ResourceRecord, State};
use serde::{Deserialize, Serialize};

use crate::drift::{DriftDetector, DriftReport, DriftType, ResourceDrift};
use crate::error::{format_err_chain, EngineError};
use crate::plan::{Action, FieldChange, Plan};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RemediationStatus {
    Remediated,
    Skipped { reason: String },
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemediationOutcome {
    pub resource: ResourceId,
    pub drift_type: DriftType,
    #[serde(flatten)]
    pub status: RemediationStatus,
}

/// Per-drift results of a remediation run, in report order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemediationReport {
    pub outcomes: Vec<RemediationOutcome>,
}

impl RemediationReport {
    pub fn remediated(&self) -> usize {
        self.count(|s| matches!(s, RemediationStatus::Remediated))
    }

    pub fn skipped(&self) -> usize {
        self.count(|s| matches!(s, RemediationStatus::Skipped { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, RemediationStatus::Failed { .. }))
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    fn count(&self, f: impl Fn(&RemediationStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|o| f(&o.status)).count()
    }
}

impl DriftDetector {
    /// Push every remediable drift in `report` back toward `desired`.
    ///
    /// Each drift becomes a single-action plan applied under the state lock,
    /// so one failure doesn't stop the rest of the batch.
    pub async fn remediate(
        &self,
        desired: &State,
        report: &DriftReport,
    ) -> Result<RemediationReport, EngineError> {
        desired.validate()?;
        let mut result = RemediationReport::default();

        for drift in &report.drifts {
            let status = if drift.remediatable {
                match self.remediate_one(desired, drift).await {
                    Ok(()) => {
                        tracing::info!(
                            resource = %drift.resource,
                            drift_type = %drift.drift_type,
                            "drift remediated"
                        );
                        RemediationStatus::Remediated
                    }
                    Err(e) => {
                        let error = format_err_chain(&e);
                        tracing::error!(
                            resource = %drift.resource,
                            drift_type = %drift.drift_type,
                            error = %error,
                            "remediation failed"
                        );
                        RemediationStatus::Failed { error }
                    }
                }
            } else {
                tracing::warn!(
                    resource = %drift.resource,
                    drift_type = %drift.drift_type,
                    "drift requires manual remediation"
                );
                RemediationStatus::Skipped {
                    reason: "requires manual remediation".to_string(),
                }
            };

            result.outcomes.push(RemediationOutcome {
                resource: drift.resource.clone(),
                drift_type: drift.drift_type,
                status,
            });
        }

        Ok(result)
    }

    async fn remediate_one(&self, desired: &State, drift: &ResourceDrift) -> Result<(), EngineError> {
        let action = remediation_action(desired, drift)?;
        let engine = self.engine();
        let lock = engine.state_manager().lock().await?;
        engine.apply(&Plan::single(action)).await?;
        lock.unlock();
        Ok(())
    }
}

/// The single action that undoes `drift`.
pub fn remediation_action(desired: &State, drift: &ResourceDrift) -> Result<Action, EngineError> {
    let resource = &drift.resource;
    let unsupported = |reason: &str| EngineError::Remediation {
        resource: resource.clone(),
        reason: reason.to_string(),
    };

    match (drift.drift_type, resource.kind) {
        (DriftType::ResourceDeleted, ResourceKind::Cluster) => {
            let cluster = desired_cluster(desired, resource)?;
            Ok(Action::create(ResourceRecord::Cluster(cluster.clone())))
        }
        (DriftType::ResourceDeleted, ResourceKind::NodePool) => {
            let pool = desired_node_pool(desired, resource)?;
            Ok(Action::create(ResourceRecord::NodePool(pool)))
        }
        (DriftType::VersionSkew, ResourceKind::Cluster) => {
            let cluster = desired_cluster(desired, resource)?;
            Ok(Action::update(
                ResourceRecord::Cluster(cluster.clone()),
                vec![field_change(drift)],
            ))
        }
        (DriftType::ScaleChange, ResourceKind::NodePool) => {
            let pool = desired_node_pool(desired, resource)?;
            Ok(Action::update(
                ResourceRecord::NodePool(pool),
                vec![field_change(drift)],
            ))
        }
        _ => Err(unsupported("no automatic remediation for this kind of drift")),
    }
}

fn field_change(drift: &ResourceDrift) -> FieldChange {
    FieldChange {
        field: drift.field.clone(),
        expected: drift.expected.clone(),
        actual: drift.actual.clone(),
    }
}

fn desired_cluster<'a>(desired: &'a State, resource: &ResourceId) -> Result<&'a Cluster, EngineError> {
    desired
        .clusters
        .get(&resource.id)
        .ok_or_else(|| EngineError::Remediation {
            resource: resource.clone(),
            reason: "cluster is not in desired state".to_string(),
        })
}

/// The desired node pool, either tracked on its own or declared as a worker
/// pool of its cluster.
fn desired_node_pool(desired: &State, resource: &ResourceId) -> Result<NodePool, EngineError> {
    if let Some(pool) = desired.node_pools.get(&resource.id) {
        return Ok(pool.clone());
    }
    desired
        .clusters
        .values()
        .find_map(|cluster| {
            cluster
                .spec
                .worker_pools
                .iter()
                .find(|p| provctl_core::node_pool_id(&cluster.id, &p.name) == resource.id)
                .map(|p| NodePool::from_worker_pool(cluster, p))
        })
        .ok_or_else(|| EngineError::Remediation {
            resource: resource.clone(),
            reason: "node pool is not in desired state".to_string(),
        })
}
