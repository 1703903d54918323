use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use provctl_core::{node_pool_id, Cluster, ResourceId, State};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::engine::Engine;
use crate::error::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriftType {
    ConfigChange,
    VersionSkew,
    ScaleChange,
    NetworkChange,
    SecurityChange,
    ResourceDeleted,
    ResourceAdded,
}

impl fmt::Display for DriftType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            Self::ConfigChange => "config_change",
            Self::VersionSkew => "version_skew",
            Self::ScaleChange => "scale_change",
            Self::NetworkChange => "network_change",
            Self::SecurityChange => "security_change",
            Self::ResourceDeleted => "resource_deleted",
            Self::ResourceAdded => "resource_added",
        };
        f.write_str(s)
    }
}

/// One observed divergence between desired and live state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDrift {
    pub resource: ResourceId,
    pub drift_type: DriftType,
    /// Path of the diverging field, e.g. `controlPlane.version`.
    pub field: String,
    pub expected: Value,
    pub actual: Value,
    pub severity: Severity,
    pub remediatable: bool,
}

impl ResourceDrift {
    pub fn cluster_deleted(cluster: &Cluster) -> Self {
        Self {
            resource: cluster.resource_id(),
            drift_type: DriftType::ResourceDeleted,
            field: "cluster".to_string(),
            expected: json!("exists"),
            actual: json!("deleted"),
            severity: Severity::Critical,
            remediatable: true,
        }
    }

    pub fn version_skew(desired: &Cluster, live: &Cluster) -> Self {
        Self {
            resource: desired.resource_id(),
            drift_type: DriftType::VersionSkew,
            field: "controlPlane.version".to_string(),
            expected: json!(desired.spec.control_plane.version),
            actual: json!(live.spec.control_plane.version),
            severity: Severity::High,
            remediatable: true,
        }
    }

    pub fn node_pool_deleted(cluster: &Cluster, pool_name: &str) -> Self {
        Self {
            resource: ResourceId::node_pool(
                &cluster.spec.provider,
                node_pool_id(&cluster.id, pool_name),
                pool_name,
            ),
            drift_type: DriftType::ResourceDeleted,
            field: "nodePool".to_string(),
            expected: json!("exists"),
            actual: json!("deleted"),
            severity: Severity::High,
            remediatable: true,
        }
    }

    pub fn scale_change(cluster: &Cluster, pool_name: &str, expected: u32, actual: u32) -> Self {
        Self {
            resource: ResourceId::node_pool(
                &cluster.spec.provider,
                node_pool_id(&cluster.id, pool_name),
                pool_name,
            ),
            drift_type: DriftType::ScaleChange,
            field: "desiredSize".to_string(),
            expected: json!(expected),
            actual: json!(actual),
            severity: Severity::Medium,
            remediatable: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriftSummary {
    pub total: usize,
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub remediatable: usize,
}

impl DriftSummary {
    pub fn from_drifts(drifts: &[ResourceDrift]) -> Self {
        let mut summary = Self {
            total: drifts.len(),
            ..Self::default()
        };
        for drift in drifts {
            match drift.severity {
                Severity::Critical => summary.critical += 1,
                Severity::High => summary.high += 1,
                Severity::Medium => summary.medium += 1,
                Severity::Low => summary.low += 1,
            }
            if drift.remediatable {
                summary.remediatable += 1;
            }
        }
        summary
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriftReport {
    pub detected_at: jiff::Timestamp,
    pub has_drift: bool,
    pub drifts: Vec<ResourceDrift>,
    pub summary: DriftSummary,
    /// Providers whose live state could not be read this round.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped_providers: Vec<String>,
}

impl DriftReport {
    pub fn new(drifts: Vec<ResourceDrift>) -> Self {
        Self {
            detected_at: jiff::Timestamp::now(),
            has_drift: !drifts.is_empty(),
            summary: DriftSummary::from_drifts(&drifts),
            drifts,
            skipped_providers: Vec::new(),
        }
    }

    /// The most severe drift found, if any.
    pub fn max_severity(&self) -> Option<Severity> {
        self.drifts.iter().map(|d| d.severity).max()
    }

    pub fn remediatable(&self) -> impl Iterator<Item = &ResourceDrift> {
        self.drifts.iter().filter(|d| d.remediatable)
    }
}

/// Classify every difference between the clusters `desired` declares and
/// what `live` reports.
///
/// `live` is expected to hold only the clusters that still exist; anything
/// missing from it is reported as deleted.
pub fn compare(desired: &State, live: &State) -> Vec<ResourceDrift> {
    let mut drifts = Vec::new();

    for (id, cluster) in &desired.clusters {
        let Some(found) = live.clusters.get(id) else {
            drifts.push(ResourceDrift::cluster_deleted(cluster));
            continue;
        };

        if cluster.spec.control_plane.version != found.spec.control_plane.version {
            drifts.push(ResourceDrift::version_skew(cluster, found));
        }

        for pool in &cluster.spec.worker_pools {
            match found.spec.worker_pool(&pool.name) {
                None => drifts.push(ResourceDrift::node_pool_deleted(cluster, &pool.name)),
                Some(live_pool) if live_pool.desired_size != pool.desired_size => {
                    drifts.push(ResourceDrift::scale_change(
                        cluster,
                        &pool.name,
                        pool.desired_size,
                        live_pool.desired_size,
                    ));
                }
                Some(_) => {}
            }
        }
    }

    drifts
}

/// Compares desired state against what the clouds actually run.
#[derive(Clone)]
pub struct DriftDetector {
    engine: Arc<Engine>,
}

impl DriftDetector {
    pub fn new(engine: Arc<Engine>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    /// Query every registered provider that owns a desired cluster and
    /// report how the live view differs.
    ///
    /// A provider that fails to answer is logged and its clusters are left
    /// out of the report; so are clusters naming an unregistered provider.
    pub async fn detect_drift(&self, desired: &State) -> Result<DriftReport, EngineError> {
        desired.validate()?;
        let registry = self.engine.registry();
        let mut drifts = Vec::new();
        let mut skipped = Vec::new();

        for (name, provider) in registry.iter() {
            let owned = desired.for_provider(name);
            if owned.clusters.is_empty() {
                continue;
            }

            tracing::debug!(provider = %name, clusters = owned.cluster_count(), "checking drift");
            let live = match provider.live_state(&owned).await {
                Ok(live) => live,
                Err(e) => {
                    tracing::error!(
                        provider = %name,
                        error = %e,
                        "failed to read live state, skipping provider"
                    );
                    skipped.push(name.to_string());
                    continue;
                }
            };
            drifts.extend(compare(&owned, &live));
        }

        let unregistered: BTreeSet<&str> = desired
            .clusters
            .values()
            .map(|c| c.spec.provider.as_str())
            .filter(|p| !registry.contains(p))
            .collect();
        for provider in unregistered {
            tracing::warn!(provider = %provider, "provider not registered, skipping its clusters");
            skipped.push(provider.to_string());
        }

        let mut report = DriftReport::new(drifts);
        report.skipped_providers = skipped;

        if report.has_drift {
            tracing::warn!(
                total = report.summary.total,
                critical = report.summary.critical,
                high = report.summary.high,
                medium = report.summary.medium,
                low = report.summary.low,
                "drift detected"
            );
        } else {
            tracing::info!("no drift detected");
        }
        Ok(report)
    }
}
