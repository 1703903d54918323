use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use provctl_core::{
    Cluster, ClusterSpec, ControlPlaneSpec, ControlPlaneType, NetworkSpec, Resource,
    ResourceMetadata, ResourceStatus,
};
use provctl_engine::{FileDesiredState, Reconciler, TriggerReason};
use provctl_storage::StateManager;

use provctl::config::ProvctlConfig;
use provctl::output;
use provctl::setup::Services;

use crate::commands::{load_desired, shutdown_on_ctrl_c};

pub struct NewCluster<'a> {
    pub name: &'a str,
    pub id: Option<&'a str>,
    pub provider: &'a str,
    pub region: &'a str,
    pub version: &'a str,
}

impl NewCluster<'_> {
    fn build(&self) -> Cluster {
        let mut config = BTreeMap::new();
        config.insert("name".to_string(), serde_json::Value::from(self.name));
        Resource {
            id: self.id.unwrap_or(self.name).to_string(),
            metadata: ResourceMetadata::named(self.name),
            spec: ClusterSpec {
                provider: self.provider.to_string(),
                region: self.region.to_string(),
                network: NetworkSpec {
                    vpc_cidr: "10.0.0.0/16".to_string(),
                    availability_zones: vec![
                        format!("{}a", self.region),
                        format!("{}b", self.region),
                    ],
                    ..NetworkSpec::default()
                },
                control_plane: ControlPlaneSpec {
                    control_plane_type: ControlPlaneType::Managed,
                    version: self.version.to_string(),
                    ..ControlPlaneSpec::default()
                },
                config,
                ..ClusterSpec::default()
            },
            status: ResourceStatus::default(),
        }
    }
}

/// Add one cluster to the persisted state and provision it.
pub async fn create(services: &Services, new: NewCluster<'_>) -> eyre::Result<()> {
    let cluster = new.build();
    let current = services.state.get_state().await?;
    if current.clusters.contains_key(&cluster.id) {
        return Err(eyre::eyre!("cluster {} already exists", cluster.id));
    }

    let id = cluster.id.clone();
    let summary = services.engine.reconcile(&current.with_cluster(cluster)).await?;
    tracing::info!(cluster = %id, provider = new.provider, "cluster created");
    output::print_summary(&summary);
    Ok(())
}

/// Remove a cluster and its node pools.
pub async fn delete(services: &Services, config: &ProvctlConfig, id: &str) -> eyre::Result<()> {
    let mut desired = services.state.get_state().await?;
    if desired.clusters.remove(id).is_none() {
        return Err(eyre::eyre!("cluster {id} is not in state"));
    }
    desired.node_pools.retain(|_, pool| pool.spec.cluster_id != id);

    if config.auto_snapshot {
        services
            .snapshots
            .create_snapshot(&format!("Before deleting cluster {id}"), TriggerReason::PreDelete)
            .await?;
    }
    let summary = services.engine.reconcile(&desired).await?;
    output::print_summary(&summary);
    Ok(())
}

pub async fn list(services: &Services, json: bool) -> eyre::Result<()> {
    let state = services.state.get_state().await?;
    if json {
        return output::print_json(&state);
    }
    output::print_clusters(&state);
    Ok(())
}

pub async fn plan(services: &Services, file: &Path) -> eyre::Result<()> {
    let desired = load_desired(file).await?;
    let plan = services.engine.plan(&desired).await?;
    print!("{plan}");
    Ok(())
}

pub async fn apply(
    services: &Services,
    config: &ProvctlConfig,
    file: &Path,
    dry_run: bool,
) -> eyre::Result<()> {
    let desired = load_desired(file).await?;
    let plan = services.engine.plan(&desired).await?;
    print!("{plan}");
    if dry_run || !plan.has_changes() {
        return Ok(());
    }

    if config.auto_snapshot {
        services
            .snapshots
            .create_snapshot(
                &format!("Before applying {}", file.display()),
                TriggerReason::PreApply,
            )
            .await?;
    }
    let summary = services.engine.reconcile(&desired).await?;
    output::print_summary(&summary);
    Ok(())
}

pub async fn reconcile(
    services: &Services,
    file: &Path,
    interval: Duration,
    once: bool,
) -> eyre::Result<()> {
    let source = Arc::new(FileDesiredState::new(file));
    let reconciler = Reconciler::new(Arc::clone(&services.engine), source, interval);
    if once {
        let summary = reconciler.run_once().await?;
        output::print_summary(&summary);
        return Ok(());
    }

    println!(
        "Reconciling {} every {}s (Ctrl-C to stop)",
        file.display(),
        interval.as_secs()
    );
    reconciler.run(shutdown_on_ctrl_c()).await;
    Ok(())
}
