use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use provctl_core::State;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use crate::drift::DriftDetector;
use crate::engine::{ApplySummary, Engine};
use crate::error::{format_err_chain, EngineError};
use crate::provider::BoxFuture;
use crate::snapshot::{SnapshotManager, TriggerReason};

/// Where a control loop gets the desired state for each cycle.
pub trait DesiredStateSource: Send + Sync {
    fn load(&self) -> BoxFuture<'_, Result<State, EngineError>>;
}

impl DesiredStateSource for State {
    fn load(&self) -> BoxFuture<'_, Result<State, EngineError>> {
        Box::pin(async move { Ok(self.clone()) })
    }
}

/// A JSON `State` document re-read every cycle, so edits take effect without
/// a restart. Declared worker pools are expanded into node pools.
pub struct FileDesiredState {
    path: PathBuf,
}

impl FileDesiredState {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DesiredStateSource for FileDesiredState {
    fn load(&self) -> BoxFuture<'_, Result<State, EngineError>> {
        Box::pin(async move {
            let bytes = tokio::fs::read(&self.path).await?;
            let mut desired = State::from_json(&bytes)?;
            desired.expand_worker_pools();
            Ok(desired)
        })
    }
}

/// Run `cycle` every `period` until `shutdown` turns true.
///
/// Each cycle is awaited before the next tick is taken, so cycles never
/// overlap; ticks missed while a cycle runs are skipped. Shutdown is only
/// observed between cycles.
pub async fn run_periodic<F, Fut>(
    name: &'static str,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
    mut cycle: F,
) where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tracing::info!(controller = name, period_secs = period.as_secs(), "control loop started");

    loop {
        if *shutdown.borrow() {
            break;
        }
        tokio::select! {
            biased;
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = ticker.tick() => cycle().await,
        }
    }

    tracing::info!(controller = name, "control loop stopped");
}

/// Periodically reconciles persisted state against a desired state source.
pub struct Reconciler {
    engine: Arc<Engine>,
    source: Arc<dyn DesiredStateSource>,
    interval: Duration,
}

impl Reconciler {
    pub fn new(engine: Arc<Engine>, source: Arc<dyn DesiredStateSource>, interval: Duration) -> Self {
        Self {
            engine,
            source,
            interval,
        }
    }

    /// One reconciliation cycle.
    pub async fn run_once(&self) -> Result<ApplySummary, EngineError> {
        let desired = self.source.load().await?;
        self.engine.reconcile(&desired).await
    }

    pub async fn run(&self, shutdown: watch::Receiver<bool>) {
        run_periodic("reconciler", self.interval, shutdown, move || async move {
            match self.run_once().await {
                Ok(summary) if summary.changed() > 0 => tracing::info!(
                    created = summary.created,
                    updated = summary.updated,
                    deleted = summary.deleted,
                    "reconciliation cycle applied changes"
                ),
                Ok(_) => tracing::debug!("reconciliation cycle found nothing to do"),
                Err(e) => tracing::error!(error = %format_err_chain(&e), "reconciliation cycle failed"),
            }
        })
        .await;
    }
}

/// Periodically checks for drift and, if enabled, remediates it.
pub struct DriftWatcher {
    detector: DriftDetector,
    source: Arc<dyn DesiredStateSource>,
    interval: Duration,
    auto_remediate: bool,
    snapshots: Option<Arc<SnapshotManager>>,
}

impl DriftWatcher {
    pub fn new(detector: DriftDetector, source: Arc<dyn DesiredStateSource>, interval: Duration) -> Self {
        Self {
            detector,
            source,
            interval,
            auto_remediate: false,
            snapshots: None,
        }
    }

    pub fn with_auto_remediate(mut self, enabled: bool) -> Self {
        self.auto_remediate = enabled;
        self
    }

    /// Snapshot persisted state before each automatic remediation.
    pub fn with_snapshots(mut self, snapshots: Arc<SnapshotManager>) -> Self {
        self.snapshots = Some(snapshots);
        self
    }

    pub async fn run_once(&self) -> Result<(), EngineError> {
        let desired = self.source.load().await?;
        let report = self.detector.detect_drift(&desired).await?;
        if !self.auto_remediate || report.summary.remediatable == 0 {
            return Ok(());
        }

        if let Some(snapshots) = &self.snapshots {
            snapshots
                .create_snapshot("Before automatic drift remediation", TriggerReason::DriftRemediate)
                .await?;
        }
        let outcome = self.detector.remediate(&desired, &report).await?;
        tracing::info!(
            remediated = outcome.remediated(),
            skipped = outcome.skipped(),
            failed = outcome.failed(),
            "drift remediation finished"
        );
        Ok(())
    }

    pub async fn run(&self, shutdown: watch::Receiver<bool>) {
        run_periodic("drift-watcher", self.interval, shutdown, move || async move {
            if let Err(e) = self.run_once().await {
                tracing::error!(error = %format_err_chain(&e), "drift check failed");
            }
        })
        .await;
    }
}
