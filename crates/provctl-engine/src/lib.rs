//! provctl-engine
//!
//! Reconciliation and safety engine for multi-cloud cluster provisioning.
//!
//! Public API:
//! - `generate_plan()`: diff desired against actual state into an ordered plan
//! - `Engine::apply()`: execute a plan transactionally, one audit event per action
//! - `Engine::reconcile()`: plan and apply against persisted state under the state lock
//! - `DriftDetector`: compare desired state against live provider state and remediate
//! - `SnapshotManager`: checksummed point-in-time state snapshots with dry-run restore
//! - `controller`: periodic reconcile and drift-watch loops

pub mod controller;
pub mod drift;
pub mod engine;
pub mod error;
pub mod plan;
pub mod planner;
pub mod provider;
pub mod providers;
pub mod registry;
pub mod remediate;
pub mod snapshot;

pub use crate::controller::{DesiredStateSource, DriftWatcher, FileDesiredState, Reconciler};
pub use crate::drift::{DriftDetector, DriftReport, DriftSummary, DriftType, ResourceDrift, Severity};
pub use crate::engine::{ApplySummary, Engine};
pub use crate::error::{format_err_chain, EngineError, ProviderError};
pub use crate::plan::{Action, ActionKind, ActionType, FieldChange, Plan};
pub use crate::planner::{generate_plan, FieldCheck, Planner, UpdatePolicy};
pub use crate::provider::{BoxFuture, CloudProvider};
pub use crate::providers::simulated::SimulatedProvider;
pub use crate::registry::{ProviderNotFound, ProviderRegistry};
pub use crate::remediate::{RemediationOutcome, RemediationReport, RemediationStatus};
pub use crate::snapshot::{
    RestoreChange, RestoreResult, RetentionPolicy, Snapshot, SnapshotInfo, SnapshotManager,
    SnapshotMetadata, TriggerReason,
};
