//! Point-in-time copies of persisted state.
//!
//! Each snapshot is one pretty-printed JSON file, `<dir>/<id>.json`, carrying
//! a SHA-256 checksum of its state. Snapshot files are written once and never
//! rewritten; restore refuses a file whose checksum no longer matches.

mod changes;
mod manager;

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use provctl_core::{ResourceId, State};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub use self::changes::compute_changes;
pub use self::manager::SnapshotManager;

/// Snapshot document format version.
pub const SNAPSHOT_VERSION: &str = "1.0";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub id: String,
    pub created_at: jiff::Timestamp,
    pub description: String,
    pub state: State,
    pub metadata: SnapshotMetadata,
    pub checksum: String,
}

impl Snapshot {
    /// Recompute the checksum of the embedded state.
    pub fn compute_checksum(&self) -> Result<String, serde_json::Error> {
        checksum(&self.state)
    }

    pub fn is_intact(&self) -> bool {
        self.compute_checksum()
            .is_ok_and(|actual| actual == self.checksum)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotMetadata {
    pub version: String,
    pub created_by: String,
    pub trigger_reason: TriggerReason,
    pub cluster_count: usize,
    pub node_pool_count: usize,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerReason {
    Manual,
    PreUpgrade,
    PreDelete,
    PreApply,
    Scheduled,
    DriftRemediate,
    PreRestore,
}

impl fmt::Display for TriggerReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            Self::Manual => "manual",
            Self::PreUpgrade => "pre_upgrade",
            Self::PreDelete => "pre_delete",
            Self::PreApply => "pre_apply",
            Self::Scheduled => "scheduled",
            Self::DriftRemediate => "drift_remediate",
            Self::PreRestore => "pre_restore",
        };
        f.write_str(s)
    }
}

/// Listing entry: everything about a snapshot except its state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotInfo {
    pub id: String,
    pub created_at: jiff::Timestamp,
    pub description: String,
    pub trigger_reason: TriggerReason,
    pub cluster_count: usize,
    pub node_pool_count: usize,
    pub size_bytes: u64,
    /// Whether the stored checksum still matches the stored state.
    pub intact: bool,
    /// File the entry was read from. Not always `<dir>/<id>.json`: a copied
    /// or renamed file keeps the id it was written with.
    #[serde(skip)]
    pub path: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeAction {
    Add,
    Modify,
    Remove,
}

impl fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            Self::Add => "add",
            Self::Modify => "modify",
            Self::Remove => "remove",
        };
        f.write_str(s)
    }
}

/// How one resource would change if a snapshot were restored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreChange {
    pub action: ChangeAction,
    pub resource: ResourceId,
    /// Current spec, absent for additions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before: Option<serde_json::Value>,
    /// Snapshot spec, absent for removals.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreResult {
    pub snapshot_id: String,
    /// The pre-restore backup of the state that was replaced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_id: Option<String>,
    pub restored_at: jiff::Timestamp,
    pub dry_run: bool,
    pub success: bool,
    pub changes: Vec<RestoreChange>,
}

/// Which snapshots `prune_snapshots` deletes. Unset limits don't apply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub max_age: Option<Duration>,
    pub max_count: Option<usize>,
}

impl RetentionPolicy {
    pub fn keep_latest(count: usize) -> Self {
        Self {
            max_age: None,
            max_count: Some(count),
        }
    }

    pub fn older_than(age: Duration) -> Self {
        Self {
            max_age: Some(age),
            max_count: None,
        }
    }

    pub fn is_unbounded(&self) -> bool {
        self.max_age.is_none() && self.max_count.is_none()
    }
}

/// SHA-256 over the compact JSON encoding of `state`, hex encoded.
///
/// `State` stores ordered maps, so equal states always hash equally.
pub fn checksum(state: &State) -> Result<String, serde_json::Error> {
    let bytes = serde_json::to_vec(state)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(hex::encode(hasher.finalize()))
}
