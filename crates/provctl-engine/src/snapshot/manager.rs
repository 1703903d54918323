use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use jiff::{SignedDuration, Timestamp};
use provctl_core::State;
use provctl_storage::StateManager;

use super::{
    checksum, compute_changes, RestoreResult, RetentionPolicy, Snapshot, SnapshotInfo,
    SnapshotMetadata, TriggerReason, SNAPSHOT_VERSION,
};
use crate::error::EngineError;

const DEFAULT_CREATOR: &str = "provctl";

/// Creates, lists, restores, and prunes snapshots of the persisted state.
pub struct SnapshotManager {
    dir: PathBuf,
    state: Arc<dyn StateManager>,
    created_by: String,
    /// Last timestamp handed out for a snapshot id.
    clock: Mutex<Option<Timestamp>>,
}

impl SnapshotManager {
    pub fn new(dir: impl Into<PathBuf>, state: Arc<dyn StateManager>) -> Result<Self, EngineError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            state,
            created_by: DEFAULT_CREATOR.to_string(),
            clock: Mutex::new(None),
        })
    }

    pub fn with_creator(mut self, created_by: impl Into<String>) -> Self {
        self.created_by = created_by.into();
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Snapshot the current persisted state.
    pub async fn create_snapshot(
        &self,
        description: &str,
        reason: TriggerReason,
    ) -> Result<Snapshot, EngineError> {
        self.create_tagged_snapshot(description, reason, BTreeMap::new())
            .await
    }

    pub async fn create_tagged_snapshot(
        &self,
        description: &str,
        reason: TriggerReason,
        tags: BTreeMap<String, String>,
    ) -> Result<Snapshot, EngineError> {
        let state = self.state.get_state().await?;
        self.write_snapshot(state, description, reason, tags)
    }

    /// Read a snapshot without checking its checksum.
    pub fn load_snapshot(&self, id: &str) -> Result<Snapshot, EngineError> {
        let path = self.snapshot_path(id)?;
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(EngineError::SnapshotNotFound(id.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Read a snapshot and confirm its state still hashes to the stored
    /// checksum.
    pub fn verify_snapshot(&self, id: &str) -> Result<Snapshot, EngineError> {
        let snapshot = self.load_snapshot(id)?;
        let actual = snapshot.compute_checksum()?;
        if actual != snapshot.checksum {
            tracing::error!(
                snapshot_id = %id,
                expected = %snapshot.checksum,
                actual = %actual,
                "snapshot checksum mismatch"
            );
            return Err(EngineError::Integrity {
                snapshot_id: id.to_string(),
                expected: snapshot.checksum,
                actual,
            });
        }
        Ok(snapshot)
    }

    /// Replace the persisted state with a snapshot's.
    ///
    /// Holds the state lock throughout. With `dry_run` only the change set
    /// is computed and `success` stays false. Otherwise the current state is
    /// first saved as a `pre_restore` snapshot, whose id is returned as
    /// `backup_id`.
    pub async fn restore_snapshot(&self, id: &str, dry_run: bool) -> Result<RestoreResult, EngineError> {
        let lock = self.state.lock().await?;
        let snapshot = self.verify_snapshot(id)?;
        let current = self.state.get_state().await?;
        let changes = compute_changes(&snapshot.state, &current);

        let mut result = RestoreResult {
            snapshot_id: snapshot.id.clone(),
            backup_id: None,
            restored_at: Timestamp::now(),
            dry_run,
            success: false,
            changes,
        };

        if dry_run {
            tracing::info!(
                snapshot_id = %id,
                changes = result.changes.len(),
                "dry run: state not modified"
            );
            return Ok(result);
        }

        let tags = BTreeMap::from([("restoreOf".to_string(), id.to_string())]);
        let backup = self.write_snapshot(
            current,
            &format!("Automatic backup before restoring {id}"),
            TriggerReason::PreRestore,
            tags,
        )?;
        self.state.save_state(&snapshot.state).await?;
        lock.unlock();

        tracing::info!(
            snapshot_id = %id,
            backup_id = %backup.id,
            changes = result.changes.len(),
            "snapshot restored"
        );
        result.backup_id = Some(backup.id);
        result.success = true;
        Ok(result)
    }

    /// All readable snapshots, newest first. Unreadable files are skipped.
    pub fn list_snapshots(&self) -> Result<Vec<SnapshotInfo>, EngineError> {
        let mut snapshots = Vec::new();

        for entry in std::fs::read_dir(&self.dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }

            let loaded = std::fs::read(&path)
                .map_err(EngineError::from)
                .and_then(|bytes| Ok(serde_json::from_slice::<Snapshot>(&bytes)?));
            let snapshot = match loaded {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping unreadable snapshot");
                    continue;
                }
            };

            let size_bytes = entry.metadata().map(|m| m.len()).unwrap_or_default();
            snapshots.push(SnapshotInfo {
                intact: snapshot.is_intact(),
                id: snapshot.id,
                created_at: snapshot.created_at,
                description: snapshot.description,
                trigger_reason: snapshot.metadata.trigger_reason,
                cluster_count: snapshot.metadata.cluster_count,
                node_pool_count: snapshot.metadata.node_pool_count,
                size_bytes,
                path,
            });
        }

        snapshots.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(snapshots)
    }

    pub fn delete_snapshot(&self, id: &str) -> Result<(), EngineError> {
        let path = self.snapshot_path(id)?;
        match std::fs::remove_file(&path) {
            Ok(()) => {
                tracing::info!(snapshot_id = %id, "snapshot deleted");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(EngineError::SnapshotNotFound(id.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Delete snapshots outside `policy`, returning the deleted ids.
    ///
    /// The listing is taken once; a snapshot is deleted if it is older than
    /// `max_age` or sits at position `max_count` or later in newest-first
    /// order. Files are removed by the path they were listed from. A file
    /// that cannot be removed is logged and left for the next prune.
    pub fn prune_snapshots(&self, policy: &RetentionPolicy) -> Result<Vec<String>, EngineError> {
        if policy.is_unbounded() {
            return Ok(Vec::new());
        }

        let snapshots = self.list_snapshots()?;
        let now = Timestamp::now();
        let max_age = policy
            .max_age
            .map(|age| SignedDuration::try_from(age).unwrap_or(SignedDuration::MAX));

        let expired: Vec<&SnapshotInfo> = snapshots
            .iter()
            .enumerate()
            .filter(|(position, info)| {
                let too_old = max_age.is_some_and(|age| now.duration_since(info.created_at) > age);
                let beyond_count = policy.max_count.is_some_and(|count| *position >= count);
                too_old || beyond_count
            })
            .map(|(_, info)| info)
            .collect();

        let mut deleted = Vec::with_capacity(expired.len());
        for info in expired {
            match std::fs::remove_file(&info.path) {
                Ok(()) => {
                    tracing::info!(snapshot_id = %info.id, path = %info.path.display(), "snapshot deleted");
                    deleted.push(info.id.clone());
                }
                Err(e) => {
                    tracing::warn!(
                        snapshot_id = %info.id,
                        path = %info.path.display(),
                        error = %e,
                        "failed to delete expired snapshot"
                    );
                }
            }
        }

        tracing::info!(deleted = deleted.len(), remaining = snapshots.len() - deleted.len(), "snapshots pruned");
        Ok(deleted)
    }

    fn write_snapshot(
        &self,
        state: State,
        description: &str,
        reason: TriggerReason,
        tags: BTreeMap<String, String>,
    ) -> Result<Snapshot, EngineError> {
        let created_at = self.next_timestamp();
        let id = snapshot_id(created_at);
        let path = self.snapshot_path(&id)?;
        if path.exists() {
            return Err(EngineError::SnapshotExists(id));
        }

        let snapshot = Snapshot {
            checksum: checksum(&state)?,
            metadata: SnapshotMetadata {
                version: SNAPSHOT_VERSION.to_string(),
                created_by: self.created_by.clone(),
                trigger_reason: reason,
                cluster_count: state.cluster_count(),
                node_pool_count: state.node_pool_count(),
                tags,
            },
            id,
            created_at,
            description: description.to_string(),
            state,
        };

        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(&snapshot)?)?;
        std::fs::rename(&tmp, &path)?;

        tracing::info!(
            snapshot_id = %snapshot.id,
            reason = %reason,
            clusters = snapshot.metadata.cluster_count,
            node_pools = snapshot.metadata.node_pool_count,
            "snapshot created"
        );
        Ok(snapshot)
    }

    /// Strictly increasing timestamps, so ids never collide and sort in
    /// creation order even when the wall clock stalls or steps back.
    fn next_timestamp(&self) -> Timestamp {
        let mut last = self.clock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut now = Timestamp::now();
        if let Some(prev) = *last {
            if now <= prev {
                now = prev
                    .checked_add(SignedDuration::from_nanos(1))
                    .unwrap_or(prev);
            }
        }
        *last = Some(now);
        now
    }

    fn snapshot_path(&self, id: &str) -> Result<PathBuf, EngineError> {
        let valid = !id.is_empty()
            && !id.starts_with('.')
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if !valid {
            return Err(EngineError::InvalidSnapshotId(id.to_string()));
        }
        Ok(self.dir.join(format!("{id}.json")))
    }
}

/// `snapshot-YYYYMMDD-HHMMSS-<nanoseconds>`, in UTC.
fn snapshot_id(at: Timestamp) -> String {
    format!(
        "snapshot-{}-{:09}",
        at.strftime("%Y%m%d-%H%M%S"),
        at.subsec_nanosecond()
    )
}
