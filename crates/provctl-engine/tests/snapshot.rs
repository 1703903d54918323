mod common;

use std::sync::Arc;
use std::time::Duration;

use provctl_core::State;
use provctl_engine::snapshot::{checksum, ChangeAction};
use provctl_engine::{EngineError, RetentionPolicy, Snapshot, SnapshotManager, TriggerReason};
use provctl_storage::{MemoryStateStore, StateManager};

use common::{cluster, desired};

struct Fixture {
    _dir: tempfile::TempDir,
    store: Arc<MemoryStateStore>,
    manager: SnapshotManager,
}

fn fixture(initial: State) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryStateStore::new(initial));
    let manager = SnapshotManager::new(
        dir.path().join("snapshots"),
        store.clone() as Arc<dyn StateManager>,
    )
    .unwrap();
    Fixture {
        _dir: dir,
        store,
        manager,
    }
}

fn state_v1() -> State {
    desired([
        cluster("a", "1.28", &[("default", 2)]),
        cluster("b", "1.28", &[]),
    ])
}

fn state_v2() -> State {
    desired([
        cluster("a", "1.29", &[("default", 2)]),
        cluster("c", "1.28", &[]),
    ])
}

fn snapshot_file(f: &Fixture, id: &str) -> std::path::PathBuf {
    f.manager.dir().join(format!("{id}.json"))
}

#[tokio::test]
async fn create_writes_checksummed_snapshot() {
    let f = fixture(state_v1());
    let snapshot = f
        .manager
        .create_snapshot("before upgrade", TriggerReason::PreUpgrade)
        .await
        .unwrap();

    assert!(snapshot.id.starts_with("snapshot-"));
    assert!(snapshot_file(&f, &snapshot.id).exists());
    assert_eq!(snapshot.metadata.cluster_count, 2);
    assert_eq!(snapshot.metadata.node_pool_count, 1);
    assert_eq!(snapshot.metadata.trigger_reason, TriggerReason::PreUpgrade);
    assert_eq!(snapshot.checksum, checksum(&state_v1()).unwrap());
    assert_eq!(snapshot.checksum.len(), 64);

    let loaded = f.manager.verify_snapshot(&snapshot.id).unwrap();
    assert_eq!(loaded, snapshot);
}

#[test]
fn checksum_survives_serialization_round_trip() {
    let state = state_v1();
    let json = serde_json::to_vec_pretty(&state).unwrap();
    let parsed: State = serde_json::from_slice(&json).unwrap();
    assert_eq!(checksum(&state).unwrap(), checksum(&parsed).unwrap());
}

#[tokio::test]
async fn restore_round_trips_and_backs_up_current_state() {
    let f = fixture(state_v1());
    let snapshot = f
        .manager
        .create_snapshot("v1", TriggerReason::Manual)
        .await
        .unwrap();
    f.store.save_state(&state_v2()).await.unwrap();

    let result = f.manager.restore_snapshot(&snapshot.id, false).await.unwrap();
    assert!(result.success);
    assert!(!result.dry_run);
    assert_eq!(f.store.get_state().await.unwrap(), state_v1());

    let backup_id = result.backup_id.expect("backup id");
    let backup = f.manager.verify_snapshot(&backup_id).unwrap();
    assert_eq!(backup.metadata.trigger_reason, TriggerReason::PreRestore);
    assert_eq!(backup.metadata.tags.get("restoreOf"), Some(&snapshot.id));
    assert_eq!(backup.state, state_v2());

    // Restoring the backup undoes the restore.
    f.manager.restore_snapshot(&backup_id, false).await.unwrap();
    assert_eq!(f.store.get_state().await.unwrap(), state_v2());
}

#[tokio::test]
async fn dry_run_reports_changes_without_mutating() {
    let f = fixture(state_v1());
    let snapshot = f
        .manager
        .create_snapshot("v1", TriggerReason::Manual)
        .await
        .unwrap();
    f.store.save_state(&state_v2()).await.unwrap();
    let saves = f.store.save_count();

    let result = f.manager.restore_snapshot(&snapshot.id, true).await.unwrap();
    assert!(result.dry_run);
    assert!(!result.success);
    assert!(result.backup_id.is_none());
    assert_eq!(f.store.get_state().await.unwrap(), state_v2());
    assert_eq!(f.store.save_count(), saves);
    assert_eq!(f.manager.list_snapshots().unwrap().len(), 1);

    let changes: Vec<(ChangeAction, String)> = result
        .changes
        .iter()
        .map(|c| (c.action, c.resource.id.clone()))
        .collect();
    assert_eq!(
        changes,
        vec![
            (ChangeAction::Modify, "a".to_string()),
            (ChangeAction::Add, "b".to_string()),
            (ChangeAction::Remove, "c".to_string()),
        ]
    );
    let modify = &result.changes[0];
    assert!(modify.before.is_some() && modify.after.is_some());
}

#[tokio::test]
async fn list_is_newest_first() {
    let f = fixture(state_v1());
    let mut created = Vec::new();
    for i in 0..4 {
        let s = f
            .manager
            .create_snapshot(&format!("snapshot {i}"), TriggerReason::Scheduled)
            .await
            .unwrap();
        created.push(s.id);
    }

    let listed: Vec<String> = f
        .manager
        .list_snapshots()
        .unwrap()
        .into_iter()
        .map(|s| s.id)
        .collect();
    created.reverse();
    assert_eq!(listed, created);
}

#[tokio::test]
async fn rapid_creation_yields_unique_ids() {
    let f = fixture(State::new());
    let mut ids = Vec::new();
    for _ in 0..20 {
        ids.push(
            f.manager
                .create_snapshot("burst", TriggerReason::Manual)
                .await
                .unwrap()
                .id,
        );
    }
    let mut sorted = ids.clone();
    sorted.sort();
    sorted.dedup();
    assert_eq!(sorted, ids);
}

#[tokio::test]
async fn prune_keeps_newest_by_count() {
    let f = fixture(state_v1());
    let mut created = Vec::new();
    for i in 0..5 {
        let s = f
            .manager
            .create_snapshot(&format!("s{i}"), TriggerReason::Scheduled)
            .await
            .unwrap();
        created.push(s.id);
    }

    let deleted = f.manager.prune_snapshots(&RetentionPolicy::keep_latest(3)).unwrap();
    assert_eq!(deleted, vec![created[1].clone(), created[0].clone()]);

    let remaining: Vec<String> = f
        .manager
        .list_snapshots()
        .unwrap()
        .into_iter()
        .map(|s| s.id)
        .collect();
    assert_eq!(remaining, vec![created[4].clone(), created[3].clone(), created[2].clone()]);
}

#[tokio::test]
async fn prune_removes_snapshots_older_than_max_age() {
    let f = fixture(state_v1());
    let fresh = f
        .manager
        .create_snapshot("fresh", TriggerReason::Manual)
        .await
        .unwrap();

    let mut old: Snapshot = fresh.clone();
    old.id = "snapshot-old".to_string();
    old.created_at = fresh.created_at - jiff::SignedDuration::from_hours(24 * 30);
    std::fs::write(
        snapshot_file(&f, &old.id),
        serde_json::to_vec_pretty(&old).unwrap(),
    )
    .unwrap();

    let policy = RetentionPolicy::older_than(Duration::from_secs(7 * 24 * 3600));
    let deleted = f.manager.prune_snapshots(&policy).unwrap();
    assert_eq!(deleted, vec!["snapshot-old".to_string()]);
    assert!(snapshot_file(&f, &fresh.id).exists());
}

#[tokio::test]
async fn prune_removes_files_named_differently_from_their_id() {
    let f = fixture(state_v1());
    let original = f
        .manager
        .create_snapshot("original", TriggerReason::Manual)
        .await
        .unwrap();

    let mut old: Snapshot = original.clone();
    old.id = "snapshot-archived".to_string();
    old.created_at = original.created_at - jiff::SignedDuration::from_hours(24 * 30);
    let copy = f.manager.dir().join("backup-copy.json");
    std::fs::write(&copy, serde_json::to_vec_pretty(&old).unwrap()).unwrap();

    let listed = f.manager.list_snapshots().unwrap();
    assert_eq!(listed.last().unwrap().path, copy);

    let policy = RetentionPolicy::older_than(Duration::from_secs(7 * 24 * 3600));
    let deleted = f.manager.prune_snapshots(&policy).unwrap();
    assert_eq!(deleted, vec!["snapshot-archived".to_string()]);
    assert!(!copy.exists());
    assert!(snapshot_file(&f, &original.id).exists());

    let remaining = f.manager.list_snapshots().unwrap();
    assert_eq!(remaining.len(), 1);
    assert!(f.manager.prune_snapshots(&policy).unwrap().is_empty());
}

#[tokio::test]
async fn unbounded_policy_prunes_nothing() {
    let f = fixture(state_v1());
    f.manager
        .create_snapshot("keep", TriggerReason::Manual)
        .await
        .unwrap();
    assert!(f
        .manager
        .prune_snapshots(&RetentionPolicy::default())
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn corrupt_files_are_skipped_by_list() {
    let f = fixture(state_v1());
    let good = f
        .manager
        .create_snapshot("good", TriggerReason::Manual)
        .await
        .unwrap();
    std::fs::write(f.manager.dir().join("broken.json"), b"{ not json").unwrap();
    std::fs::write(f.manager.dir().join("notes.txt"), b"ignored").unwrap();

    let listed = f.manager.list_snapshots().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, good.id);
    assert!(listed[0].intact);
}

#[tokio::test]
async fn tampered_snapshot_is_refused() {
    let f = fixture(state_v1());
    let snapshot = f
        .manager
        .create_snapshot("v1", TriggerReason::Manual)
        .await
        .unwrap();
    f.store.save_state(&state_v2()).await.unwrap();

    let mut tampered = snapshot.clone();
    tampered
        .state
        .clusters
        .get_mut("a")
        .unwrap()
        .spec
        .control_plane
        .version = "9.99".to_string();
    std::fs::write(
        snapshot_file(&f, &snapshot.id),
        serde_json::to_vec_pretty(&tampered).unwrap(),
    )
    .unwrap();

    let err = f
        .manager
        .restore_snapshot(&snapshot.id, false)
        .await
        .unwrap_err();
    match err {
        EngineError::Integrity {
            snapshot_id,
            expected,
            actual,
        } => {
            assert_eq!(snapshot_id, snapshot.id);
            assert_eq!(expected, snapshot.checksum);
            assert_ne!(actual, expected);
        }
        other => panic!("expected integrity error, got {other:?}"),
    }
    assert_eq!(f.store.get_state().await.unwrap(), state_v2());
    assert!(!f.manager.list_snapshots().unwrap()[0].intact);
}

#[tokio::test]
async fn missing_and_invalid_ids_are_rejected() {
    let f = fixture(State::new());
    assert!(matches!(
        f.manager.restore_snapshot("snapshot-missing", true).await,
        Err(EngineError::SnapshotNotFound(_))
    ));
    assert!(matches!(
        f.manager.load_snapshot("../escape"),
        Err(EngineError::InvalidSnapshotId(_))
    ));
    assert!(matches!(
        f.manager.delete_snapshot("snapshot-missing"),
        Err(EngineError::SnapshotNotFound(_))
    ));
}

#[tokio::test]
async fn delete_removes_snapshot() {
    let f = fixture(state_v1());
    let s = f
        .manager
        .create_snapshot("temp", TriggerReason::Manual)
        .await
        .unwrap();
    f.manager.delete_snapshot(&s.id).unwrap();
    assert!(f.manager.list_snapshots().unwrap().is_empty());
}
