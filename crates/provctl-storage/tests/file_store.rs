use std::sync::Arc;
use std::time::Duration;

use provctl_core::{
    Cluster, ClusterSpec, ControlPlaneSpec, Resource, ResourceMetadata, State,
};
use provctl_storage::{FileStateStore, MemoryStateStore, StateManager, StorageError};

fn cluster(id: &str, version: &str) -> Cluster {
    Resource {
        id: id.to_string(),
        metadata: ResourceMetadata::named(id),
        spec: ClusterSpec {
            provider: "aws".to_string(),
            region: "us-east-1".to_string(),
            control_plane: ControlPlaneSpec {
                version: version.to_string(),
                ..ControlPlaneSpec::default()
            },
            ..ClusterSpec::default()
        },
        status: Default::default(),
    }
}

#[tokio::test]
async fn missing_file_reads_as_empty_state() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStateStore::new(dir.path().join("state.json"));
    assert!(store.get_state().await.unwrap().is_empty());
}

#[tokio::test]
async fn save_then_load_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("state.json");
    let store = FileStateStore::new(&path);
    let state = State::new().with_cluster(cluster("a", "1.28"));

    store.save_state(&state).await.unwrap();
    assert!(path.exists());
    assert!(!path.with_extension("json.tmp").exists());

    let reopened = FileStateStore::new(&path);
    assert_eq!(reopened.get_state().await.unwrap(), state);
}

#[tokio::test]
async fn corrupt_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    std::fs::write(&path, b"{\"clusters\": 42}").unwrap();

    let store = FileStateStore::new(&path);
    assert!(matches!(
        store.get_state().await,
        Err(StorageError::InvalidState(_))
    ));
}

#[tokio::test]
async fn memory_store_rejects_invalid_state() {
    let store = MemoryStateStore::default();
    let mut state = State::new();
    state.clusters.insert("wrong-key".to_string(), cluster("a", "1.28"));

    assert!(store.save_state(&state).await.is_err());
    assert!(store.get_state().await.unwrap().is_empty());
    assert_eq!(store.save_count(), 0);
}

#[tokio::test]
async fn lock_serializes_holders() {
    let store = Arc::new(MemoryStateStore::default());
    let held = store.lock().await.unwrap();

    let contender = Arc::clone(&store);
    let waiter = tokio::spawn(async move {
        let _lock = contender.lock().await.unwrap();
    });

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!waiter.is_finished());

    held.unlock();
    tokio::time::timeout(Duration::from_secs(5), waiter)
        .await
        .expect("waiter acquires the lock after release")
        .unwrap();
}

#[cfg(unix)]
#[tokio::test]
async fn file_lock_excludes_other_stores_on_the_same_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    let first = FileStateStore::new(&path);
    let second = FileStateStore::new(&path);

    let held = first.lock().await.unwrap();
    assert!(first.lock_path().exists());

    let waiter = tokio::spawn(async move {
        let lock = second.lock().await.unwrap();
        second
            .save_state(&State::new().with_cluster(cluster("b", "1.28")))
            .await
            .unwrap();
        lock.unlock();
    });

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!waiter.is_finished());
    first
        .save_state(&State::new().with_cluster(cluster("a", "1.28")))
        .await
        .unwrap();

    held.unlock();
    tokio::time::timeout(Duration::from_secs(5), waiter)
        .await
        .expect("second store acquires the lock after release")
        .unwrap();

    let state = first.get_state().await.unwrap();
    assert!(state.clusters.contains_key("b"));
    assert!(!state.clusters.contains_key("a"));
}
