mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use provctl_engine::controller::{run_periodic, DesiredStateSource, FileDesiredState};
use provctl_engine::{DriftWatcher, Reconciler};
use tokio::sync::watch;

use common::{cluster, desired, Harness};

#[tokio::test]
async fn periodic_loop_stops_on_shutdown() {
    let (tx, rx) = watch::channel(false);
    let cycles = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&cycles);
    let handle = tokio::spawn(async move {
        run_periodic("test", Duration::from_millis(10), rx, move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        })
        .await;
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("loop exits after shutdown")
        .unwrap();

    // The first tick fires immediately.
    assert!(cycles.load(Ordering::SeqCst) >= 1);
}

#[tokio::test]
async fn periodic_loop_never_starts_when_already_shut_down() {
    let (_tx, rx) = watch::channel(true);
    let cycles = AtomicUsize::new(0);
    let counter = &cycles;
    run_periodic("test", Duration::from_millis(10), rx, move || async move {
        counter.fetch_add(1, Ordering::SeqCst);
    })
    .await;
    assert_eq!(cycles.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn reconciler_cycle_converges() {
    let h = Harness::new();
    let want = desired([cluster("a", "1.28", &[("default", 2)])]);
    let reconciler = Reconciler::new(
        Arc::clone(&h.engine),
        Arc::new(want.clone()),
        Duration::from_secs(60),
    );

    let first = reconciler.run_once().await.unwrap();
    assert_eq!(first.created, 2);
    let second = reconciler.run_once().await.unwrap();
    assert_eq!(second.changed(), 0);
}

#[tokio::test]
async fn drift_watcher_remediates_when_enabled() {
    let h = Harness::new();
    let want = desired([cluster("a", "1.28", &[("default", 2)])]);
    h.engine.reconcile(&want).await.unwrap();
    h.provider.resize_pool_out_of_band("a", "default", 5).unwrap();

    let watcher = DriftWatcher::new(h.detector(), Arc::new(want.clone()), Duration::from_secs(60))
        .with_auto_remediate(true);
    watcher.run_once().await.unwrap();

    let report = h.detector().detect_drift(&want).await.unwrap();
    assert!(!report.has_drift);
}

#[tokio::test]
async fn file_source_expands_worker_pools() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("desired.json");
    let mut doc = desired([cluster("a", "1.28", &[("default", 2)])]);
    doc.node_pools.clear();
    std::fs::write(&path, serde_json::to_vec_pretty(&doc).unwrap()).unwrap();

    let loaded = FileDesiredState::new(&path).load().await.unwrap();
    assert!(loaded.node_pools.contains_key("a/default"));
}
