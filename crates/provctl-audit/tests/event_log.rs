use provctl_audit::{replay, AuditError, EventStore, FileEventStore, MemoryEventStore};
use provctl_core::{
    Cluster, ClusterSpec, ControlPlaneSpec, Event, EventKind, EventType, Resource,
    ResourceMetadata, ResourceRecord,
};

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

fn created(c: &Cluster) -> Event {
    Event::new(
        c.resource_id(),
        "tester",
        EventKind::Created(ResourceRecord::Cluster(c.clone())),
    )
}

fn updated(c: &Cluster) -> Event {
    Event::new(
        c.resource_id(),
        "tester",
        EventKind::Updated(ResourceRecord::Cluster(c.clone())),
    )
}

fn deleted(c: &Cluster) -> Event {
    Event::new(c.resource_id(), "tester", EventKind::Deleted)
}

#[tokio::test]
async fn file_log_appends_and_reads_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileEventStore::new(dir.path().join("audit").join("events.jsonl"));
    let a = cluster("a", "1.28");
    let b = cluster("b", "1.28");

    let events = vec![created(&a), created(&b), deleted(&a)];
    for event in &events {
        store.record_event(event).await.unwrap();
    }

    assert_eq!(store.events().await.unwrap(), events);

    let contents = std::fs::read_to_string(store.path()).unwrap();
    assert_eq!(contents.lines().count(), 3);
}

#[tokio::test]
async fn events_for_filters_by_resource() {
    let store = MemoryEventStore::new();
    let a = cluster("a", "1.28");
    let b = cluster("b", "1.28");
    store.record_event(&created(&a)).await.unwrap();
    store.record_event(&created(&b)).await.unwrap();
    store.record_event(&updated(&a)).await.unwrap();

    let for_a = store.events_for(&a.resource_id()).await.unwrap();
    let types: Vec<EventType> = for_a.iter().map(|e| e.event_type()).collect();
    assert_eq!(types, vec![EventType::Created, EventType::Updated]);
}

#[tokio::test]
async fn replay_rebuilds_state() {
    let store = MemoryEventStore::new();
    let a = cluster("a", "1.28");
    let b = cluster("b", "1.28");
    let a2 = cluster("a", "1.29");

    for event in [created(&a), created(&b), updated(&a2), deleted(&b)] {
        store.record_event(&event).await.unwrap();
    }
    store
        .record_event(&Event::new(
            b.resource_id(),
            "tester",
            EventKind::Failed {
                error: "boom".into(),
            },
        ))
        .await
        .unwrap();

    let state = store.replay_events(None).await.unwrap();
    assert_eq!(state.cluster_count(), 1);
    assert_eq!(state.clusters["a"].spec.control_plane.version, "1.29");
}

#[tokio::test]
async fn replay_since_skips_older_events() {
    let store = MemoryEventStore::new();
    let first = created(&cluster("a", "1.28"));
    store.record_event(&first).await.unwrap();
    let second = created(&cluster("b", "1.28"));
    store.record_event(&second).await.unwrap();

    let state = store.replay_events(Some(first.timestamp)).await.unwrap();
    if second.timestamp > first.timestamp {
        assert!(!state.clusters.contains_key("a"));
        assert!(state.clusters.contains_key("b"));
    }
    assert_eq!(replay([&first, &second]).cluster_count(), 2);
}

#[tokio::test]
async fn corrupt_line_is_reported_with_its_number() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("events.jsonl");
    let store = FileEventStore::new(&path);
    store.record_event(&created(&cluster("a", "1.28"))).await.unwrap();

    let mut contents = std::fs::read_to_string(&path).unwrap();
    contents.push_str("not an event\n");
    std::fs::write(&path, contents).unwrap();

    match store.events().await {
        Err(AuditError::CorruptLog { line, .. }) => assert_eq!(line, 2),
        other => panic!("expected corrupt log error, got {other:?}"),
    }
}

#[tokio::test]
async fn rejecting_store_fails_writes() {
    let store = MemoryEventStore::new();
    store.reject_events(true);
    assert!(store.record_event(&created(&cluster("a", "1.28"))).await.is_err());
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn batch_is_written_as_whole_lines() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileEventStore::new(dir.path().join("events.jsonl"));
    let a = cluster("a", "1.28");
    store.record_event(&created(&a)).await.unwrap();

    let batch = vec![updated(&cluster("a", "1.29")), created(&cluster("b", "1.28"))];
    store.record_events(&batch).await.unwrap();
    store.record_events(&[]).await.unwrap();

    let events = store.events().await.unwrap();
    assert_eq!(events.len(), 3);
    assert_eq!(&events[1..], batch.as_slice());

    let contents = std::fs::read_to_string(store.path()).unwrap();
    assert!(contents.ends_with('\n'));
    assert_eq!(contents.lines().count(), 3);
}

#[tokio::test]
async fn rejected_batch_records_nothing() {
    let store = MemoryEventStore::new();
    store.record_event(&created(&cluster("a", "1.28"))).await.unwrap();

    store.reject_events(true);
    let batch = vec![deleted(&cluster("a", "1.28")), created(&cluster("b", "1.28"))];
    assert!(store.record_events(&batch).await.is_err());
    assert_eq!(store.len().await, 1);

    store.reject_events(false);
    store.record_events(&batch).await.unwrap();
    assert_eq!(store.len().await, 3);
}
