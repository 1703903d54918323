use provctl_core::{
    node_pool_id, CoreError, Event, EventKind, EventType, Phase, ResourceId, ResourceKind,
    ResourceRecord, State,
};
use serde_json::json;

fn sample() -> serde_json::Value {
    json!({
        "clusters": {
            "prod": {
                "id": "prod",
                "metadata": { "name": "prod", "labels": { "team": "infra" } },
                "spec": {
                    "provider": "aws",
                    "region": "us-west-2",
                    "network": {
                        "vpcCidr": "10.0.0.0/16",
                        "availabilityZones": ["us-west-2a", "us-west-2b"]
                    },
                    "controlPlane": { "type": "managed", "version": "1.28", "count": 3, "ha": true },
                    "workerPools": [
                        { "name": "web", "instanceType": "m5.large", "minSize": 1, "maxSize": 5, "desiredSize": 2 },
                        {
                            "name": "batch",
                            "instanceType": "c5.xlarge",
                            "minSize": 0,
                            "maxSize": 10,
                            "desiredSize": 0,
                            "spot": { "enabled": true, "maxPrice": 0.12 }
                        }
                    ]
                }
            }
        }
    })
}

fn parse(value: serde_json::Value) -> State {
    State::from_json(&serde_json::to_vec(&value).unwrap()).unwrap()
}

#[test]
fn parses_camel_case_document() {
    let state = parse(sample());
    let cluster = &state.clusters["prod"];
    assert_eq!(cluster.spec.control_plane.version, "1.28");
    assert_eq!(cluster.spec.network.availability_zones.len(), 2);
    assert_eq!(cluster.status.phase, Phase::Pending);
    assert_eq!(
        cluster.spec.worker_pool("batch").and_then(|p| p.spot.as_ref()).and_then(|s| s.max_price),
        Some(0.12)
    );
}

#[test]
fn expand_worker_pools_adds_node_pools_once() {
    let mut state = parse(sample());
    state.expand_worker_pools();
    assert_eq!(state.node_pool_count(), 2);

    let web = &state.node_pools[&node_pool_id("prod", "web")];
    assert_eq!(web.id, "prod/web");
    assert_eq!(web.spec.cluster_id, "prod");
    assert_eq!(web.spec.provider, "aws");
    assert_eq!(web.spec.pool.desired_size, 2);

    let mut resized = state.clone();
    resized
        .node_pools
        .get_mut("prod/web")
        .unwrap()
        .spec
        .pool
        .desired_size = 4;
    resized.expand_worker_pools();
    assert_eq!(resized.node_pools["prod/web"].spec.pool.desired_size, 4);
}

#[test]
fn key_mismatch_is_rejected() {
    let mut value = sample();
    value["clusters"]["prod"]["id"] = json!("staging");
    let err = State::from_json(&serde_json::to_vec(&value).unwrap()).unwrap_err();
    assert!(matches!(
        err,
        CoreError::KeyMismatch { kind: ResourceKind::Cluster, .. }
    ));
}

#[test]
fn serialization_is_deterministic() {
    let state = parse(sample());
    let first = serde_json::to_string(&state).unwrap();
    let reparsed: State = serde_json::from_str(&first).unwrap();
    assert_eq!(serde_json::to_string(&reparsed).unwrap(), first);
}

#[test]
fn for_provider_filters_resources() {
    let mut state = parse(sample());
    state.expand_worker_pools();
    assert_eq!(state.for_provider("aws"), state);
    assert!(state.for_provider("azure").is_empty());
}

#[test]
fn upsert_and_remove_by_kind() {
    let mut state = parse(sample());
    let cluster = state.clusters["prod"].clone();

    let removed = state.remove(ResourceKind::Cluster, "prod");
    assert!(matches!(removed, Some(ResourceRecord::Cluster(_))));
    assert!(!state.contains(ResourceKind::Cluster, "prod"));

    state.upsert(ResourceRecord::Cluster(cluster));
    assert!(state.contains(ResourceKind::Cluster, "prod"));
    assert!(state.remove(ResourceKind::NodePool, "prod/missing").is_none());
}

#[test]
fn orphaned_node_pools_are_reported() {
    let mut state = parse(sample());
    state.expand_worker_pools();
    state.clusters.clear();
    assert_eq!(state.orphaned_node_pools().len(), 2);
}

#[test]
fn phase_transitions_follow_lifecycle() {
    assert!(Phase::Pending.can_transition_to(Phase::Provisioning));
    assert!(Phase::Provisioning.can_transition_to(Phase::Running));
    assert!(Phase::Running.can_transition_to(Phase::Updating));
    assert!(Phase::Updating.can_transition_to(Phase::Failed));
    assert!(Phase::Failed.can_transition_to(Phase::Provisioning));
    assert!(!Phase::Running.can_transition_to(Phase::Provisioning));
    assert!(!Phase::Pending.can_transition_to(Phase::Running));
    assert!(Phase::Deleting.is_in_flight());
    assert!(!Phase::Running.is_in_flight());
}

#[test]
fn event_payload_is_typed_and_tagged() {
    let state = parse(sample());
    let cluster = state.clusters["prod"].clone();
    let event = Event::new(
        cluster.resource_id(),
        "tester",
        EventKind::Created(ResourceRecord::Cluster(cluster)),
    );
    assert_eq!(event.event_type(), EventType::Created);

    let value = serde_json::to_value(&event).unwrap();
    assert_eq!(value["event"]["type"], "Created");
    assert_eq!(value["event"]["payload"]["kind"], "Cluster");
    assert_eq!(value["resource"]["kind"], "Cluster");

    let failed = Event::new(
        ResourceId::node_pool("aws", "prod/web", "web"),
        "tester",
        EventKind::Failed {
            error: "quota exceeded".into(),
        },
    );
    let value = serde_json::to_value(&failed).unwrap();
    assert_eq!(value["event"]["payload"]["error"], "quota exceeded");
}

#[test]
fn resource_id_display_and_identity() {
    let a = ResourceId::cluster("aws", "prod", "prod");
    let b = ResourceId::cluster("azure", "prod", "renamed");
    assert_eq!(a.to_string(), "aws:Cluster/prod");
    assert!(a.same_resource(&b));
    assert!(!a.same_resource(&ResourceId::node_pool("aws", "prod", "prod")));
}
