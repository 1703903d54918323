mod common;

use std::collections::BTreeSet;

use provctl_core::{Cluster, ResourceKind, State};
use provctl_engine::{generate_plan, ActionKind, ActionType, FieldCheck, Planner, UpdatePolicy};
use serde_json::json;

use common::{cluster, desired};

fn ids_of(plan: &provctl_engine::Plan, action_type: ActionType) -> Vec<String> {
    plan.actions()
        .iter()
        .filter(|a| a.action_type() == action_type)
        .map(|a| a.resource.id.clone())
        .collect()
}

#[test]
fn identical_states_produce_empty_plan() {
    let state = desired([cluster("a", "1.28", &[("default", 2)])]);
    let plan = generate_plan(&state, &state);
    assert!(plan.is_empty());
    assert!(!plan.has_changes());
}

#[test]
fn empty_desired_against_empty_actual_is_empty() {
    assert!(generate_plan(&State::new(), &State::new()).is_empty());
}

#[test]
fn new_cluster_creates_cluster_then_pools() {
    let want = desired([cluster("a", "1.28", &[("web", 2), ("batch", 1)])]);
    let plan = generate_plan(&want, &State::new());

    let order: Vec<(ActionType, ResourceKind, String)> = plan
        .actions()
        .iter()
        .map(|a| (a.action_type(), a.resource.kind, a.resource.id.clone()))
        .collect();
    assert_eq!(
        order,
        vec![
            (ActionType::Create, ResourceKind::Cluster, "a".to_string()),
            (ActionType::Create, ResourceKind::NodePool, "a/batch".to_string()),
            (ActionType::Create, ResourceKind::NodePool, "a/web".to_string()),
        ]
    );
}

#[test]
fn version_change_plans_cluster_update_with_field_change() {
    let actual = desired([cluster("a", "1.28", &[("default", 2)])]);
    let want = desired([cluster("a", "1.29", &[("default", 2)])]);

    let plan = generate_plan(&want, &actual);
    assert_eq!(plan.len(), 1);
    let action = &plan.actions()[0];
    assert_eq!(action.resource.kind, ResourceKind::Cluster);
    let ActionKind::Update { changes, .. } = &action.kind else {
        panic!("expected update, got {:?}", action.kind);
    };
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].field, "controlPlane.version");
    assert_eq!(changes[0].expected, json!("1.29"));
    assert_eq!(changes[0].actual, json!("1.28"));
}

#[test]
fn pool_resize_plans_node_pool_update() {
    let actual = desired([cluster("a", "1.28", &[("default", 2)])]);
    let want = desired([cluster("a", "1.28", &[("default", 5)])]);

    let plan = generate_plan(&want, &actual);
    assert_eq!(ids_of(&plan, ActionType::Update), vec!["a/default"]);
    let ActionKind::Update { changes, .. } = &plan.actions()[0].kind else {
        panic!("expected update");
    };
    assert_eq!(changes[0].field, "desiredSize");
}

#[test]
fn changes_outside_policy_are_ignored() {
    let actual = desired([cluster("a", "1.28", &[("default", 2)])]);
    let mut want = actual.clone();
    want.clusters.get_mut("a").unwrap().spec.region = "eu-west-1".to_string();

    assert!(generate_plan(&want, &actual).is_empty());
}

#[test]
fn custom_policy_adds_checks() {
    let actual = desired([cluster("a", "1.28", &[])]);
    let mut want = actual.clone();
    want.clusters.get_mut("a").unwrap().spec.region = "eu-west-1".to_string();

    let policy = UpdatePolicy::default().with_cluster_check(FieldCheck::new("region", |c: &Cluster| {
        json!(c.spec.region)
    }));
    let plan = Planner::new(policy).plan(&want, &actual);
    assert_eq!(ids_of(&plan, ActionType::Update), vec!["a"]);
}

#[test]
fn removed_cluster_deletes_pools_before_cluster() {
    let actual = desired([
        cluster("a", "1.28", &[("default", 2)]),
        cluster("b", "1.28", &[("default", 2)]),
    ]);
    let want = desired([cluster("a", "1.28", &[("default", 2)])]);

    let plan = generate_plan(&want, &actual);
    let order: Vec<(ActionType, String)> = plan
        .actions()
        .iter()
        .map(|a| (a.action_type(), a.resource.id.clone()))
        .collect();
    assert_eq!(
        order,
        vec![
            (ActionType::Delete, "b/default".to_string()),
            (ActionType::Delete, "b".to_string()),
        ]
    );
}

#[test]
fn removed_pool_alone_is_deleted() {
    let actual = desired([cluster("a", "1.28", &[("web", 2), ("batch", 1)])]);
    let want = desired([cluster("a", "1.28", &[("web", 2)])]);

    let plan = generate_plan(&want, &actual);
    assert_eq!(ids_of(&plan, ActionType::Delete), vec!["a/batch"]);
    assert_eq!(plan.count(ActionType::Create), 0);
}

#[test]
fn mixed_plan_is_grouped_and_sorted() {
    let actual = desired([
        cluster("m", "1.27", &[("p", 1)]),
        cluster("z", "1.28", &[("p", 1)]),
    ]);
    let want = desired([
        cluster("b", "1.28", &[("p", 1)]),
        cluster("a", "1.28", &[("p", 1)]),
        cluster("m", "1.28", &[("p", 3)]),
    ]);

    let plan = generate_plan(&want, &actual);
    let order: Vec<(ActionType, String)> = plan
        .actions()
        .iter()
        .map(|a| (a.action_type(), a.resource.id.clone()))
        .collect();
    assert_eq!(
        order,
        vec![
            (ActionType::Create, "a".to_string()),
            (ActionType::Create, "b".to_string()),
            (ActionType::Create, "a/p".to_string()),
            (ActionType::Create, "b/p".to_string()),
            (ActionType::Update, "m".to_string()),
            (ActionType::Update, "m/p".to_string()),
            (ActionType::Delete, "z/p".to_string()),
            (ActionType::Delete, "z".to_string()),
        ]
    );
}

#[test]
fn action_sets_are_disjoint() {
    let actual = desired([
        cluster("keep", "1.27", &[("p", 1)]),
        cluster("gone", "1.28", &[("p", 1)]),
    ]);
    let want = desired([
        cluster("keep", "1.28", &[("p", 1)]),
        cluster("new", "1.28", &[("p", 1)]),
    ]);

    let plan = generate_plan(&want, &actual);
    let mut seen = BTreeSet::new();
    for action in plan.actions() {
        assert!(
            seen.insert((action.resource.kind, action.resource.id.clone())),
            "duplicate action for {}",
            action.resource
        );
    }
}

#[test]
fn plan_renders_summary() {
    let actual = desired([cluster("old", "1.28", &[])]);
    let want = desired([cluster("new", "1.28", &[])]);

    let rendered = generate_plan(&want, &actual).to_string();
    assert!(rendered.contains("+ Cluster new (new)"));
    assert!(rendered.contains("- Cluster old (old)"));
    assert!(rendered.contains("Plan: 1 to create, 0 to update, 1 to delete"));
}

#[test]
fn empty_plan_renders_up_to_date() {
    let state = desired([cluster("a", "1.28", &[])]);
    assert!(generate_plan(&state, &state)
        .to_string()
        .contains("No changes"));
}
