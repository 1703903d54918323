//! Terminal rendering for command results.

use provctl_core::{Event, EventKind, State};
use provctl_engine::snapshot::ChangeAction;
use provctl_engine::{
    ApplySummary, DriftReport, RemediationReport, RemediationStatus, RestoreChange,
    RestoreResult, SnapshotInfo,
};
use serde::Serialize;
use tabled::settings::Style;
use tabled::{Table, Tabled};

#[derive(Tabled)]
struct ClusterRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "PROVIDER")]
    provider: String,
    #[tabled(rename = "REGION")]
    region: String,
    #[tabled(rename = "VERSION")]
    version: String,
    #[tabled(rename = "POOLS")]
    pools: usize,
    #[tabled(rename = "PHASE")]
    phase: String,
}

#[derive(Tabled)]
struct SnapshotRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "CREATED")]
    created_at: String,
    #[tabled(rename = "REASON")]
    reason: String,
    #[tabled(rename = "CLUSTERS")]
    clusters: usize,
    #[tabled(rename = "POOLS")]
    pools: usize,
    #[tabled(rename = "SIZE")]
    size: u64,
    #[tabled(rename = "OK")]
    intact: &'static str,
    #[tabled(rename = "DESCRIPTION")]
    description: String,
}

#[derive(Tabled)]
struct EventRow {
    #[tabled(rename = "TIME")]
    timestamp: String,
    #[tabled(rename = "TYPE")]
    event_type: String,
    #[tabled(rename = "RESOURCE")]
    resource: String,
    #[tabled(rename = "ACTOR")]
    actor: String,
    #[tabled(rename = "DETAIL")]
    detail: String,
}

#[derive(Tabled)]
struct DriftRow {
    #[tabled(rename = "SEVERITY")]
    severity: String,
    #[tabled(rename = "TYPE")]
    drift_type: String,
    #[tabled(rename = "RESOURCE")]
    resource: String,
    #[tabled(rename = "FIELD")]
    field: String,
    #[tabled(rename = "EXPECTED")]
    expected: String,
    #[tabled(rename = "ACTUAL")]
    actual: String,
    #[tabled(rename = "AUTO")]
    remediatable: &'static str,
}

fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}

fn render<T: Tabled>(rows: Vec<T>, empty: &str) {
    if rows.is_empty() {
        println!("{empty}");
    } else {
        println!("{}", Table::new(rows).with(Style::psql()));
    }
}

pub fn print_json<T: Serialize>(value: &T) -> eyre::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn print_clusters(state: &State) {
    let rows = state
        .clusters
        .values()
        .map(|c| ClusterRow {
            id: c.id.clone(),
            name: c.metadata.name.clone(),
            provider: c.spec.provider.clone(),
            region: c.spec.region.clone(),
            version: c.spec.control_plane.version.clone(),
            pools: state
                .node_pools
                .values()
                .filter(|p| p.spec.cluster_id == c.id)
                .count(),
            phase: c.status.phase.to_string(),
        })
        .collect();
    render::<ClusterRow>(rows, "No clusters.");
}

pub fn print_summary(summary: &ApplySummary) {
    if summary.changed() == 0 {
        println!("No changes. Infrastructure is up-to-date.");
        return;
    }
    println!(
        "Apply complete! Resources: {} created, {} updated, {} deleted.",
        summary.created, summary.updated, summary.deleted
    );
}

pub fn print_snapshots(snapshots: &[SnapshotInfo]) {
    let rows = snapshots
        .iter()
        .map(|s| SnapshotRow {
            id: s.id.clone(),
            created_at: s.created_at.to_string(),
            reason: s.trigger_reason.to_string(),
            clusters: s.cluster_count,
            pools: s.node_pool_count,
            size: s.size_bytes,
            intact: yes_no(s.intact),
            description: s.description.clone(),
        })
        .collect();
    render::<SnapshotRow>(rows, "No snapshots.");
}

pub fn print_events(events: &[Event]) {
    let rows = events
        .iter()
        .map(|e| EventRow {
            timestamp: e.timestamp.to_string(),
            event_type: e.event_type().to_string(),
            resource: e.resource.to_string(),
            actor: e.actor.clone(),
            detail: match &e.event {
                EventKind::Failed { error } => error.clone(),
                _ => String::new(),
            },
        })
        .collect();
    render::<EventRow>(rows, "No events.");
}

pub fn print_drift_report(report: &DriftReport) {
    for provider in &report.skipped_providers {
        println!("warning: live state of provider {provider} could not be read");
    }
    if !report.has_drift {
        println!("No drift detected.");
        return;
    }

    let rows = report
        .drifts
        .iter()
        .map(|d| DriftRow {
            severity: d.severity.to_string(),
            drift_type: d.drift_type.to_string(),
            resource: d.resource.to_string(),
            field: d.field.clone(),
            expected: d.expected.to_string(),
            actual: d.actual.to_string(),
            remediatable: yes_no(d.remediatable),
        })
        .collect();
    render::<DriftRow>(rows, "");

    let s = &report.summary;
    println!(
        "Drift: {} total ({} critical, {} high, {} medium, {} low), {} remediable.",
        s.total, s.critical, s.high, s.medium, s.low, s.remediatable
    );
}

pub fn print_remediation(report: &RemediationReport) {
    for outcome in &report.outcomes {
        match &outcome.status {
            RemediationStatus::Remediated => {
                println!("  fixed    {} ({})", outcome.resource, outcome.drift_type);
            }
            RemediationStatus::Skipped { reason } => {
                println!("  skipped  {} ({}): {reason}", outcome.resource, outcome.drift_type);
            }
            RemediationStatus::Failed { error } => {
                println!("  failed   {} ({}): {error}", outcome.resource, outcome.drift_type);
            }
        }
    }
    println!(
        "Remediation: {} remediated, {} skipped, {} failed.",
        report.remediated(),
        report.skipped(),
        report.failed()
    );
}

pub fn print_restore(result: &RestoreResult) {
    if result.dry_run {
        println!("Dry run: restoring {} would make these changes:", result.snapshot_id);
    } else {
        println!("Restored {}:", result.snapshot_id);
    }
    if result.changes.is_empty() {
        println!("  (no changes)");
    }
    for change in &result.changes {
        println!("  {:<7} {}", change.action.to_string(), change.resource);
    }
    if let Some(backup) = &result.backup_id {
        println!("Previous state saved as {backup}.");
    }
}

pub fn print_replay_divergence(changes: &[RestoreChange]) {
    if changes.is_empty() {
        println!("Event log replay matches persisted state.");
        return;
    }
    println!("Event log replay disagrees with persisted state:");
    for change in changes {
        let detail = match change.action {
            ChangeAction::Add => "only in event log",
            ChangeAction::Modify => "spec differs",
            ChangeAction::Remove => "only in state",
        };
        println!("  {:<18} {}", detail, change.resource);
    }
}
