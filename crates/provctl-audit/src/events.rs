use provctl_core::{Event, EventKind};
use tracing::info;

/// Emit a recorded event via tracing.
///
/// The event store is the durable record; this is the operator-facing line
/// with the same identity fields.
pub fn emit(event: &Event) {
    let error = match &event.event {
        EventKind::Failed { error } => Some(error.as_str()),
        _ => None,
    };
    info!(
        audit.id = %event.id,
        audit.event_type = %event.event_type(),
        audit.provider = %event.resource.provider,
        audit.kind = %event.resource.kind,
        audit.resource_id = %event.resource.id,
        audit.actor = %event.actor,
        audit.error = error,
        "audit event"
    );
}
