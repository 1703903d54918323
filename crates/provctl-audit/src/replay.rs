use provctl_core::{Event, EventKind, State};

/// Fold events, in order, into the state they describe.
///
/// Created/Updated upsert the recorded resource, Deleted removes it, Failed
/// changes nothing.
pub fn replay<'a>(events: impl IntoIterator<Item = &'a Event>) -> State {
    let mut state = State::default();
    for event in events {
        match &event.event {
            EventKind::Created(record) | EventKind::Updated(record) => {
                state.upsert(record.clone());
            }
            EventKind::Deleted => {
                state.remove(event.resource.kind, &event.resource.id);
            }
            EventKind::Failed { .. } => {}
        }
    }
    state
}
