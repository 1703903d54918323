use std::future::Future;
use std::pin::Pin;

use provctl_core::{Event, ResourceId, State};

use crate::error::AuditError;
use crate::replay::replay;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Append-only event log. Events are never mutated or deleted.
pub trait EventStore: Send + Sync {
    /// Append a batch of events as one unit: either every event in the
    /// batch is recorded or none of them is.
    fn record_events<'a>(&'a self, events: &'a [Event]) -> BoxFuture<'a, Result<(), AuditError>>;

    /// Append one event.
    fn record_event<'a>(&'a self, event: &'a Event) -> BoxFuture<'a, Result<(), AuditError>> {
        self.record_events(std::slice::from_ref(event))
    }

    /// Every event, in the order it was recorded.
    fn events(&self) -> BoxFuture<'_, Result<Vec<Event>, AuditError>>;

    /// Events for one resource, matched on `(kind, id)`.
    fn events_for<'a>(
        &'a self,
        resource: &'a ResourceId,
    ) -> BoxFuture<'a, Result<Vec<Event>, AuditError>> {
        Box::pin(async move {
            let events = self.events().await?;
            Ok(events
                .into_iter()
                .filter(|e| e.resource.same_resource(resource))
                .collect())
        })
    }

    /// Rebuild state from events recorded strictly after `since` (or from the
    /// whole log when `None`).
    fn replay_events(
        &self,
        since: Option<jiff::Timestamp>,
    ) -> BoxFuture<'_, Result<State, AuditError>> {
        Box::pin(async move {
            let events = self.events().await?;
            Ok(replay(
                events
                    .iter()
                    .filter(|e| since.is_none_or(|since| e.timestamp > since)),
            ))
        })
    }
}
