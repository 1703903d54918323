use std::sync::atomic::{AtomicBool, Ordering};

use provctl_core::Event;
use tokio::sync::RwLock;

use crate::error::AuditError;
use crate::events::emit;
use crate::store::{BoxFuture, EventStore};

/// In-process event log.
#[derive(Default)]
pub struct MemoryEventStore {
    events: RwLock<Vec<Event>>,
    reject: AtomicBool,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent append fail.
    pub fn reject_events(&self, reject: bool) {
        self.reject.store(reject, Ordering::SeqCst);
    }

    pub async fn len(&self) -> usize {
        self.events.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.events.read().await.is_empty()
    }
}

impl EventStore for MemoryEventStore {
    fn record_events<'a>(&'a self, events: &'a [Event]) -> BoxFuture<'a, Result<(), AuditError>> {
        Box::pin(async move {
            if self.reject.load(Ordering::SeqCst) {
                return Err(AuditError::Rejected(format!(
                    "memory event store is rejecting writes ({} events)",
                    events.len()
                )));
            }
            self.events.write().await.extend_from_slice(events);
            for event in events {
                emit(event);
            }
            Ok(())
        })
    }

    fn events(&self) -> BoxFuture<'_, Result<Vec<Event>, AuditError>> {
        Box::pin(async move { Ok(self.events.read().await.clone()) })
    }
}
