//! provctl-audit
//!
//! Append-only audit log of everything the engine does to managed resources.
//! Every recorded event is also emitted through `tracing` so it shows up in
//! the operator's log stream. Replaying the log rebuilds a `State`, which is
//! diagnostic only: snapshots remain the authoritative restore path.

pub mod error;
pub mod events;
pub mod file;
pub mod memory;
pub mod replay;
pub mod store;

pub use crate::error::AuditError;
pub use crate::file::FileEventStore;
pub use crate::memory::MemoryEventStore;
pub use crate::replay::replay;
pub use crate::store::EventStore;
