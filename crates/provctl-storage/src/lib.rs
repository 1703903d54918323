//! provctl-storage
//!
//! The persistence boundary for provisioner state. Everything the engine
//! writes goes through [`StateManager`]; mutations are staged in a
//! [`StateTransaction`] and read-compare-write spans hold a [`StateLock`],
//! which for file-backed state also locks a sidecar file across processes.
//!
//! Backends:
//! - [`FileStateStore`]: JSON file on local disk, optionally mirrored to S3
//! - [`MemoryStateStore`]: in-process, for tests and dry runs

pub mod error;
pub mod local;
pub mod lockfile;
pub mod manager;
pub mod memory;
pub mod objects;
pub mod remote;
pub mod transaction;

pub use crate::error::StorageError;
pub use crate::local::FileStateStore;
pub use crate::lockfile::FileLock;
pub use crate::manager::{BoxFuture, StateLock, StateManager};
pub use crate::memory::MemoryStateStore;
pub use crate::remote::S3Mirror;
pub use crate::transaction::StateTransaction;
