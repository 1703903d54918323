//! provctl library root.
//!
//! Re-exports the config, wiring, and rendering modules so integration
//! tests can exercise them without going through the command line.

pub mod config;
pub mod output;
pub mod setup;
