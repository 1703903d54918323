//! Built-in `CloudProvider` implementations.

pub mod simulated;
