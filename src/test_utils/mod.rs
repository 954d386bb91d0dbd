//! Helpers for exercising handles without a running cluster.

pub mod memory;

pub use memory::{ConnectGate, MemoryClient, MemoryDriver};
