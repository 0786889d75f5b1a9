//! Response state registry
//!
//! Holds the latest snapshot of every response handled by this process.
//! The orchestrator writes a snapshot after each phase transition, so
//! readers observe in-flight responses as well as finished ones.
//!
//! Durable history lives in the append-only incident log
//! (see [`crate::persistence`]), not here.

pub mod store;

pub use store::{InMemoryStore, ResponseStore, SharedResponseStore};
