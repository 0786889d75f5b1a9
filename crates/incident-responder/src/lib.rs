//! Incident responder runtime.
//!
//! Wires the `coordination` stages into a single pipeline:
//! - [`config`]: TOML + environment configuration
//! - [`state_machine`]: legal phase transitions with a transition log
//! - [`orchestrator`]: `ResponseOrchestrator::handle`, the total entry point

pub mod config;
pub mod orchestrator;
pub mod state_machine;

pub use config::ResponderConfig;
pub use orchestrator::{OrchestratorBuilder, ResponseOrchestrator, ORCHESTRATOR_ACTOR};
pub use state_machine::{StateMachine, TransitionRecord};
