//! Incident Response Coordination Library
//!
//! This library provides the deterministic core of an automated incident
//! responder:
//! - Rule-based classification of raw failure messages
//! - Static escalation policy and resolution-time estimation
//! - Sequential capability/tool activation through injected registries
//! - Type-specific diagnostics, coordinated fixes and post-fix validation
//! - An in-memory response registry and an append-only JSONL incident log
//!
//! The pipeline that strings these together lives in the
//! `incident-responder` crate.
//!
//! # Pipeline
//!
//! ```text
//! message ─► classify ─► record ─► activate ─► diagnose ─► fix ─► validate
//!                                                                   │
//!                                          resolved / escalated ◄───┘ ─► persist
//! ```
//!
//! # Collaborators
//!
//! Everything that touches the outside world is a trait:
//! - `CapabilityRegistry` / `Capability` and `ToolRegistry`
//! - `ProcessRunner` for build, dependency and test tooling
//! - `FileReader` for manifests and routing files
//! - `ResponseStore` and `IncidentLog` for state and history

pub mod activation;
pub mod artifacts;
pub mod diagnostics;
pub mod error;
pub mod escalation;
pub mod events;
pub mod incident;
pub mod persistence;
pub mod process;
pub mod registry;
pub mod remediation;
pub mod router;
pub mod state;
pub mod verifier;

// Re-export the data model
pub use incident::{
    ActionResult, IllegalTransition, ImpactLevel, IncidentContext, IncidentType,
    PartialIncidentContext, PersistedResponse, ResponseAction, ResponseRecord, ResponseStatus,
    Severity,
};

// Re-export classification types
pub use router::{detect_affected_systems, Classification, IncidentClassifier};

// Re-export escalation policy
pub use escalation::{
    describe_escalation, initial_triggers, requires_initial_escalation, EscalationTrigger,
    ResolutionPolicy,
};

// Re-export collaborator seams
pub use artifacts::{FileReader, FsFileReader, ReadError};
pub use process::{ProcessError, ProcessOutput, ProcessRunner, TokioProcessRunner};
pub use registry::{
    ActivationContext, ActivationError, Capability, CapabilityOutcome, CapabilityRegistry,
    CapabilityStatus, CommandCapability, StaticCapabilityRegistry, ToolRegistry,
    TracingToolRegistry,
};

// Re-export pipeline stages
pub use activation::{ActivationOutcome, CapabilityActivator};
pub use diagnostics::{DiagnosticRoutine, DiagnosticsConfig, DiagnosticsEngine};
pub use remediation::{CapabilityDelegation, CommandFix, FixPlanner, FixStrategy};
pub use verifier::{ValidationPipeline, ValidationReport, Validator};

// Re-export state, events and persistence
pub use error::{CoordinationError, CoordinationResult};
pub use events::{EventBus, ResponseEvent, SharedEventBus};
pub use persistence::{read_records, IncidentLog, JsonlIncidentLog, PersistenceError};
pub use state::{InMemoryStore, ResponseStore, SharedResponseStore};
