//! Crate-level error type
//!
//! Pipeline phases never surface these to `handle()` callers; they are
//! rendered into failure actions on the timeline. The focused enums
//! (`ReadError`, `ProcessError`, `PersistenceError`, …) convert into
//! [`CoordinationError`] with `?`.

use std::any::Any;

use crate::artifacts::ReadError;
use crate::diagnostics::DiagnosticError;
use crate::persistence::PersistenceError;
use crate::process::ProcessError;
use crate::registry::ActivationError;

#[derive(Debug, Clone, thiserror::Error)]
pub enum CoordinationError {
    #[error("Capability {id} is not available in the registry")]
    CapabilityUnavailable { id: String },

    #[error("Capability {id} failed: {source}")]
    CapabilityFailed {
        id: String,
        #[source]
        source: ActivationError,
    },

    #[error("Tool {id} activation failed (non-fatal): {source}")]
    ToolActivation {
        id: String,
        #[source]
        source: ActivationError,
    },

    #[error("Capability {id} panicked: {message}")]
    CapabilityPanicked { id: String, message: String },

    #[error(transparent)]
    DiagnosticRead(#[from] ReadError),

    #[error(transparent)]
    Diagnostic(#[from] DiagnosticError),

    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error("Phase {phase} panicked: {message}")]
    PhasePanicked { phase: String, message: String },
}

pub type CoordinationResult<T> = Result<T, CoordinationError>;

/// Message carried by a caught panic payload
pub fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
