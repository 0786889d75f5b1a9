//! Event types for incident response progress
//!
//! Published on the [`EventBus`](super::EventBus) as a pipeline moves
//! through its phases.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::incident::{IncidentType, ResponseStatus, Severity};

/// All response lifecycle events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseEvent {
    /// A record was created for a classified incident
    ResponseStarted {
        response_id: String,
        incident_type: IncidentType,
        severity: Severity,
        escalation_required: bool,
        timestamp: DateTime<Utc>,
    },

    /// The record moved to the next phase
    PhaseTransition {
        response_id: String,
        from: ResponseStatus,
        to: ResponseStatus,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// The record reached a terminal status
    ResponseCompleted {
        response_id: String,
        status: ResponseStatus,
        escalation_required: bool,
        resolution_time_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// The terminal record could not be appended to the incident log
    PersistenceFailed {
        response_id: String,
        error: String,
        timestamp: DateTime<Utc>,
    },
}

impl ResponseEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::ResponseStarted { .. } => "response_started",
            Self::PhaseTransition { .. } => "phase_transition",
            Self::ResponseCompleted { .. } => "response_completed",
            Self::PersistenceFailed { .. } => "persistence_failed",
        }
    }

    pub fn response_id(&self) -> &str {
        match self {
            Self::ResponseStarted { response_id, .. }
            | Self::PhaseTransition { response_id, .. }
            | Self::ResponseCompleted { response_id, .. }
            | Self::PersistenceFailed { response_id, .. } => response_id,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::ResponseStarted { timestamp, .. }
            | Self::PhaseTransition { timestamp, .. }
            | Self::ResponseCompleted { timestamp, .. }
            | Self::PersistenceFailed { timestamp, .. } => *timestamp,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::ResponseCompleted { .. })
    }
}
