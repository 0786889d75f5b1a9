//! Response State Machine — legal phase transitions with an audit log.
//!
//! Wraps a [`ResponseRecord`]'s status so that:
//! 1. Every transition is checked against the response state graph.
//! 2. Every transition is traced and kept in a transition log.
//! 3. A run can be summarized (`responding → … → resolved`) for logs.
//!
//! The state graph itself is owned by [`ResponseStatus::can_transition_to`]:
//! ```text
//! Responding → Investigating → Fixing → Testing → Resolved
//!                                              └→ Escalated
//! ```

use std::time::Instant;

use coordination::incident::{IllegalTransition, ResponseRecord, ResponseStatus};
use serde::{Deserialize, Serialize};

/// A single recorded phase transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionRecord {
    pub from: ResponseStatus,
    pub to: ResponseStatus,
    /// Milliseconds since the state machine was created.
    pub elapsed_ms: u64,
    pub reason: String,
}

/// Drives one record through its phases.
pub struct StateMachine {
    created_at: Instant,
    transitions: Vec<TransitionRecord>,
}

impl StateMachine {
    pub fn new() -> Self {
        Self {
            created_at: Instant::now(),
            transitions: Vec::new(),
        }
    }

    /// Move `record` to `to`, logging the transition.
    ///
    /// Returns the recorded transition, or `IllegalTransition` (with the
    /// record untouched) if the edge does not exist.
    pub fn advance(
        &mut self,
        record: &mut ResponseRecord,
        to: ResponseStatus,
        reason: impl Into<String>,
    ) -> Result<TransitionRecord, IllegalTransition> {
        let from = record.transition(to)?;
        let transition = TransitionRecord {
            from,
            to,
            elapsed_ms: self.elapsed_ms(),
            reason: reason.into(),
        };

        tracing::debug!(
            response_id = record.response_id(),
            from = %from,
            to = %to,
            reason = %transition.reason,
            "State transition"
        );

        self.transitions.push(transition.clone());
        Ok(transition)
    }

    pub fn transitions(&self) -> &[TransitionRecord] {
        &self.transitions
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.created_at.elapsed().as_millis() as u64
    }

    /// Get a summary string of the state machine's history.
    pub fn summary(&self) -> String {
        let mut states = vec![ResponseStatus::Responding.to_string()];
        states.extend(self.transitions.iter().map(|t| t.to.to_string()));
        format!(
            "{} ({}ms, {} transitions)",
            states.join(" → "),
            self.elapsed_ms(),
            self.transitions.len()
        )
    }
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}
