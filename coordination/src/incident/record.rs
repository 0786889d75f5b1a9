//! Response Record — the auditable trail of one incident response
//!
//! The record is the only mutable state of a pipeline run. Fields that carry
//! invariants (timeline, status, escalation flag, capability and tool lists)
//! are private and can only grow through the methods below:
//!
//! - `record()` appends to the timeline, clamping timestamps so they never go
//!   backwards.
//! - `require_escalation()` can only set the flag, never clear it.
//! - `transition()` only follows edges of the response state graph.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::types::{IncidentContext, IncidentType, Severity};

/// Outcome of a single timeline action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionResult {
    Success,
    Failure,
    Partial,
    Pending,
}

impl std::fmt::Display for ActionResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Failure => write!(f, "failure"),
            Self::Partial => write!(f, "partial"),
            Self::Pending => write!(f, "pending"),
        }
    }
}

/// One entry in a response timeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseAction {
    pub timestamp: DateTime<Utc>,
    /// Capability, tool, or system component that performed the action
    pub actor: String,
    /// Short label, e.g. `capability-activation` or `build-check`
    pub action: String,
    pub result: ActionResult,
    pub details: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_actions: Option<Vec<String>>,
}

impl ResponseAction {
    pub fn new(
        actor: impl Into<String>,
        action: impl Into<String>,
        result: ActionResult,
        details: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            actor: actor.into(),
            action: action.into(),
            result,
            details: details.into(),
            next_actions: None,
        }
    }

    pub fn success(
        actor: impl Into<String>,
        action: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self::new(actor, action, ActionResult::Success, details)
    }

    pub fn failure(
        actor: impl Into<String>,
        action: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self::new(actor, action, ActionResult::Failure, details)
    }

    pub fn partial(
        actor: impl Into<String>,
        action: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self::new(actor, action, ActionResult::Partial, details)
    }

    /// Attach suggested remediation steps (empty lists are dropped)
    pub fn with_next_actions<I, S>(mut self, next: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let next: Vec<String> = next.into_iter().map(Into::into).collect();
        self.next_actions = if next.is_empty() { None } else { Some(next) };
        self
    }

    pub fn is_failure(&self) -> bool {
        self.result == ActionResult::Failure
    }
}

/// Phases of a response, in the only order they may be visited
///
/// ```text
/// responding → investigating → fixing → testing → resolved
///                                              └→ escalated
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    Responding,
    Investigating,
    Fixing,
    Testing,
    Resolved,
    Escalated,
}

impl ResponseStatus {
    /// Terminal states are absorbing
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Resolved | Self::Escalated)
    }

    /// Whether `self → to` is an edge of the response state graph
    pub fn can_transition_to(self, to: ResponseStatus) -> bool {
        use ResponseStatus::*;
        matches!(
            (self, to),
            (Responding, Investigating)
                | (Investigating, Fixing)
                | (Fixing, Testing)
                | (Testing, Resolved)
                | (Testing, Escalated)
        )
    }
}

impl std::fmt::Display for ResponseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Responding => write!(f, "responding"),
            Self::Investigating => write!(f, "investigating"),
            Self::Fixing => write!(f, "fixing"),
            Self::Testing => write!(f, "testing"),
            Self::Resolved => write!(f, "resolved"),
            Self::Escalated => write!(f, "escalated"),
        }
    }
}

/// Attempted to leave a state along an edge that does not exist
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Illegal response transition: {from} → {to}")]
pub struct IllegalTransition {
    pub from: ResponseStatus,
    pub to: ResponseStatus,
}

/// Full state of one incident response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseRecord {
    response_id: String,
    incident: IncidentContext,
    activated_capabilities: Vec<String>,
    tools_activated: Vec<String>,
    timeline: Vec<ResponseAction>,
    estimated_resolution_minutes: u32,
    escalation_required: bool,
    status: ResponseStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    resolution: Option<String>,
    created_at: DateTime<Utc>,
}

impl ResponseRecord {
    /// Create a record in the `responding` state with a fresh id
    pub fn new(
        incident: IncidentContext,
        estimated_resolution_minutes: u32,
        escalation_required: bool,
    ) -> Self {
        Self {
            response_id: new_response_id(),
            incident,
            activated_capabilities: Vec::new(),
            tools_activated: Vec::new(),
            timeline: Vec::new(),
            estimated_resolution_minutes,
            escalation_required,
            status: ResponseStatus::Responding,
            resolution: None,
            created_at: Utc::now(),
        }
    }

    pub fn response_id(&self) -> &str {
        &self.response_id
    }

    pub fn incident(&self) -> &IncidentContext {
        &self.incident
    }

    pub fn incident_type(&self) -> IncidentType {
        self.incident.incident_type
    }

    pub fn severity(&self) -> Severity {
        self.incident.severity
    }

    pub fn activated_capabilities(&self) -> &[String] {
        &self.activated_capabilities
    }

    pub fn tools_activated(&self) -> &[String] {
        &self.tools_activated
    }

    pub fn timeline(&self) -> &[ResponseAction] {
        &self.timeline
    }

    pub fn estimated_resolution_minutes(&self) -> u32 {
        self.estimated_resolution_minutes
    }

    pub fn escalation_required(&self) -> bool {
        self.escalation_required
    }

    pub fn status(&self) -> ResponseStatus {
        self.status
    }

    pub fn resolution(&self) -> Option<&str> {
        self.resolution.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Append an action to the timeline
    ///
    /// The stored timestamp is never earlier than the previous entry's.
    pub fn record(&mut self, mut action: ResponseAction) -> &ResponseAction {
        if let Some(last) = self.timeline.last() {
            if action.timestamp < last.timestamp {
                action.timestamp = last.timestamp;
            }
        }
        self.timeline.push(action);
        &self.timeline[self.timeline.len() - 1]
    }

    /// Append several actions in order
    pub fn record_all(&mut self, actions: impl IntoIterator<Item = ResponseAction>) {
        for action in actions {
            self.record(action);
        }
    }

    /// Mark a capability as activated (order preserved, no duplicates)
    pub fn add_capability(&mut self, capability_id: impl Into<String>) {
        let id = capability_id.into();
        if !self.activated_capabilities.contains(&id) {
            self.activated_capabilities.push(id);
        }
    }

    /// Mark a tool as activated (set semantics, insertion order preserved)
    pub fn add_tool(&mut self, tool_id: impl Into<String>) {
        let id = tool_id.into();
        if !self.tools_activated.contains(&id) {
            self.tools_activated.push(id);
        }
    }

    /// Flag the record for escalation; there is no way to clear it
    pub fn require_escalation(&mut self) {
        self.escalation_required = true;
    }

    /// Move to the next status, returning the previous one
    pub fn transition(&mut self, to: ResponseStatus) -> Result<ResponseStatus, IllegalTransition> {
        let from = self.status;
        if !from.can_transition_to(to) {
            return Err(IllegalTransition { from, to });
        }
        self.status = to;
        Ok(from)
    }

    pub fn set_resolution(&mut self, resolution: impl Into<String>) {
        self.resolution = Some(resolution.into());
    }

    /// Snapshot in the shape written to the incident log
    pub fn to_persisted(&self, resolution_time_ms: u64) -> PersistedResponse {
        PersistedResponse {
            response_id: self.response_id.clone(),
            incident_type: self.incident.incident_type,
            severity: self.incident.severity,
            resolution_time_ms,
            status: self.status,
            escalation_required: self.escalation_required,
            resolution: self.resolution.clone(),
            activated_capabilities: self.activated_capabilities.clone(),
            tools_activated: self.tools_activated.clone(),
            timeline: self.timeline.clone(),
        }
    }
}

/// One line of the append-only incident log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedResponse {
    pub response_id: String,
    pub incident_type: IncidentType,
    pub severity: Severity,
    pub resolution_time_ms: u64,
    pub status: ResponseStatus,
    pub escalation_required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
    pub activated_capabilities: Vec<String>,
    pub tools_activated: Vec<String>,
    pub timeline: Vec<ResponseAction>,
}

fn new_response_id() -> String {
    format!("resp-{}", Uuid::new_v4())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::incident::types::ImpactLevel;
    use std::collections::BTreeSet;

    fn incident() -> IncidentContext {
        IncidentContext {
            incident_type: IncidentType::BuildFailure,
            severity: Severity::High,
            error_message: "Build failed".to_string(),
            affected_systems: BTreeSet::from(["build".to_string()]),
            detected_at: Utc::now(),
            user_impact: ImpactLevel::Medium,
            business_impact: ImpactLevel::Medium,
            stack_trace: None,
            affected_files: None,
        }
    }

    #[test]
    fn test_response_ids_are_unique() {
        let a = ResponseRecord::new(incident(), 10, false);
        let b = ResponseRecord::new(incident(), 10, false);
        assert_ne!(a.response_id(), b.response_id());
        assert!(a.response_id().starts_with("resp-"));
    }

    #[test]
    fn test_timeline_timestamps_never_go_backwards() {
        let mut record = ResponseRecord::new(incident(), 10, false);
        record.record(ResponseAction::success("system", "first", "ok"));

        let mut stale = ResponseAction::success("system", "second", "ok");
        stale.timestamp = Utc::now() - chrono::Duration::hours(1);
        record.record(stale);

        let timeline = record.timeline();
        assert_eq!(timeline.len(), 2);
        assert!(timeline[1].timestamp >= timeline[0].timestamp);
    }

    #[test]
    fn test_escalation_flag_is_monotonic() {
        let mut record = ResponseRecord::new(incident(), 10, false);
        assert!(!record.escalation_required());
        record.require_escalation();
        record.require_escalation();
        assert!(record.escalation_required());
    }

    #[test]
    fn test_legal_transition_path() {
        let mut record = ResponseRecord::new(incident(), 10, false);
        record.transition(ResponseStatus::Investigating).unwrap();
        record.transition(ResponseStatus::Fixing).unwrap();
        record.transition(ResponseStatus::Testing).unwrap();
        let from = record.transition(ResponseStatus::Escalated).unwrap();
        assert_eq!(from, ResponseStatus::Testing);
        assert!(record.is_terminal());
    }

    #[test]
    fn test_illegal_transitions_rejected() {
        let mut record = ResponseRecord::new(incident(), 10, false);
        let err = record.transition(ResponseStatus::Resolved).unwrap_err();
        assert_eq!(err.from, ResponseStatus::Responding);
        assert_eq!(record.status(), ResponseStatus::Responding);

        record.transition(ResponseStatus::Investigating).unwrap();
        record.transition(ResponseStatus::Fixing).unwrap();
        record.transition(ResponseStatus::Testing).unwrap();
        record.transition(ResponseStatus::Resolved).unwrap();

        // Terminal states absorb
        assert!(record.transition(ResponseStatus::Escalated).is_err());
        assert!(record.transition(ResponseStatus::Investigating).is_err());
    }

    #[test]
    fn test_capabilities_and_tools_deduplicate() {
        let mut record = ResponseRecord::new(incident(), 10, false);
        record.add_capability("platform-engineer");
        record.add_capability("platform-engineer");
        record.add_tool("build-runner");
        record.add_tool("build-runner");
        record.add_tool("test-runner");
        assert_eq!(record.activated_capabilities(), ["platform-engineer"]);
        assert_eq!(record.tools_activated(), ["build-runner", "test-runner"]);
    }

    #[test]
    fn test_empty_next_actions_are_dropped() {
        let action = ResponseAction::success("a", "b", "c").with_next_actions(Vec::<String>::new());
        assert!(action.next_actions.is_none());

        let json = serde_json::to_value(&action).unwrap();
        assert!(json.get("nextActions").is_none());
        assert_eq!(json["result"], "success");
    }

    #[test]
    fn test_persisted_shape_uses_camel_case() {
        let mut record = ResponseRecord::new(incident(), 10, false);
        record.record(ResponseAction::success("system", "created", "ok"));
        let json = serde_json::to_value(record.to_persisted(42)).unwrap();
        assert_eq!(json["incidentType"], "build_failure");
        assert_eq!(json["severity"], "high");
        assert_eq!(json["resolutionTimeMs"], 42);
        assert_eq!(json["timeline"].as_array().unwrap().len(), 1);
        assert!(json.get("responseId").is_some());
    }
}
