//! Escalation Policy — static predicates deciding when humans take over
//!
//! The initial decision is made once, at record creation:
//!
//! ```text
//! severity == catastrophic                               → escalate
//! severity == critical AND business_impact == critical   → escalate
//! type ∈ {data_loss_risk, security_vulnerability}        → escalate
//! ```
//!
//! Validation failure later in the pipeline adds a fourth trigger.

use serde::{Deserialize, Serialize};

use crate::incident::{ImpactLevel, IncidentContext, IncidentType, Severity};

/// Why an incident requires escalation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationTrigger {
    /// Severity reached the top of the scale
    CatastrophicSeverity,
    /// Critical severity combined with critical business impact
    CriticalBusinessImpact,
    /// Incident type always goes to a human
    SensitiveIncidentType { incident_type: IncidentType },
    /// Post-fix validation did not pass
    ValidationFailed,
}

impl std::fmt::Display for EscalationTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CatastrophicSeverity => write!(f, "severity is catastrophic"),
            Self::CriticalBusinessImpact => {
                write!(f, "critical severity with critical business impact")
            }
            Self::SensitiveIncidentType { incident_type } => {
                write!(f, "{} incidents always require escalation", incident_type)
            }
            Self::ValidationFailed => write!(f, "post-fix validation failed"),
        }
    }
}

/// Incident types that always escalate regardless of severity
pub const ALWAYS_ESCALATE: &[IncidentType] = &[
    IncidentType::DataLossRisk,
    IncidentType::SecurityVulnerability,
];

/// Every static trigger that applies to `incident`, in policy order
pub fn initial_triggers(incident: &IncidentContext) -> Vec<EscalationTrigger> {
    let mut triggers = Vec::new();

    if incident.severity == Severity::Catastrophic {
        triggers.push(EscalationTrigger::CatastrophicSeverity);
    }
    if incident.severity == Severity::Critical
        && incident.business_impact == ImpactLevel::Critical
    {
        triggers.push(EscalationTrigger::CriticalBusinessImpact);
    }
    if ALWAYS_ESCALATE.contains(&incident.incident_type) {
        triggers.push(EscalationTrigger::SensitiveIncidentType {
            incident_type: incident.incident_type,
        });
    }

    triggers
}

/// Initial value of `escalation_required` for a new record
pub fn requires_initial_escalation(incident: &IncidentContext) -> bool {
    !initial_triggers(incident).is_empty()
}

/// Human-readable explanation of why a record was escalated
///
/// Static triggers are listed first; a failed validation is appended when
/// `validation_passed` is false.
pub fn describe_escalation(incident: &IncidentContext, validation_passed: bool) -> String {
    let mut triggers = initial_triggers(incident);
    if !validation_passed {
        triggers.push(EscalationTrigger::ValidationFailed);
    }

    if triggers.is_empty() {
        return "escalation requested during response".to_string();
    }

    let reasons: Vec<String> = triggers.iter().map(|t| t.to_string()).collect();
    format!(
        "Escalated ({} severity, {} business impact): {}",
        incident.severity,
        incident.business_impact,
        reasons.join("; ")
    )
}
