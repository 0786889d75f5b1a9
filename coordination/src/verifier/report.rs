//! Validation Report — per-gate results of post-fix validation

use serde::{Deserialize, Serialize};

use crate::incident::{IncidentType, ResponseAction};

/// Outcome of a single validation gate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateOutcome {
    Passed,
    /// Failed, or could not be run at all
    Failed,
}

impl GateOutcome {
    pub fn is_passed(&self) -> bool {
        matches!(self, Self::Passed)
    }
}

impl std::fmt::Display for GateOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Passed => write!(f, "PASS"),
            Self::Failed => write!(f, "FAIL"),
        }
    }
}

/// Result of a single validation gate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GateResult {
    /// Gate name (build, dependency-tree, test)
    pub gate: String,
    pub outcome: GateOutcome,
    pub duration_ms: u64,
    pub exit_code: Option<i32>,
    /// Short explanation, e.g. the output excerpt of a failing gate
    pub detail: String,
}

impl GateResult {
    pub fn passed(gate: impl Into<String>, duration_ms: u64, exit_code: Option<i32>) -> Self {
        Self {
            gate: gate.into(),
            outcome: GateOutcome::Passed,
            duration_ms,
            exit_code,
            detail: String::new(),
        }
    }

    pub fn failed(
        gate: impl Into<String>,
        duration_ms: u64,
        exit_code: Option<i32>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            gate: gate.into(),
            outcome: GateOutcome::Failed,
            duration_ms,
            exit_code,
            detail: detail.into(),
        }
    }
}

/// Validation outcome for one incident
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub incident_type: IncidentType,
    pub gates: Vec<GateResult>,
}

impl ValidationReport {
    pub fn new(incident_type: IncidentType) -> Self {
        Self {
            incident_type,
            gates: Vec::new(),
        }
    }

    pub fn add_gate(&mut self, gate: GateResult) {
        self.gates.push(gate);
    }

    /// True when every gate passed; types without gates always pass
    pub fn passed(&self) -> bool {
        self.gates.iter().all(|g| g.outcome.is_passed())
    }

    pub fn gates_passed(&self) -> usize {
        self.gates.iter().filter(|g| g.outcome.is_passed()).count()
    }

    pub fn failed_gates(&self) -> Vec<&str> {
        self.gates
            .iter()
            .filter(|g| !g.outcome.is_passed())
            .map(|g| g.gate.as_str())
            .collect()
    }

    /// One-line summary, e.g. `build PASS, test FAIL`
    pub fn summary(&self) -> String {
        if self.gates.is_empty() {
            return format!("No validation gates for {}", self.incident_type);
        }
        self.gates
            .iter()
            .map(|g| format!("{} {}", g.gate, g.outcome))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Timeline entry describing this report
    pub fn to_action(&self, actor: &str) -> ResponseAction {
        if self.passed() {
            ResponseAction::success(actor, "validation", self.summary())
        } else {
            let details: Vec<String> = self
                .gates
                .iter()
                .filter(|g| !g.outcome.is_passed())
                .map(|g| format!("{}: {}", g.gate, g.detail))
                .collect();
            ResponseAction::failure(
                actor,
                "validation",
                format!("{} ({})", self.summary(), details.join("; ")),
            )
        }
    }
}
