//! Validation Pipeline — re-runs project checks after a fix attempt
//!
//! Gates per incident type:
//!
//! | Type                     | Gates                                   |
//! |--------------------------|-----------------------------------------|
//! | `build_failure`          | build command exits 0                   |
//! | `dependency_conflict`    | tree command exits 0, no conflict marks |
//! | `test_failure_cascade`   | test command exits 0                    |
//! | everything else          | none (passes)                           |
//!
//! A gate whose command cannot be run (spawn error, timeout) fails.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;

use crate::diagnostics::{find_conflict_markers, DiagnosticsConfig};
use crate::incident::{IncidentContext, IncidentType};
use crate::process::ProcessRunner;
use crate::verifier::report::{GateResult, ValidationReport};

/// A validation gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    Build,
    DependencyTree,
    Test,
}

impl Gate {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Build => "build",
            Self::DependencyTree => "dependency-tree",
            Self::Test => "test",
        }
    }

    /// Gates that must pass for an incident type to count as fixed
    pub fn for_type(incident_type: IncidentType) -> &'static [Gate] {
        match incident_type {
            IncidentType::BuildFailure => &[Gate::Build],
            IncidentType::DependencyConflict => &[Gate::DependencyTree],
            IncidentType::TestFailureCascade => &[Gate::Test],
            _ => &[],
        }
    }
}

/// Post-fix validation seam used by the orchestrator
#[async_trait]
pub trait Validator: Send + Sync {
    async fn validate(&self, incident: &IncidentContext) -> ValidationReport;
}

/// Command-backed validator
pub struct ValidationPipeline {
    config: Arc<DiagnosticsConfig>,
    runner: Arc<dyn ProcessRunner>,
}

impl ValidationPipeline {
    pub fn new(config: Arc<DiagnosticsConfig>, runner: Arc<dyn ProcessRunner>) -> Self {
        Self { config, runner }
    }

    fn command_for(&self, gate: Gate) -> &str {
        match gate {
            Gate::Build => &self.config.build_command,
            Gate::DependencyTree => &self.config.dependency_tree_command,
            Gate::Test => &self.config.test_command,
        }
    }

    async fn run_gate(&self, gate: Gate) -> GateResult {
        let command = self.command_for(gate);
        let start = Instant::now();
        let result = self.runner.run(command).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        let output = match result {
            Ok(output) => output,
            Err(e) => {
                tracing::warn!(gate = gate.as_str(), error = %e, "Validation gate could not run");
                return GateResult::failed(gate.as_str(), duration_ms, None, e.to_string());
            }
        };

        if !output.success() {
            return GateResult::failed(
                gate.as_str(),
                duration_ms,
                output.exit_code,
                output.excerpt(self.config.excerpt_bytes),
            );
        }

        if gate == Gate::DependencyTree {
            let conflicts = find_conflict_markers(&format!("{}\n{}", output.stdout, output.stderr));
            if !conflicts.is_empty() {
                return GateResult::failed(
                    gate.as_str(),
                    duration_ms,
                    output.exit_code,
                    format!("{} conflict markers remain", conflicts.len()),
                );
            }
        }

        GateResult::passed(gate.as_str(), duration_ms, output.exit_code)
    }
}

#[async_trait]
impl Validator for ValidationPipeline {
    async fn validate(&self, incident: &IncidentContext) -> ValidationReport {
        let mut report = ValidationReport::new(incident.incident_type);

        for gate in Gate::for_type(incident.incident_type) {
            let result = self.run_gate(*gate).await;
            tracing::info!(
                gate = gate.as_str(),
                outcome = %result.outcome,
                duration_ms = result.duration_ms,
                "Validation gate finished"
            );
            report.add_gate(result);
        }

        report
    }
}
