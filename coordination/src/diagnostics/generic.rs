//! Fallback routine for types without dedicated diagnostics

use async_trait::async_trait;

use super::{DiagnosticError, DiagnosticRoutine, ENGINE_ACTOR};
use crate::incident::{IncidentContext, ResponseAction};

/// Echoes the error message as a single "analyzed" finding
#[derive(Debug, Default, Clone, Copy)]
pub struct GenericDiagnostics;

#[async_trait]
impl DiagnosticRoutine for GenericDiagnostics {
    fn name(&self) -> &'static str {
        ENGINE_ACTOR
    }

    async fn run(
        &self,
        incident: &IncidentContext,
    ) -> Result<Vec<ResponseAction>, DiagnosticError> {
        let systems: Vec<&str> = incident.affected_systems.iter().map(String::as_str).collect();
        Ok(vec![ResponseAction::success(
            ENGINE_ACTOR,
            "analyzed",
            format!(
                "{} affecting [{}]: {}",
                incident.incident_type,
                systems.join(", "),
                incident.error_message
            ),
        )])
    }
}
