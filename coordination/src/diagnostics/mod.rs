//! Diagnostics Engine — type-specific inspection producing timeline findings
//!
//! Each incident type dispatches to a [`DiagnosticRoutine`]; unmapped types
//! use the generic routine that echoes the error as an "analyzed" finding.
//!
//! Routines must tolerate missing or unreadable artifacts by emitting a
//! `failure` finding. If a routine still returns an error, the engine turns
//! it into a single failure finding so callers never see an `Err`.

pub mod build;
pub mod dependency;
pub mod generic;
pub mod routing;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::artifacts::{FileReader, ReadError};
use crate::error::CoordinationError;
use crate::incident::{IncidentContext, IncidentType, ResponseAction};
use crate::process::{ProcessError, ProcessRunner};

pub use build::BuildDiagnostics;
pub use dependency::{find_conflict_markers, DependencyDiagnostics};
pub use generic::GenericDiagnostics;
pub use routing::RoutingDiagnostics;

/// Actor label for engine-level findings
pub const ENGINE_ACTOR: &str = "diagnostics-engine";

/// Project commands and artifact locations inspected by diagnostics,
/// validation and command fixes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    pub build_command: String,
    pub dependency_tree_command: String,
    pub test_command: String,
    /// `package.json` or `Cargo.toml`, relative to the project root
    pub manifest_path: PathBuf,
    /// Candidate routing configuration files, checked in order
    pub routing_files: Vec<PathBuf>,
    /// Bytes of command output kept in finding details
    pub excerpt_bytes: usize,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            build_command: "npm run build".to_string(),
            dependency_tree_command: "npm ls --all".to_string(),
            test_command: "npm test".to_string(),
            manifest_path: PathBuf::from("package.json"),
            routing_files: vec![
                PathBuf::from("src/router.tsx"),
                PathBuf::from("src/router.ts"),
                PathBuf::from("src/routes.tsx"),
                PathBuf::from("src/routes.ts"),
                PathBuf::from("src/App.tsx"),
            ],
            excerpt_bytes: 2048,
        }
    }
}

/// Unexpected routine failures (expected ones become findings)
#[derive(Debug, Clone, thiserror::Error)]
pub enum DiagnosticError {
    #[error(transparent)]
    Read(#[from] ReadError),

    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error("{0}")]
    Other(String),
}

/// One inspection strategy
#[async_trait]
pub trait DiagnosticRoutine: Send + Sync {
    /// Actor label used on the findings this routine emits
    fn name(&self) -> &'static str;

    async fn run(&self, incident: &IncidentContext)
        -> Result<Vec<ResponseAction>, DiagnosticError>;
}

/// Dispatches incidents to their diagnostic routine
pub struct DiagnosticsEngine {
    routines: HashMap<IncidentType, Arc<dyn DiagnosticRoutine>>,
    fallback: Arc<dyn DiagnosticRoutine>,
}

impl DiagnosticsEngine {
    /// Engine with only the generic fallback
    pub fn empty() -> Self {
        Self {
            routines: HashMap::new(),
            fallback: Arc::new(GenericDiagnostics),
        }
    }

    /// Engine wired with the build, routing and dependency routines
    pub fn standard(
        config: DiagnosticsConfig,
        runner: Arc<dyn ProcessRunner>,
        reader: Arc<dyn FileReader>,
    ) -> Self {
        let config = Arc::new(config);
        Self::empty()
            .with_routine(
                IncidentType::BuildFailure,
                Arc::new(BuildDiagnostics::new(
                    config.clone(),
                    runner.clone(),
                    reader.clone(),
                )),
            )
            .with_routine(
                IncidentType::RouterFailure,
                Arc::new(RoutingDiagnostics::new(config.clone(), reader)),
            )
            .with_routine(
                IncidentType::DependencyConflict,
                Arc::new(DependencyDiagnostics::new(config, runner)),
            )
    }

    /// Register (or replace) the routine for a type
    pub fn with_routine(
        mut self,
        incident_type: IncidentType,
        routine: Arc<dyn DiagnosticRoutine>,
    ) -> Self {
        self.routines.insert(incident_type, routine);
        self
    }

    pub fn with_fallback(mut self, routine: Arc<dyn DiagnosticRoutine>) -> Self {
        self.fallback = routine;
        self
    }

    pub fn routine_for(&self, incident_type: IncidentType) -> &Arc<dyn DiagnosticRoutine> {
        self.routines.get(&incident_type).unwrap_or(&self.fallback)
    }

    /// Run the routine for the incident's type; never fails
    pub async fn diagnose(&self, incident: &IncidentContext) -> Vec<ResponseAction> {
        let routine = self.routine_for(incident.incident_type);

        match routine.run(incident).await {
            Ok(findings) => {
                info!(
                    routine = routine.name(),
                    findings = findings.len(),
                    failures = findings.iter().filter(|f| f.is_failure()).count(),
                    "Diagnostics finished"
                );
                findings
            }
            Err(e) => {
                let err: CoordinationError = match e {
                    DiagnosticError::Read(read) => read.into(),
                    other => other.into(),
                };
                warn!(routine = routine.name(), error = %err, "Diagnostic routine failed");
                vec![ResponseAction::failure(
                    routine.name(),
                    "diagnostics",
                    format!("Diagnostic routine failed: {err}"),
                )]
            }
        }
    }
}
