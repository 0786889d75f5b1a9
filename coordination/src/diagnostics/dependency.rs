//! Dependency diagnostics: scan the dependency tree for conflict markers

use std::sync::Arc;

use async_trait::async_trait;

use super::{DiagnosticError, DiagnosticRoutine, DiagnosticsConfig};
use crate::incident::{IncidentContext, ResponseAction};
use crate::process::ProcessRunner;

const ACTOR: &str = "dependency-diagnostics";

/// Case-insensitive markers package managers print for broken trees
pub const CONFLICT_MARKERS: &[&str] = &["unmet", "invalid", "eresolve", "conflict"];

/// Most conflicting lines quoted in a finding
const MAX_QUOTED_LINES: usize = 5;

pub struct DependencyDiagnostics {
    config: Arc<DiagnosticsConfig>,
    runner: Arc<dyn ProcessRunner>,
}

impl DependencyDiagnostics {
    pub fn new(config: Arc<DiagnosticsConfig>, runner: Arc<dyn ProcessRunner>) -> Self {
        Self { config, runner }
    }
}

#[async_trait]
impl DiagnosticRoutine for DependencyDiagnostics {
    fn name(&self) -> &'static str {
        ACTOR
    }

    async fn run(
        &self,
        _incident: &IncidentContext,
    ) -> Result<Vec<ResponseAction>, DiagnosticError> {
        let command = &self.config.dependency_tree_command;
        let output = match self.runner.run(command).await {
            Ok(output) => output,
            Err(e) => {
                return Ok(vec![ResponseAction::failure(
                    ACTOR,
                    "dependency-tree",
                    format!("Could not inspect dependency tree: {e}"),
                )]);
            }
        };

        let conflicts = find_conflict_markers(&format!("{}\n{}", output.stdout, output.stderr));
        let finding = if !conflicts.is_empty() {
            let quoted: Vec<&str> = conflicts
                .iter()
                .take(MAX_QUOTED_LINES)
                .map(String::as_str)
                .collect();
            ResponseAction::partial(
                ACTOR,
                "dependency-tree",
                format!(
                    "{} conflicting entries in `{command}`: {}",
                    conflicts.len(),
                    quoted.join(" | ")
                ),
            )
            .with_next_actions([
                "Deduplicate the dependency tree with the package manager",
                "Pin conflicting versions through overrides or resolutions",
                "Reinstall from a clean lockfile",
            ])
        } else if !output.success() {
            ResponseAction::failure(
                ACTOR,
                "dependency-tree",
                format!(
                    "`{command}` failed without conflict markers: {}",
                    output.excerpt(self.config.excerpt_bytes)
                ),
            )
        } else {
            ResponseAction::success(
                ACTOR,
                "dependency-tree",
                format!("`{command}` reports no conflicts"),
            )
        };

        Ok(vec![finding])
    }
}

/// Trimmed lines containing any of [`CONFLICT_MARKERS`]
pub fn find_conflict_markers(text: &str) -> Vec<String> {
    text.lines()
        .filter(|line| {
            let lower = line.to_lowercase();
            CONFLICT_MARKERS.iter().any(|m| lower.contains(m))
        })
        .map(|line| line.trim().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::tests::incident;
    use crate::incident::{ActionResult, IncidentType};
    use crate::process::{ProcessError, ProcessOutput};

    struct TreeRunner {
        stdout: &'static str,
        exit_code: i32,
    }

    #[async_trait]
    impl ProcessRunner for TreeRunner {
        async fn run(&self, _command: &str) -> Result<ProcessOutput, ProcessError> {
            Ok(ProcessOutput {
                stdout: self.stdout.to_string(),
                stderr: String::new(),
                exit_code: Some(self.exit_code),
            })
        }
    }

    fn routine(stdout: &'static str, exit_code: i32) -> DependencyDiagnostics {
        DependencyDiagnostics::new(
            Arc::new(DiagnosticsConfig::default()),
            Arc::new(TreeRunner { stdout, exit_code }),
        )
    }

    #[tokio::test]
    async fn test_conflicts_are_partial_with_suggestions() {
        let tree = "app@1.0.0\n├── react@18.2.0\n└── UNMET PEER DEPENDENCY react@17\n   invalid: lodash@3";
        let findings = routine(tree, 1)
            .run(&incident(IncidentType::DependencyConflict, "peer dependency conflict"))
            .await
            .unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].result, ActionResult::Partial);
        assert!(findings[0].details.starts_with("2 conflicting"));
        assert_eq!(findings[0].next_actions.as_ref().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_clean_tree_is_success() {
        let findings = routine("app@1.0.0\n└── react@18.2.0", 0)
            .run(&incident(IncidentType::DependencyConflict, "dependency"))
            .await
            .unwrap();
        assert_eq!(findings[0].result, ActionResult::Success);
    }

    #[tokio::test]
    async fn test_failed_tree_without_markers_is_failure() {
        let findings = routine("npm ERR! missing script", 1)
            .run(&incident(IncidentType::DependencyConflict, "dependency"))
            .await
            .unwrap();
        assert_eq!(findings[0].result, ActionResult::Failure);
    }

    #[test]
    fn test_find_conflict_markers_case_insensitive() {
        let lines = find_conflict_markers("ok\nnpm ERR! code ERESOLVE\nVersion Conflict here\nfine");
        assert_eq!(lines, vec!["npm ERR! code ERESOLVE", "Version Conflict here"]);
    }
}
