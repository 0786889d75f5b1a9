//! Build diagnostics: run the build and inspect the dependency manifest

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use super::{DiagnosticError, DiagnosticRoutine, DiagnosticsConfig};
use crate::artifacts::{FileReader, ReadError};
use crate::incident::{IncidentContext, ResponseAction};
use crate::process::ProcessRunner;

const ACTOR: &str = "build-diagnostics";

/// Markers in build output that point at a missing module
const MISSING_MODULE_MARKERS: &[&str] = &["module not found", "cannot find module", "unresolved import"];

pub struct BuildDiagnostics {
    config: Arc<DiagnosticsConfig>,
    runner: Arc<dyn ProcessRunner>,
    reader: Arc<dyn FileReader>,
}

impl BuildDiagnostics {
    pub fn new(
        config: Arc<DiagnosticsConfig>,
        runner: Arc<dyn ProcessRunner>,
        reader: Arc<dyn FileReader>,
    ) -> Self {
        Self {
            config,
            runner,
            reader,
        }
    }

    async fn build_check(&self) -> ResponseAction {
        let command = &self.config.build_command;
        match self.runner.run(command).await {
            Ok(output) if output.success() => ResponseAction::success(
                ACTOR,
                "build-check",
                format!("`{command}` succeeded; the failure may be intermittent"),
            ),
            Ok(output) => {
                let combined = format!("{}\n{}", output.stdout, output.stderr).to_lowercase();
                let mut next = vec![
                    "Fix the first compiler error reported in the build output".to_string(),
                    format!("Re-run `{command}` to confirm the fix"),
                ];
                if MISSING_MODULE_MARKERS.iter().any(|m| combined.contains(m)) {
                    next.insert(0, "Install or correct the path of the missing module".into());
                }
                ResponseAction::failure(
                    ACTOR,
                    "build-check",
                    format!(
                        "`{command}` exited with {}: {}",
                        describe_exit(output.exit_code),
                        output.excerpt(self.config.excerpt_bytes)
                    ),
                )
                .with_next_actions(next)
            }
            Err(e) => ResponseAction::failure(ACTOR, "build-check", format!("Could not run build: {e}")),
        }
    }

    async fn manifest_inspection(&self) -> ResponseAction {
        let path = self.config.manifest_path.as_path();
        let contents = match self.reader.read(path).await {
            Ok(contents) => contents,
            Err(ReadError::NotFound { .. }) => {
                return ResponseAction::failure(
                    ACTOR,
                    "manifest-inspection",
                    format!("Dependency manifest {} not found", path.display()),
                )
                .with_next_actions(["Restore the project manifest before rebuilding"]);
            }
            Err(e) => {
                return ResponseAction::failure(ACTOR, "manifest-inspection", e.to_string());
            }
        };

        match count_manifest_dependencies(path, &contents) {
            Ok(count) => ResponseAction::success(
                ACTOR,
                "manifest-inspection",
                format!("{} declares {count} dependencies", path.display()),
            ),
            Err(reason) => ResponseAction::failure(
                ACTOR,
                "manifest-inspection",
                format!("{} is not a valid manifest: {reason}", path.display()),
            )
            .with_next_actions(["Repair the manifest syntax"]),
        }
    }
}

#[async_trait]
impl DiagnosticRoutine for BuildDiagnostics {
    fn name(&self) -> &'static str {
        ACTOR
    }

    async fn run(
        &self,
        _incident: &IncidentContext,
    ) -> Result<Vec<ResponseAction>, DiagnosticError> {
        let build = self.build_check().await;
        let manifest = self.manifest_inspection().await;
        Ok(vec![build, manifest])
    }
}

fn describe_exit(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("code {code}"),
        None => "a signal".to_string(),
    }
}

/// Count runtime + dev dependencies in a `package.json` or `Cargo.toml`
pub fn count_manifest_dependencies(path: &Path, contents: &str) -> Result<usize, String> {
    let is_toml = path.extension().is_some_and(|ext| ext == "toml");
    if is_toml {
        let table: toml::Table = toml::from_str(contents).map_err(|e| e.message().to_string())?;
        Ok(["dependencies", "dev-dependencies", "build-dependencies"]
            .iter()
            .filter_map(|key| table.get(*key).and_then(|v| v.as_table()))
            .map(|t| t.len())
            .sum())
    } else {
        let value: serde_json::Value = serde_json::from_str(contents).map_err(|e| e.to_string())?;
        Ok(["dependencies", "devDependencies", "peerDependencies"]
            .iter()
            .filter_map(|key| value.get(*key).and_then(|v| v.as_object()))
            .map(|o| o.len())
            .sum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::StaticFileReader;
    use crate::diagnostics::tests::incident;
    use crate::incident::{ActionResult, IncidentType};
    use crate::process::{ProcessError, ProcessOutput};

    struct FixedRunner(Result<ProcessOutput, ProcessError>);

    #[async_trait]
    impl ProcessRunner for FixedRunner {
        async fn run(&self, _command: &str) -> Result<ProcessOutput, ProcessError> {
            self.0.clone()
        }
    }

    fn exited(code: i32, stderr: &str) -> FixedRunner {
        FixedRunner(Ok(ProcessOutput {
            stdout: String::new(),
            stderr: stderr.to_string(),
            exit_code: Some(code),
        }))
    }

    fn routine(runner: FixedRunner, reader: StaticFileReader) -> BuildDiagnostics {
        BuildDiagnostics::new(
            Arc::new(DiagnosticsConfig::default()),
            Arc::new(runner),
            Arc::new(reader),
        )
    }

    #[tokio::test]
    async fn test_failed_build_with_missing_module() {
        let reader = StaticFileReader::new().with_file(
            "package.json",
            r#"{"dependencies": {"react": "^18"}, "devDependencies": {"vite": "^5", "vitest": "^1"}}"#,
        );
        let findings = routine(exited(1, "Module not found: ./Header"), reader)
            .run(&incident(IncidentType::BuildFailure, "build failed"))
            .await
            .unwrap();

        assert_eq!(findings.len(), 2);
        assert_eq!(findings[0].action, "build-check");
        assert_eq!(findings[0].result, ActionResult::Failure);
        assert!(findings[0].details.contains("code 1"));
        let next = findings[0].next_actions.as_ref().unwrap();
        assert!(next[0].contains("missing module"));

        assert_eq!(findings[1].result, ActionResult::Success);
        assert!(findings[1].details.contains("3 dependencies"));
    }

    #[tokio::test]
    async fn test_missing_manifest_is_failure_finding() {
        let findings = routine(exited(0, ""), StaticFileReader::new())
            .run(&incident(IncidentType::BuildFailure, "build failed"))
            .await
            .unwrap();

        assert_eq!(findings[0].result, ActionResult::Success);
        assert_eq!(findings[1].result, ActionResult::Failure);
        assert!(findings[1].details.contains("not found"));
    }

    #[tokio::test]
    async fn test_unrunnable_build_is_failure_finding() {
        let runner = FixedRunner(Err(ProcessError::Timeout {
            command: "npm run build".into(),
            secs: 300,
        }));
        let findings = routine(runner, StaticFileReader::new())
            .run(&incident(IncidentType::BuildFailure, "build failed"))
            .await
            .unwrap();
        assert_eq!(findings[0].result, ActionResult::Failure);
        assert!(findings[0].details.contains("timed out"));
    }

    #[test]
    fn test_count_cargo_manifest() {
        let manifest = r#"
[package]
name = "demo"

[dependencies]
serde = "1"
tokio = "1"

[dev-dependencies]
tempfile = "3"
"#;
        assert_eq!(
            count_manifest_dependencies(Path::new("Cargo.toml"), manifest),
            Ok(3)
        );
        assert!(count_manifest_dependencies(Path::new("package.json"), "{ nope").is_err());
    }
}
