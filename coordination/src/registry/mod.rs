//! Capability & Tool Registries — the responder collaborators
//!
//! Capabilities are abstract responder units (interface work, service work,
//! quality verification, …). Tools are auxiliary diagnostics/automation
//! utilities fired after a capability activates. Concrete implementations
//! live outside this crate; the registries here resolve them by id.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::incident::{IncidentType, Severity};
use crate::process::{ProcessError, ProcessRunner};

/// Context handed to capabilities and tools
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivationContext {
    pub emergency: bool,
    #[serde(rename = "type")]
    pub incident_type: IncidentType,
    pub severity: Severity,
    pub response_id: String,
    /// Pipeline phase requesting the activation
    pub phase: String,
}

impl ActivationContext {
    /// Emergency activation for the primary capability phase
    pub fn emergency(
        response_id: impl Into<String>,
        incident_type: IncidentType,
        severity: Severity,
    ) -> Self {
        Self {
            emergency: true,
            incident_type,
            severity,
            response_id: response_id.into(),
            phase: "primary_activation".to_string(),
        }
    }

    pub fn with_phase(mut self, phase: impl Into<String>) -> Self {
        self.phase = phase.into();
        self
    }
}

/// Status reported by a capability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityStatus {
    /// Work done synchronously
    Completed,
    /// Work handed off and will continue out of band
    Accepted,
    /// The capability ran but could not do its job
    Failed,
}

impl CapabilityStatus {
    pub fn is_success(self) -> bool {
        matches!(self, Self::Completed | Self::Accepted)
    }
}

/// `{status, data}` returned by a capability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilityOutcome {
    pub status: CapabilityStatus,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl CapabilityOutcome {
    pub fn completed(data: serde_json::Value) -> Self {
        Self {
            status: CapabilityStatus::Completed,
            data,
        }
    }

    pub fn accepted(data: serde_json::Value) -> Self {
        Self {
            status: CapabilityStatus::Accepted,
            data,
        }
    }

    pub fn failed(data: serde_json::Value) -> Self {
        Self {
            status: CapabilityStatus::Failed,
            data,
        }
    }
}

/// Errors raised by capabilities and tools
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActivationError {
    #[error("{0}")]
    Failed(String),

    #[error(transparent)]
    Process(#[from] ProcessError),
}

/// A responder unit that can be activated for an incident
#[async_trait]
pub trait Capability: Send + Sync {
    fn id(&self) -> &str;

    async fn activate(&self, ctx: &ActivationContext) -> Result<CapabilityOutcome, ActivationError>;
}

/// Resolves capability ids to implementations
pub trait CapabilityRegistry: Send + Sync {
    fn resolve(&self, id: &str) -> Option<Arc<dyn Capability>>;
}

/// Fires auxiliary tools; best-effort
#[async_trait]
pub trait ToolRegistry: Send + Sync {
    async fn activate(&self, tool_id: &str, ctx: &ActivationContext) -> Result<(), ActivationError>;
}

/// HashMap-backed capability registry
#[derive(Default, Clone)]
pub struct StaticCapabilityRegistry {
    entries: HashMap<String, Arc<dyn Capability>>,
}

impl StaticCapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a capability under its own id (replacing any previous one)
    pub fn register(&mut self, capability: Arc<dyn Capability>) {
        self.entries.insert(capability.id().to_string(), capability);
    }

    pub fn with(mut self, capability: Arc<dyn Capability>) -> Self {
        self.register(capability);
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered ids, sorted
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.entries.keys().cloned().collect();
        ids.sort();
        ids
    }
}

impl CapabilityRegistry for StaticCapabilityRegistry {
    fn resolve(&self, id: &str) -> Option<Arc<dyn Capability>> {
        self.entries.get(id).cloned()
    }
}

/// Capability backed by a shell-like command
///
/// The command template may contain `{type}`, `{severity}`, `{response_id}`
/// and `{phase}` placeholders. Exit code 0 reports `Completed`; any other
/// exit code reports `Failed` with the output excerpt as data.
pub struct CommandCapability {
    id: String,
    command: String,
    runner: Arc<dyn ProcessRunner>,
}

impl CommandCapability {
    pub fn new(
        id: impl Into<String>,
        command: impl Into<String>,
        runner: Arc<dyn ProcessRunner>,
    ) -> Self {
        Self {
            id: id.into(),
            command: command.into(),
            runner,
        }
    }

    fn render(&self, ctx: &ActivationContext) -> String {
        self.command
            .replace("{type}", ctx.incident_type.as_str())
            .replace("{severity}", ctx.severity.as_str())
            .replace("{response_id}", &ctx.response_id)
            .replace("{phase}", &ctx.phase)
    }
}

#[async_trait]
impl Capability for CommandCapability {
    fn id(&self) -> &str {
        &self.id
    }

    async fn activate(&self, ctx: &ActivationContext) -> Result<CapabilityOutcome, ActivationError> {
        let command = self.render(ctx);
        let output = self.runner.run(&command).await?;
        let data = serde_json::json!({
            "command": command,
            "exitCode": output.exit_code,
            "output": output.excerpt(1024),
        });
        if output.success() {
            Ok(CapabilityOutcome::completed(data))
        } else {
            Ok(CapabilityOutcome::failed(data))
        }
    }
}

/// Tool registry that only records activations in the trace log
///
/// Used when no tool integrations are configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingToolRegistry;

#[async_trait]
impl ToolRegistry for TracingToolRegistry {
    async fn activate(&self, tool_id: &str, ctx: &ActivationContext) -> Result<(), ActivationError> {
        tracing::info!(
            tool = tool_id,
            response_id = %ctx.response_id,
            incident_type = %ctx.incident_type,
            "Tool activation requested"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::ProcessOutput;
    use std::sync::Mutex;

    struct ScriptedRunner {
        exit_code: i32,
        commands: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ProcessRunner for ScriptedRunner {
        async fn run(&self, command: &str) -> Result<ProcessOutput, ProcessError> {
            self.commands.lock().unwrap().push(command.to_string());
            Ok(ProcessOutput {
                stdout: "done".into(),
                stderr: String::new(),
                exit_code: Some(self.exit_code),
            })
        }
    }

    fn ctx() -> ActivationContext {
        ActivationContext::emergency("resp-1", IncidentType::BuildFailure, Severity::High)
    }

    #[tokio::test]
    async fn test_command_capability_renders_placeholders() {
        let runner = Arc::new(ScriptedRunner {
            exit_code: 0,
            commands: Mutex::new(Vec::new()),
        });
        let cap = CommandCapability::new(
            "platform-engineer",
            "page-oncall --type {type} --severity {severity} --id {response_id} --phase {phase}",
            runner.clone(),
        );

        let outcome = cap.activate(&ctx()).await.unwrap();
        assert_eq!(outcome.status, CapabilityStatus::Completed);
        assert_eq!(
            runner.commands.lock().unwrap()[0],
            "page-oncall --type build_failure --severity high --id resp-1 --phase primary_activation"
        );
    }

    #[tokio::test]
    async fn test_command_capability_nonzero_exit_is_failed() {
        let runner = Arc::new(ScriptedRunner {
            exit_code: 2,
            commands: Mutex::new(Vec::new()),
        });
        let cap = CommandCapability::new("qa", "run-qa", runner);
        let outcome = cap.activate(&ctx()).await.unwrap();
        assert_eq!(outcome.status, CapabilityStatus::Failed);
        assert_eq!(outcome.data["exitCode"], 2);
    }

    #[test]
    fn test_static_registry_resolves_by_id() {
        let runner = Arc::new(ScriptedRunner {
            exit_code: 0,
            commands: Mutex::new(Vec::new()),
        });
        let registry = StaticCapabilityRegistry::new()
            .with(Arc::new(CommandCapability::new("b", "true", runner.clone())))
            .with(Arc::new(CommandCapability::new("a", "true", runner)));

        assert_eq!(registry.ids(), vec!["a", "b"]);
        assert!(registry.resolve("a").is_some());
        assert!(registry.resolve("missing").is_none());
    }

    #[test]
    fn test_activation_context_serializes_type_field() {
        let json = serde_json::to_value(ctx()).unwrap();
        assert_eq!(json["type"], "build_failure");
        assert_eq!(json["emergency"], true);
        assert_eq!(json["severity"], "high");
    }
}
