//! Coordinated Fix — strategies applied during the fixing phase
//!
//! A [`FixStrategy`] reads the record (activated capabilities, incident)
//! and returns the timeline entries describing what it attempted. Strategies
//! never fail; every problem becomes a `failure` entry.
//!
//! - [`CapabilityDelegation`] re-invokes each activated capability with
//!   `phase = "coordinated_fix"`.
//! - [`CommandFix`] runs remediation commands configured per incident type.
//! - [`FixPlanner`] picks the strategies for a type: configured commands
//!   first, then delegation.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::incident::{IncidentType, ResponseAction, ResponseRecord};
use crate::process::ProcessRunner;
use crate::registry::{ActivationContext, CapabilityRegistry, CapabilityStatus};

/// Phase label passed to capabilities re-invoked for the fix
pub const FIX_PHASE: &str = "coordinated_fix";

#[async_trait]
pub trait FixStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Attempt a fix; the returned actions are appended to the timeline
    async fn apply(&self, record: &ResponseRecord) -> Vec<ResponseAction>;
}

/// Delegates the fix to the capabilities activated for the incident
pub struct CapabilityDelegation {
    registry: Arc<dyn CapabilityRegistry>,
}

impl CapabilityDelegation {
    pub fn new(registry: Arc<dyn CapabilityRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl FixStrategy for CapabilityDelegation {
    fn name(&self) -> &'static str {
        "capability-delegation"
    }

    async fn apply(&self, record: &ResponseRecord) -> Vec<ResponseAction> {
        if record.activated_capabilities().is_empty() {
            return vec![ResponseAction::partial(
                self.name(),
                "coordinated-fix",
                "No activated capabilities to coordinate a fix",
            )];
        }

        let ctx = ActivationContext::emergency(
            record.response_id(),
            record.incident_type(),
            record.severity(),
        )
        .with_phase(FIX_PHASE);

        let mut actions = Vec::new();
        for id in record.activated_capabilities() {
            let Some(capability) = self.registry.resolve(id) else {
                actions.push(ResponseAction::failure(
                    id.as_str(),
                    "coordinated-fix",
                    format!("Capability {id} is no longer registered"),
                ));
                continue;
            };

            let action = match capability.activate(&ctx).await {
                Ok(outcome) if outcome.status == CapabilityStatus::Accepted => {
                    ResponseAction::success(id.as_str(), "coordinated-fix", "Fix accepted for follow-up")
                }
                Ok(outcome) if outcome.status.is_success() => {
                    ResponseAction::success(id.as_str(), "coordinated-fix", "Fix applied")
                }
                Ok(outcome) => ResponseAction::failure(
                    id.as_str(),
                    "coordinated-fix",
                    format!("Capability reported failure: {}", outcome.data),
                ),
                Err(e) => ResponseAction::failure(
                    id.as_str(),
                    "coordinated-fix",
                    format!("Capability error: {e}"),
                ),
            };
            actions.push(action);
        }
        actions
    }
}

/// Runs configured remediation commands in order, stopping at the first failure
pub struct CommandFix {
    commands: HashMap<IncidentType, Vec<String>>,
    runner: Arc<dyn ProcessRunner>,
    excerpt_bytes: usize,
}

impl CommandFix {
    pub fn new(commands: HashMap<IncidentType, Vec<String>>, runner: Arc<dyn ProcessRunner>) -> Self {
        Self {
            commands,
            runner,
            excerpt_bytes: 1024,
        }
    }

    pub fn has_commands_for(&self, incident_type: IncidentType) -> bool {
        self.commands
            .get(&incident_type)
            .is_some_and(|cmds| !cmds.is_empty())
    }
}

#[async_trait]
impl FixStrategy for CommandFix {
    fn name(&self) -> &'static str {
        "command-fix"
    }

    async fn apply(&self, record: &ResponseRecord) -> Vec<ResponseAction> {
        let Some(commands) = self.commands.get(&record.incident_type()) else {
            return Vec::new();
        };

        let mut actions = Vec::new();
        for command in commands {
            let action = match self.runner.run(command).await {
                Ok(output) if output.success() => {
                    ResponseAction::success(self.name(), "fix-command", format!("`{command}` succeeded"))
                }
                Ok(output) => ResponseAction::failure(
                    self.name(),
                    "fix-command",
                    format!(
                        "`{command}` exited with {:?}: {}",
                        output.exit_code,
                        output.excerpt(self.excerpt_bytes)
                    ),
                ),
                Err(e) => ResponseAction::failure(self.name(), "fix-command", e.to_string()),
            };
            let failed = action.is_failure();
            actions.push(action);
            if failed {
                break;
            }
        }
        actions
    }
}

/// Chooses fix strategies per incident type
pub struct FixPlanner {
    delegation: Arc<dyn FixStrategy>,
    command_fix: Option<Arc<CommandFix>>,
    overrides: HashMap<IncidentType, Arc<dyn FixStrategy>>,
}

impl FixPlanner {
    pub fn new(delegation: Arc<dyn FixStrategy>) -> Self {
        Self {
            delegation,
            command_fix: None,
            overrides: HashMap::new(),
        }
    }

    pub fn with_command_fix(mut self, command_fix: CommandFix) -> Self {
        self.command_fix = Some(Arc::new(command_fix));
        self
    }

    /// Replace the whole plan for one type with a single strategy
    pub fn with_override(mut self, incident_type: IncidentType, strategy: Arc<dyn FixStrategy>) -> Self {
        self.overrides.insert(incident_type, strategy);
        self
    }

    /// Strategies to run, in order, for a type
    pub fn plan(&self, incident_type: IncidentType) -> Vec<Arc<dyn FixStrategy>> {
        if let Some(strategy) = self.overrides.get(&incident_type) {
            return vec![strategy.clone()];
        }
        let mut plan: Vec<Arc<dyn FixStrategy>> = Vec::new();
        if let Some(command_fix) = &self.command_fix {
            if command_fix.has_commands_for(incident_type) {
                plan.push(command_fix.clone());
            }
        }
        plan.push(self.delegation.clone());
        plan
    }

    /// Run the plan and collect all actions
    pub async fn apply(&self, record: &ResponseRecord) -> Vec<ResponseAction> {
        let mut actions = Vec::new();
        for strategy in self.plan(record.incident_type()) {
            let produced = strategy.apply(record).await;
            tracing::info!(
                strategy = strategy.name(),
                response_id = record.response_id(),
                actions = produced.len(),
                "Fix strategy applied"
            );
            actions.extend(produced);
        }
        actions
    }
}
