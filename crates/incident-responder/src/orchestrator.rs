//! Response Orchestrator — drives one incident from message to terminal state.
//!
//! ```text
//! classify ─► responding ──activate──► investigating ──diagnose──► fixing
//!                                                                   │
//!        resolved / escalated ◄──decide── testing ◄──────fix────────┘
//!                 │                         (validate)
//!                 └──► persist ──► registry snapshot ──► ResponseCompleted
//! ```
//!
//! `handle()` is total: every phase runs behind a panic guard, collaborator
//! errors are already turned into failure actions by the stages themselves,
//! and a terminal status is always reached. Callers inspect `status()` and
//! `escalation_required()` on the returned record.

use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use coordination::activation::CapabilityActivator;
use coordination::artifacts::{FileReader, FsFileReader};
use coordination::diagnostics::{DiagnosticsConfig, DiagnosticsEngine};
use coordination::error::{panic_message, CoordinationError};
use coordination::escalation::{describe_escalation, initial_triggers, ResolutionPolicy};
use coordination::events::{EventBus, ResponseEvent, SharedEventBus};
use coordination::incident::{
    ActionResult, IncidentType, PartialIncidentContext, ResponseAction, ResponseRecord,
    ResponseStatus,
};
use coordination::persistence::{IncidentLog, JsonlIncidentLog};
use coordination::process::{ProcessRunner, TokioProcessRunner};
use coordination::registry::{
    CapabilityRegistry, CommandCapability, StaticCapabilityRegistry, ToolRegistry,
    TracingToolRegistry,
};
use coordination::remediation::{CapabilityDelegation, CommandFix, FixPlanner};
use coordination::router::IncidentClassifier;
use coordination::state::{InMemoryStore, SharedResponseStore};
use coordination::verifier::{ValidationPipeline, Validator};
use futures::FutureExt;
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::config::ResponderConfig;
use crate::state_machine::StateMachine;

/// Actor label for orchestrator-authored timeline entries
pub const ORCHESTRATOR_ACTOR: &str = "response-orchestrator";

/// Actor label for validation entries
pub const VALIDATOR_ACTOR: &str = "validator";

/// Runs incident responses end to end
pub struct ResponseOrchestrator {
    classifier: IncidentClassifier,
    policy: ResolutionPolicy,
    activator: CapabilityActivator,
    diagnostics: DiagnosticsEngine,
    fixes: FixPlanner,
    validator: Arc<dyn Validator>,
    store: SharedResponseStore,
    log: Arc<dyn IncidentLog>,
    log_resource: String,
    events: SharedEventBus,
}

impl ResponseOrchestrator {
    pub fn builder(
        capabilities: Arc<dyn CapabilityRegistry>,
        runner: Arc<dyn ProcessRunner>,
        reader: Arc<dyn FileReader>,
        log: Arc<dyn IncidentLog>,
    ) -> OrchestratorBuilder {
        OrchestratorBuilder::new(capabilities, runner, reader, log)
    }

    /// Handle one incident; always returns a record in a terminal state.
    pub async fn handle(
        &self,
        error_message: &str,
        partial: Option<PartialIncidentContext>,
    ) -> ResponseRecord {
        let started = Instant::now();
        let mut machine = StateMachine::new();
        let mut record = self.open_record(error_message, partial.as_ref()).await;

        info!(
            response_id = record.response_id(),
            incident_type = %record.incident_type(),
            severity = %record.severity(),
            escalation_required = record.escalation_required(),
            "Incident response started"
        );

        // responding: primary capability activation
        let reason = match guard(self.activator.activate(&mut record)).await {
            Ok(outcome) => format!(
                "primary activation attempted ({} activated, {} failed)",
                outcome.activated.len(),
                outcome.failures.len()
            ),
            Err(message) => {
                record_fault(&mut record, "primary_activation", message);
                "primary activation faulted".to_string()
            }
        };
        self.advance(&mut machine, &mut record, ResponseStatus::Investigating, reason)
            .await;

        // investigating: type-specific diagnostics
        let reason = match guard(self.diagnostics.diagnose(record.incident())).await {
            Ok(findings) => {
                let failures = findings.iter().filter(|f| f.is_failure()).count();
                let count = findings.len();
                record.record_all(findings);
                format!("diagnostics attempted ({count} findings, {failures} failed)")
            }
            Err(message) => {
                record_fault(&mut record, "diagnostics", message);
                "diagnostics faulted".to_string()
            }
        };
        self.advance(&mut machine, &mut record, ResponseStatus::Fixing, reason)
            .await;

        // fixing: coordinated fix
        let reason = match guard(self.fixes.apply(&record)).await {
            Ok(actions) => {
                let count = actions.len();
                record.record_all(actions);
                format!("coordinated fix attempted ({count} actions)")
            }
            Err(message) => {
                record_fault(&mut record, "coordinated_fix", message);
                "coordinated fix faulted".to_string()
            }
        };
        self.advance(&mut machine, &mut record, ResponseStatus::Testing, reason)
            .await;

        // testing: validation decides between resolve and escalate
        let validation_passed = match guard(self.validator.validate(record.incident())).await {
            Ok(report) => {
                record.record(report.to_action(VALIDATOR_ACTOR));
                report.passed()
            }
            Err(message) => {
                record_fault(&mut record, "validation", message);
                false
            }
        };
        if !validation_passed {
            record.require_escalation();
        }

        if record.escalation_required() {
            self.escalate(&mut machine, &mut record, validation_passed)
                .await;
        } else {
            self.resolve(&mut machine, &mut record).await;
        }

        let resolution_time_ms = started.elapsed().as_millis() as u64;
        self.persist(&record, resolution_time_ms).await;
        self.store.set(record.clone()).await;

        self.events.publish(ResponseEvent::ResponseCompleted {
            response_id: record.response_id().to_string(),
            status: record.status(),
            escalation_required: record.escalation_required(),
            resolution_time_ms,
            timestamp: Utc::now(),
        });

        info!(
            response_id = record.response_id(),
            status = %record.status(),
            escalation_required = record.escalation_required(),
            actions = record.timeline().len(),
            resolution_time_ms,
            path = %machine.summary(),
            "Incident response finished"
        );

        record
    }

    /// Latest snapshot of a response handled by this orchestrator
    pub async fn get(&self, response_id: &str) -> Option<ResponseRecord> {
        self.store.get(response_id).await
    }

    /// All snapshots, oldest first
    pub async fn responses(&self) -> Vec<ResponseRecord> {
        self.store.values().await
    }

    /// Subscribe to response lifecycle events
    pub fn subscribe(&self) -> broadcast::Receiver<ResponseEvent> {
        self.events.subscribe()
    }

    pub fn events(&self) -> &SharedEventBus {
        &self.events
    }

    async fn open_record(
        &self,
        error_message: &str,
        partial: Option<&PartialIncidentContext>,
    ) -> ResponseRecord {
        let incident = self.classifier.classify(error_message, partial);
        let triggers = initial_triggers(&incident);
        let minutes = self
            .policy
            .estimate_minutes(incident.incident_type, incident.severity);

        let systems: Vec<&str> = incident.affected_systems.iter().map(String::as_str).collect();
        let summary = format!(
            "Classified as {} ({} severity, {} user impact, {} business impact); systems [{}]; estimated {} min",
            incident.incident_type,
            incident.severity,
            incident.user_impact,
            incident.business_impact,
            systems.join(", "),
            minutes
        );

        let mut record = ResponseRecord::new(incident, minutes, !triggers.is_empty());
        record.record(ResponseAction::success(ORCHESTRATOR_ACTOR, "classification", summary));
        if !triggers.is_empty() {
            let reasons: Vec<String> = triggers.iter().map(|t| t.to_string()).collect();
            record.record(ResponseAction::new(
                ORCHESTRATOR_ACTOR,
                "escalation-flagged",
                ActionResult::Pending,
                format!("Escalation required: {}", reasons.join("; ")),
            ));
        }

        self.store.set(record.clone()).await;
        self.events.publish(ResponseEvent::ResponseStarted {
            response_id: record.response_id().to_string(),
            incident_type: record.incident_type(),
            severity: record.severity(),
            escalation_required: record.escalation_required(),
            timestamp: Utc::now(),
        });
        record
    }

    async fn advance(
        &self,
        machine: &mut StateMachine,
        record: &mut ResponseRecord,
        to: ResponseStatus,
        reason: String,
    ) {
        match machine.advance(record, to, reason) {
            Ok(transition) => {
                self.events.publish(ResponseEvent::PhaseTransition {
                    response_id: record.response_id().to_string(),
                    from: transition.from,
                    to: transition.to,
                    reason: transition.reason,
                    timestamp: Utc::now(),
                });
            }
            Err(e) => {
                warn!(response_id = record.response_id(), error = %e, "Transition refused");
                record.record(ResponseAction::failure(
                    ORCHESTRATOR_ACTOR,
                    "transition",
                    e.to_string(),
                ));
            }
        }
        self.store.set(record.clone()).await;
    }

    async fn escalate(
        &self,
        machine: &mut StateMachine,
        record: &mut ResponseRecord,
        validation_passed: bool,
    ) {
        let description = describe_escalation(record.incident(), validation_passed);
        warn!(response_id = record.response_id(), reason = %description, "Escalating incident");
        record.record(ResponseAction::new(
            ORCHESTRATOR_ACTOR,
            "escalated",
            ActionResult::Pending,
            description.clone(),
        ));
        record.set_resolution(description.clone());
        self.advance(machine, record, ResponseStatus::Escalated, description)
            .await;
    }

    async fn resolve(&self, machine: &mut StateMachine, record: &mut ResponseRecord) {
        let resolution = format!(
            "Resolved automatically after {} actions",
            record.timeline().len()
        );
        record.record(ResponseAction::success(
            ORCHESTRATOR_ACTOR,
            "resolved",
            resolution.clone(),
        ));
        record.set_resolution(resolution);
        self.advance(
            machine,
            record,
            ResponseStatus::Resolved,
            "validation passed".to_string(),
        )
        .await;
    }

    /// Append the terminal record to the incident log; failures never block
    async fn persist(&self, record: &ResponseRecord, resolution_time_ms: u64) {
        let persisted = record.to_persisted(resolution_time_ms);
        if let Err(e) = self.log.append(&self.log_resource, &persisted).await {
            let err = CoordinationError::from(e);
            warn!(response_id = record.response_id(), error = %err, "Failed to persist incident record");
            self.events.publish(ResponseEvent::PersistenceFailed {
                response_id: record.response_id().to_string(),
                error: err.to_string(),
                timestamp: Utc::now(),
            });
        }
    }
}

/// Run a phase, converting a panic into its message
async fn guard<T>(phase: impl Future<Output = T>) -> Result<T, String> {
    AssertUnwindSafe(phase)
        .catch_unwind()
        .await
        .map_err(panic_message)
}

fn record_fault(record: &mut ResponseRecord, phase: &str, message: String) {
    let err = CoordinationError::PhasePanicked {
        phase: phase.to_string(),
        message,
    };
    warn!(response_id = record.response_id(), error = %err, "Phase faulted");
    record.record(ResponseAction::failure(ORCHESTRATOR_ACTOR, phase, err.to_string()));
}

/// Assembles a [`ResponseOrchestrator`] from its collaborators
pub struct OrchestratorBuilder {
    capabilities: Arc<dyn CapabilityRegistry>,
    tools: Arc<dyn ToolRegistry>,
    runner: Arc<dyn ProcessRunner>,
    reader: Arc<dyn FileReader>,
    log: Arc<dyn IncidentLog>,
    log_resource: String,
    classifier: IncidentClassifier,
    policy: ResolutionPolicy,
    diagnostics_config: DiagnosticsConfig,
    diagnostics: Option<DiagnosticsEngine>,
    validator: Option<Arc<dyn Validator>>,
    fix_commands: HashMap<IncidentType, Vec<String>>,
    store: Option<SharedResponseStore>,
    events: Option<SharedEventBus>,
}

impl OrchestratorBuilder {
    pub fn new(
        capabilities: Arc<dyn CapabilityRegistry>,
        runner: Arc<dyn ProcessRunner>,
        reader: Arc<dyn FileReader>,
        log: Arc<dyn IncidentLog>,
    ) -> Self {
        Self {
            capabilities,
            tools: Arc::new(TracingToolRegistry),
            runner,
            reader,
            log,
            log_resource: coordination::persistence::DEFAULT_RESOURCE.to_string(),
            classifier: IncidentClassifier::new(),
            policy: ResolutionPolicy::default(),
            diagnostics_config: DiagnosticsConfig::default(),
            diagnostics: None,
            validator: None,
            fix_commands: HashMap::new(),
            store: None,
            events: None,
        }
    }

    /// Production wiring: command capabilities, filesystem reader, tokio
    /// process runner and a JSONL log under the configured directory.
    ///
    /// Spawns the log writer, so it must be called inside a Tokio runtime.
    pub fn from_config(config: &ResponderConfig) -> Self {
        let runner: Arc<dyn ProcessRunner> = Arc::new(
            TokioProcessRunner::new(&config.project_root).with_timeout(config.command_timeout()),
        );
        let reader: Arc<dyn FileReader> = Arc::new(FsFileReader::new(&config.project_root));

        let mut registry = StaticCapabilityRegistry::new();
        for (id, command) in &config.capabilities {
            registry.register(Arc::new(CommandCapability::new(
                id.clone(),
                command.clone(),
                runner.clone(),
            )));
        }

        let log = Arc::new(JsonlIncidentLog::spawn(config.resolved_log_dir()));

        Self::new(Arc::new(registry), runner, reader, log)
            .with_log_resource(config.log_resource.clone())
            .with_policy(config.resolution.clone())
            .with_diagnostics_config(config.diagnostics.clone())
            .with_fix_commands(config.fix_commands.clone())
    }

    pub fn with_tools(mut self, tools: Arc<dyn ToolRegistry>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_log_resource(mut self, resource: impl Into<String>) -> Self {
        self.log_resource = resource.into();
        self
    }

    pub fn with_classifier(mut self, classifier: IncidentClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_policy(mut self, policy: ResolutionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_diagnostics_config(mut self, config: DiagnosticsConfig) -> Self {
        self.diagnostics_config = config;
        self
    }

    /// Replace the standard diagnostics engine
    pub fn with_diagnostics(mut self, engine: DiagnosticsEngine) -> Self {
        self.diagnostics = Some(engine);
        self
    }

    /// Replace the command-backed validation pipeline
    pub fn with_validator(mut self, validator: Arc<dyn Validator>) -> Self {
        self.validator = Some(validator);
        self
    }

    pub fn with_fix_commands(mut self, commands: HashMap<IncidentType, Vec<String>>) -> Self {
        self.fix_commands = commands;
        self
    }

    pub fn with_store(mut self, store: SharedResponseStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_events(mut self, events: SharedEventBus) -> Self {
        self.events = Some(events);
        self
    }

    pub fn build(self) -> ResponseOrchestrator {
        let config = Arc::new(self.diagnostics_config);

        let diagnostics = self.diagnostics.unwrap_or_else(|| {
            DiagnosticsEngine::standard((*config).clone(), self.runner.clone(), self.reader.clone())
        });
        let validator = self.validator.unwrap_or_else(|| {
            Arc::new(ValidationPipeline::new(config.clone(), self.runner.clone())) as Arc<dyn Validator>
        });

        let mut fixes = FixPlanner::new(Arc::new(CapabilityDelegation::new(
            self.capabilities.clone(),
        )));
        if !self.fix_commands.is_empty() {
            fixes = fixes.with_command_fix(CommandFix::new(self.fix_commands, self.runner.clone()));
        }

        ResponseOrchestrator {
            classifier: self.classifier,
            policy: self.policy,
            activator: CapabilityActivator::new(self.capabilities, self.tools),
            diagnostics,
            fixes,
            validator,
            store: self.store.unwrap_or_else(|| InMemoryStore::new().shared()),
            log: self.log,
            log_resource: self.log_resource,
            events: self.events.unwrap_or_else(|| EventBus::new().shared()),
        }
    }
}
