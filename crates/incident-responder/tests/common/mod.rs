//! Hand-written collaborator mocks shared by the integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use coordination::artifacts::StaticFileReader;
use coordination::incident::PersistedResponse;
use coordination::persistence::{IncidentLog, PersistenceError};
use coordination::process::{ProcessError, ProcessOutput, ProcessRunner};
use coordination::registry::{
    ActivationContext, ActivationError, Capability, CapabilityOutcome, StaticCapabilityRegistry,
    ToolRegistry,
};
use incident_responder::{OrchestratorBuilder, ResponseOrchestrator};

/// Every capability id the activation tables can ask for
pub const ALL_CAPABILITIES: &[&str] = &[
    "interface-engineer",
    "service-engineer",
    "data-engineer",
    "quality-engineer",
    "platform-engineer",
    "security-engineer",
    "performance-engineer",
];

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    Complete,
    Error,
    Panic,
}

/// Capability that records every activation context it receives
pub struct MockCapability {
    id: String,
    behavior: Behavior,
    pub calls: Mutex<Vec<ActivationContext>>,
}

impl MockCapability {
    pub fn new(id: &str, behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            behavior,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn phases(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|c| c.phase.clone())
            .collect()
    }
}

#[async_trait]
impl Capability for MockCapability {
    fn id(&self) -> &str {
        &self.id
    }

    async fn activate(&self, ctx: &ActivationContext) -> Result<CapabilityOutcome, ActivationError> {
        self.calls.lock().unwrap().push(ctx.clone());
        match self.behavior {
            Behavior::Complete => Ok(CapabilityOutcome::completed(serde_json::json!({
                "handledBy": self.id,
            }))),
            Behavior::Error => Err(ActivationError::Failed(format!("{} is offline", self.id))),
            Behavior::Panic => panic!("{} crashed", self.id),
        }
    }
}

/// Registry with every known capability completing successfully
pub fn full_registry() -> StaticCapabilityRegistry {
    ALL_CAPABILITIES
        .iter()
        .fold(StaticCapabilityRegistry::new(), |reg, id| {
            reg.with(MockCapability::new(id, Behavior::Complete))
        })
}

/// Tool registry recording activations; listed tools fail
#[derive(Default)]
pub struct MockTools {
    pub failing: HashSet<String>,
    pub calls: Mutex<Vec<String>>,
}

#[async_trait]
impl ToolRegistry for MockTools {
    async fn activate(&self, tool_id: &str, _ctx: &ActivationContext) -> Result<(), ActivationError> {
        self.calls.lock().unwrap().push(tool_id.to_string());
        if self.failing.contains(tool_id) {
            Err(ActivationError::Failed(format!("{tool_id} unavailable")))
        } else {
            Ok(())
        }
    }
}

/// Runner answering from a command → (exit code, stdout) table;
/// unknown commands exit 0 with no output
#[derive(Default)]
pub struct ScriptedRunner {
    pub scripts: HashMap<String, (i32, String)>,
    pub calls: Mutex<Vec<String>>,
}

impl ScriptedRunner {
    pub fn with(mut self, command: &str, exit_code: i32, stdout: &str) -> Self {
        self.scripts
            .insert(command.to_string(), (exit_code, stdout.to_string()));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProcessRunner for ScriptedRunner {
    async fn run(&self, command: &str) -> Result<ProcessOutput, ProcessError> {
        self.calls.lock().unwrap().push(command.to_string());
        let (exit_code, stdout) = self
            .scripts
            .get(command)
            .cloned()
            .unwrap_or((0, String::new()));
        Ok(ProcessOutput {
            stdout,
            stderr: String::new(),
            exit_code: Some(exit_code),
        })
    }
}

/// In-memory incident log; can be told to fail every append
#[derive(Default)]
pub struct MemoryLog {
    pub fail: bool,
    pub entries: Mutex<Vec<(String, PersistedResponse)>>,
}

#[async_trait]
impl IncidentLog for MemoryLog {
    async fn append(&self, resource: &str, record: &PersistedResponse) -> Result<(), PersistenceError> {
        if self.fail {
            return Err(PersistenceError::WriterClosed);
        }
        self.entries
            .lock()
            .unwrap()
            .push((resource.to_string(), record.clone()));
        Ok(())
    }
}

pub struct Harness {
    pub runner: Arc<ScriptedRunner>,
    pub tools: Arc<MockTools>,
    pub log: Arc<MemoryLog>,
}

impl Harness {
    pub fn new(runner: ScriptedRunner) -> Self {
        Self {
            runner: Arc::new(runner),
            tools: Arc::new(MockTools::default()),
            log: Arc::new(MemoryLog::default()),
        }
    }

    pub fn builder(&self, registry: StaticCapabilityRegistry) -> OrchestratorBuilder {
        OrchestratorBuilder::new(
            Arc::new(registry),
            self.runner.clone(),
            Arc::new(StaticFileReader::new()),
            self.log.clone(),
        )
        .with_tools(self.tools.clone())
    }

    pub fn orchestrator(&self, registry: StaticCapabilityRegistry) -> ResponseOrchestrator {
        self.builder(registry).build()
    }

    pub fn persisted(&self) -> Vec<PersistedResponse> {
        self.log
            .entries
            .lock()
            .unwrap()
            .iter()
            .map(|(_, r)| r.clone())
            .collect()
    }
}
