//! Capability Activator — primary responders for an incident
//!
//! Each incident type maps to an ordered list of 2–3 capability ids. The
//! activator walks that list strictly in order:
//!
//! ```text
//! for id in capabilities_for(type):
//!     resolve(id) ── none ──► failure action, continue
//!         │
//!     activate(ctx) ── err / failed ──► failure action, continue
//!         │
//!     success action, record capability
//!         │
//!     for tool in tools_for(domain_of(id)):
//!         activate tool ── err ──► failure action (never fails the step)
//! ```
//!
//! Sequential activation keeps the timeline deterministic.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{panic_message, CoordinationError};
use crate::incident::{IncidentType, ResponseAction, ResponseRecord};
use crate::registry::{ActivationContext, ActivationError, CapabilityRegistry, ToolRegistry};

/// Actor label used for activator bookkeeping entries
pub const ACTIVATOR_ACTOR: &str = "capability-activator";

/// Capabilities used for types without a dedicated entry
pub const DEFAULT_CAPABILITIES: &[&str] = &["service-engineer", "quality-engineer"];

/// Specialization of a capability; tool activations follow the domain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityDomain {
    Interface,
    Service,
    Quality,
    Platform,
    Security,
    Performance,
}

impl CapabilityDomain {
    /// Auxiliary tools fired after a capability of this domain succeeds
    pub fn tools(self) -> &'static [&'static str] {
        match self {
            Self::Interface => &["browser-automation", "component-inspector"],
            Self::Service => &["api-tester", "schema-inspector"],
            Self::Quality => &["test-runner"],
            Self::Platform => &["build-runner"],
            Self::Security => &["dependency-audit"],
            Self::Performance => &["profiler"],
        }
    }
}

impl std::fmt::Display for CapabilityDomain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Interface => write!(f, "interface"),
            Self::Service => write!(f, "service"),
            Self::Quality => write!(f, "quality"),
            Self::Platform => write!(f, "platform"),
            Self::Security => write!(f, "security"),
            Self::Performance => write!(f, "performance"),
        }
    }
}

/// Domain of a known capability id
pub fn capability_domain(capability_id: &str) -> Option<CapabilityDomain> {
    match capability_id {
        "interface-engineer" => Some(CapabilityDomain::Interface),
        "service-engineer" | "data-engineer" => Some(CapabilityDomain::Service),
        "quality-engineer" => Some(CapabilityDomain::Quality),
        "platform-engineer" => Some(CapabilityDomain::Platform),
        "security-engineer" => Some(CapabilityDomain::Security),
        "performance-engineer" => Some(CapabilityDomain::Performance),
        _ => None,
    }
}

/// Ordered primary capabilities for an incident type
pub fn capabilities_for(incident_type: IncidentType) -> &'static [&'static str] {
    use IncidentType as T;
    match incident_type {
        T::BuildFailure => &["platform-engineer", "interface-engineer", "quality-engineer"],
        T::RuntimeError => &["service-engineer", "interface-engineer", "quality-engineer"],
        T::DependencyConflict => &["platform-engineer", "security-engineer"],
        T::SecurityVulnerability => &["security-engineer", "service-engineer", "quality-engineer"],
        T::PerformanceDegradation => &["performance-engineer", "service-engineer"],
        T::DataLossRisk => &["data-engineer", "service-engineer", "quality-engineer"],
        T::RouterFailure => &["interface-engineer", "quality-engineer"],
        T::ApiFailure => &["service-engineer", "quality-engineer"],
        T::DeploymentFailure => &["platform-engineer", "service-engineer"],
        T::TestFailureCascade => &["quality-engineer", "interface-engineer", "service-engineer"],
        T::MemoryLeak | T::InfiniteLoop => DEFAULT_CAPABILITIES,
    }
}

/// `{activated, failures}` summary of one activation pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivationOutcome {
    pub activated: Vec<String>,
    pub failures: Vec<String>,
}

impl ActivationOutcome {
    pub fn attempted(&self) -> usize {
        self.activated.len() + self.failures.len()
    }
}

/// Resolves and invokes primary capabilities plus their domain tools
pub struct CapabilityActivator {
    capabilities: Arc<dyn CapabilityRegistry>,
    tools: Arc<dyn ToolRegistry>,
}

impl CapabilityActivator {
    pub fn new(capabilities: Arc<dyn CapabilityRegistry>, tools: Arc<dyn ToolRegistry>) -> Self {
        Self {
            capabilities,
            tools,
        }
    }

    pub fn capability_registry(&self) -> &Arc<dyn CapabilityRegistry> {
        &self.capabilities
    }

    /// Activate every mapped capability for the record's incident type
    ///
    /// Each attempt appends exactly one capability action to the timeline,
    /// followed by one action per tool fired for a successful capability.
    pub async fn activate(&self, record: &mut ResponseRecord) -> ActivationOutcome {
        let incident_type = record.incident_type();
        let ctx = ActivationContext::emergency(
            record.response_id(),
            incident_type,
            record.severity(),
        );
        let mut outcome = ActivationOutcome::default();

        for &capability_id in capabilities_for(incident_type) {
            if self.activate_one(capability_id, &ctx, record).await {
                outcome.activated.push(capability_id.to_string());
                self.fire_tools(capability_id, &ctx, record).await;
            } else {
                outcome.failures.push(capability_id.to_string());
            }
        }

        info!(
            response_id = %ctx.response_id,
            incident_type = %incident_type,
            activated = outcome.activated.len(),
            failed = outcome.failures.len(),
            "Capability activation finished"
        );

        outcome
    }

    async fn activate_one(
        &self,
        capability_id: &str,
        ctx: &ActivationContext,
        record: &mut ResponseRecord,
    ) -> bool {
        let Some(capability) = self.capabilities.resolve(capability_id) else {
            warn!(capability = capability_id, "Capability not registered");
            record.record(ResponseAction::failure(
                capability_id,
                "capability-activation",
                CoordinationError::CapabilityUnavailable {
                    id: capability_id.to_string(),
                }
                .to_string(),
            ));
            return false;
        };

        let activation = AssertUnwindSafe(capability.activate(ctx))
            .catch_unwind()
            .await;

        let outcome = match activation {
            Ok(outcome) => outcome,
            Err(payload) => {
                let message = panic_message(payload);
                warn!(capability = capability_id, panic = %message, "Capability panicked");
                record.record(ResponseAction::failure(
                    capability_id,
                    "capability-activation",
                    CoordinationError::CapabilityPanicked {
                        id: capability_id.to_string(),
                        message,
                    }
                    .to_string(),
                ));
                return false;
            }
        };

        match outcome {
            Ok(result) if result.status.is_success() => {
                record.add_capability(capability_id);
                record.record(ResponseAction::success(
                    capability_id,
                    "capability-activation",
                    format!("Activated ({:?}): {}", result.status, result.data),
                ));
                true
            }
            Ok(result) => {
                warn!(capability = capability_id, "Capability reported failure");
                record.record(ResponseAction::failure(
                    capability_id,
                    "capability-activation",
                    format!("Capability reported failure: {}", result.data),
                ));
                false
            }
            Err(e) => {
                warn!(capability = capability_id, error = %e, "Capability activation failed");
                record.record(ResponseAction::failure(
                    capability_id,
                    "capability-activation",
                    CoordinationError::CapabilityFailed {
                        id: capability_id.to_string(),
                        source: e,
                    }
                    .to_string(),
                ));
                false
            }
        }
    }

    async fn fire_tools(
        &self,
        capability_id: &str,
        ctx: &ActivationContext,
        record: &mut ResponseRecord,
    ) {
        let Some(domain) = capability_domain(capability_id) else {
            return;
        };

        for &tool_id in domain.tools() {
            let activation = AssertUnwindSafe(self.tools.activate(tool_id, ctx))
                .catch_unwind()
                .await
                .unwrap_or_else(|payload| {
                    Err(ActivationError::Failed(format!(
                        "panicked: {}",
                        panic_message(payload)
                    )))
                });

            match activation {
                Ok(()) => {
                    record.add_tool(tool_id);
                    record.record(ResponseAction::success(
                        tool_id,
                        "tool-activation",
                        format!("Activated for {domain} capability {capability_id}"),
                    ));
                }
                Err(e) => {
                    warn!(tool = tool_id, capability = capability_id, error = %e, "Tool activation failed");
                    record.record(ResponseAction::failure(
                        tool_id,
                        "tool-activation",
                        CoordinationError::ToolActivation {
                            id: tool_id.to_string(),
                            source: e,
                        }
                        .to_string(),
                    ));
                }
            }
        }
    }
}
