mod common;

use std::sync::Arc;

use async_trait::async_trait;
use common::{full_registry, Behavior, Harness, MockCapability, ScriptedRunner, ALL_CAPABILITIES};
use coordination::activation::capabilities_for;
use coordination::incident::{
    ActionResult, ImpactLevel, IncidentContext, IncidentType, PartialIncidentContext,
    ResponseAction, ResponseRecord, ResponseStatus, Severity,
};
use coordination::registry::StaticCapabilityRegistry;
use coordination::verifier::{ValidationReport, Validator};
use coordination::ResponseEvent;

fn actions<'a>(record: &'a ResponseRecord, label: &str) -> Vec<&'a ResponseAction> {
    record.timeline().iter().filter(|a| a.action == label).collect()
}

#[tokio::test]
async fn test_build_failure_resolves_when_build_recovers() {
    let harness = Harness::new(ScriptedRunner::default().with("npm run build", 0, "built in 2.1s"));
    let orchestrator = harness.orchestrator(full_registry());

    let record = orchestrator
        .handle("Build failed with compilation errors", None)
        .await;

    assert_eq!(record.incident_type(), IncidentType::BuildFailure);
    assert_eq!(record.severity(), Severity::High);
    assert!(!record.escalation_required());
    assert_eq!(
        record.activated_capabilities(),
        &["platform-engineer", "interface-engineer", "quality-engineer"]
    );
    assert_eq!(record.status(), ResponseStatus::Resolved);
    assert!(record
        .resolution()
        .unwrap()
        .starts_with("Resolved automatically after"));

    let build = actions(&record, "build-check");
    assert_eq!(build.len(), 1);
    assert_eq!(build[0].result, ActionResult::Success);

    // diagnostics run the build once, validation runs it again
    let builds = harness
        .runner
        .calls()
        .iter()
        .filter(|c| c.as_str() == "npm run build")
        .count();
    assert_eq!(builds, 2);

    let validation = actions(&record, "validation");
    assert_eq!(validation.len(), 1);
    assert_eq!(validation[0].result, ActionResult::Success);
}

#[tokio::test]
async fn test_build_failure_escalates_when_validation_fails() {
    let harness = Harness::new(ScriptedRunner::default().with(
        "npm run build",
        1,
        "ERROR: Module not found: Can't resolve './Widget'",
    ));
    let orchestrator = harness.orchestrator(full_registry());

    let record = orchestrator
        .handle("Build failed with compilation errors", None)
        .await;

    assert_eq!(record.status(), ResponseStatus::Escalated);
    assert!(record.escalation_required());
    assert!(record.resolution().unwrap().contains("post-fix validation failed"));

    let build = actions(&record, "build-check");
    assert_eq!(build[0].result, ActionResult::Failure);
    assert_eq!(
        build[0].next_actions.as_ref().unwrap()[0],
        "Install or correct the path of the missing module"
    );
    assert_eq!(actions(&record, "validation")[0].result, ActionResult::Failure);
}

#[tokio::test]
async fn test_router_failure_not_escalated_by_default() {
    let harness = Harness::new(ScriptedRunner::default());
    let orchestrator = harness.orchestrator(full_registry());

    let record = orchestrator
        .handle("No routes matched location /test", None)
        .await;

    assert_eq!(record.incident_type(), IncidentType::RouterFailure);
    assert_eq!(record.severity(), Severity::Critical);
    assert_eq!(record.incident().user_impact, ImpactLevel::Critical);
    assert!(!record.escalation_required());
    assert_eq!(record.status(), ResponseStatus::Resolved);

    // no routing files exist in the static reader
    let inspection = actions(&record, "routing-config-inspection");
    assert_eq!(inspection.len(), 1);
    assert_eq!(inspection[0].result, ActionResult::Failure);
}

#[tokio::test]
async fn test_router_failure_escalates_with_critical_business_impact() {
    let harness = Harness::new(ScriptedRunner::default());
    let orchestrator = harness.orchestrator(full_registry());

    let partial = PartialIncidentContext::new().with_business_impact(ImpactLevel::Critical);
    let record = orchestrator
        .handle("No routes matched location /test", Some(partial))
        .await;

    assert!(record.escalation_required());
    assert_eq!(record.status(), ResponseStatus::Escalated);
    assert_eq!(actions(&record, "escalation-flagged").len(), 1);
    // the pipeline still runs every phase before escalating
    assert!(!actions(&record, "coordinated-fix").is_empty());
}

#[tokio::test]
async fn test_security_incident_always_escalates() {
    let harness = Harness::new(ScriptedRunner::default());
    let orchestrator = harness.orchestrator(full_registry());

    let record = orchestrator
        .handle("Security vulnerability detected in dependencies", None)
        .await;

    assert_eq!(record.incident_type(), IncidentType::SecurityVulnerability);
    assert_eq!(record.severity(), Severity::Critical);
    assert!(record.escalation_required());
    assert_eq!(record.status(), ResponseStatus::Escalated);
    assert!(record
        .resolution()
        .unwrap()
        .contains("security_vulnerability"));
}

#[tokio::test]
async fn test_empty_registry_still_reaches_terminal_state() {
    let harness = Harness::new(ScriptedRunner::default());
    let orchestrator = harness.orchestrator(StaticCapabilityRegistry::new());

    let record = orchestrator
        .handle("Build failed with compilation errors", None)
        .await;

    assert!(record.is_terminal());
    assert!(record.activated_capabilities().is_empty());
    assert!(record.tools_activated().is_empty());

    let expected = capabilities_for(IncidentType::BuildFailure).len();
    let failures: Vec<_> = actions(&record, "capability-activation")
        .into_iter()
        .filter(|a| a.result == ActionResult::Failure)
        .collect();
    assert_eq!(failures.len(), expected);
    assert!(failures[0].details.contains("not available"));

    let fix = actions(&record, "coordinated-fix");
    assert_eq!(fix.len(), 1);
    assert_eq!(fix[0].result, ActionResult::Partial);
}

#[tokio::test]
async fn test_failing_capability_does_not_stop_the_rest() {
    let registry = ALL_CAPABILITIES.iter().fold(StaticCapabilityRegistry::new(), |reg, id| {
        let behavior = if *id == "platform-engineer" {
            Behavior::Error
        } else {
            Behavior::Complete
        };
        reg.with(MockCapability::new(id, behavior))
    });
    let harness = Harness::new(ScriptedRunner::default());
    let record = harness
        .orchestrator(registry)
        .handle("Build failed with compilation errors", None)
        .await;

    assert_eq!(
        record.activated_capabilities(),
        &["interface-engineer", "quality-engineer"]
    );
    let activations = actions(&record, "capability-activation");
    let first = activations[0];
    assert_eq!(first.actor, "platform-engineer");
    assert_eq!(first.result, ActionResult::Failure);
    assert!(record.is_terminal());
}

#[tokio::test]
async fn test_panicking_capability_does_not_stop_the_rest() {
    let registry = ALL_CAPABILITIES.iter().fold(StaticCapabilityRegistry::new(), |reg, id| {
        let behavior = if *id == "platform-engineer" {
            Behavior::Panic
        } else {
            Behavior::Complete
        };
        reg.with(MockCapability::new(id, behavior))
    });
    let harness = Harness::new(ScriptedRunner::default());
    let record = harness
        .orchestrator(registry)
        .handle("Build failed with compilation errors", None)
        .await;

    assert_eq!(
        record.activated_capabilities(),
        &["interface-engineer", "quality-engineer"]
    );
    let attempts: Vec<(&str, ActionResult)> = actions(&record, "capability-activation")
        .into_iter()
        .map(|a| (a.actor.as_str(), a.result))
        .collect();
    assert_eq!(
        attempts,
        vec![
            ("platform-engineer", ActionResult::Failure),
            ("interface-engineer", ActionResult::Success),
            ("quality-engineer", ActionResult::Success),
        ]
    );
    assert!(record.is_terminal());
}

#[tokio::test]
async fn test_tools_follow_activated_capabilities() {
    let harness = Harness::new(ScriptedRunner::default());
    let record = harness
        .orchestrator(full_registry())
        .handle("No routes matched location /test", None)
        .await;

    // interface-engineer then quality-engineer
    assert_eq!(
        record.tools_activated(),
        &["browser-automation", "component-inspector", "test-runner"]
    );
    assert_eq!(
        *harness.tools.calls.lock().unwrap(),
        vec!["browser-automation", "component-inspector", "test-runner"]
    );
}

#[tokio::test]
async fn test_capabilities_are_reactivated_for_the_fix_phase() {
    let platform = MockCapability::new("platform-engineer", Behavior::Complete);
    let registry = StaticCapabilityRegistry::new().with(platform.clone());
    let harness = Harness::new(ScriptedRunner::default());

    harness
        .orchestrator(registry)
        .handle("Build failed with compilation errors", None)
        .await;

    let phases = platform.phases();
    assert_eq!(phases.len(), 2);
    assert_eq!(phases[1], "coordinated_fix");
    assert!(platform.calls.lock().unwrap()[0].emergency);
}

struct PanickingValidator;

#[async_trait]
impl Validator for PanickingValidator {
    async fn validate(&self, _incident: &IncidentContext) -> ValidationReport {
        panic!("validator lost its mind")
    }
}

#[tokio::test]
async fn test_panicking_collaborators_are_contained() {
    let registry = StaticCapabilityRegistry::new()
        .with(MockCapability::new("platform-engineer", Behavior::Panic));
    let harness = Harness::new(ScriptedRunner::default());
    let orchestrator = harness
        .builder(registry)
        .with_validator(Arc::new(PanickingValidator))
        .build();

    let record = orchestrator
        .handle("Build failed with compilation errors", None)
        .await;

    assert_eq!(record.status(), ResponseStatus::Escalated);
    assert!(record.escalation_required());

    // the capability panic is contained inside activation
    assert!(actions(&record, "primary_activation").is_empty());
    let activations = actions(&record, "capability-activation");
    assert_eq!(activations[0].result, ActionResult::Failure);
    assert!(activations[0].details.contains("platform-engineer crashed"));

    let validation = actions(&record, "validation");
    assert_eq!(validation.len(), 1);
    assert!(validation[0].details.contains("validator lost its mind"));

    assert_eq!(harness.persisted().len(), 1);
}

#[tokio::test]
async fn test_timeline_timestamps_never_decrease() {
    let harness = Harness::new(ScriptedRunner::default());
    let record = harness
        .orchestrator(full_registry())
        .handle("Security vulnerability detected in dependencies", None)
        .await;

    let stamps: Vec<_> = record.timeline().iter().map(|a| a.timestamp).collect();
    assert!(stamps.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(record.timeline()[0].action, "classification");
}

#[tokio::test]
async fn test_events_cover_the_whole_lifecycle() {
    let harness = Harness::new(ScriptedRunner::default());
    let orchestrator = harness.orchestrator(full_registry());
    let mut rx = orchestrator.subscribe();

    let record = orchestrator
        .handle("No routes matched location /test", None)
        .await;

    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }

    assert!(events.iter().all(|e| e.response_id() == record.response_id()));
    assert!(matches!(events[0], ResponseEvent::ResponseStarted { .. }));
    assert!(events.last().unwrap().is_terminal());

    let path: Vec<ResponseStatus> = events
        .iter()
        .filter_map(|e| match e {
            ResponseEvent::PhaseTransition { to, .. } => Some(*to),
            _ => None,
        })
        .collect();
    assert_eq!(
        path,
        vec![
            ResponseStatus::Investigating,
            ResponseStatus::Fixing,
            ResponseStatus::Testing,
            ResponseStatus::Resolved,
        ]
    );
}

#[tokio::test]
async fn test_store_holds_terminal_snapshot() {
    let harness = Harness::new(ScriptedRunner::default());
    let orchestrator = harness.orchestrator(full_registry());

    let record = orchestrator
        .handle("Build failed with compilation errors", None)
        .await;

    let stored = orchestrator.get(record.response_id()).await.unwrap();
    assert_eq!(stored.status(), record.status());
    assert_eq!(stored.timeline().len(), record.timeline().len());
    assert!(orchestrator.get("resp-missing").await.is_none());
    assert_eq!(orchestrator.responses().await.len(), 1);
}

#[tokio::test]
async fn test_fix_commands_run_before_delegation() {
    let mut commands = std::collections::HashMap::new();
    commands.insert(
        IncidentType::DependencyConflict,
        vec!["npm dedupe".to_string()],
    );
    let harness = Harness::new(ScriptedRunner::default());
    let record = harness
        .builder(full_registry())
        .with_fix_commands(commands)
        .build()
        .handle("npm ERR! ERESOLVE could not resolve dependency tree", None)
        .await;

    assert_eq!(record.incident_type(), IncidentType::DependencyConflict);
    let labels: Vec<&str> = record
        .timeline()
        .iter()
        .map(|a| a.action.as_str())
        .filter(|a| *a == "fix-command" || *a == "coordinated-fix")
        .collect();
    assert_eq!(labels[0], "fix-command");
    assert!(labels[1..].iter().all(|a| *a == "coordinated-fix"));
    assert!(harness.runner.calls().contains(&"npm dedupe".to_string()));
}
