//! Incident Types — Closed classification vocabulary for failure signals
//!
//! Every enum here has a fixed, total order where the domain needs one
//! (severity and impact), so comparisons like `severity >= Severity::Critical`
//! are type-level facts rather than string lookups.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Kinds of incidents the response pipeline understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentType {
    BuildFailure,
    RuntimeError,
    DependencyConflict,
    SecurityVulnerability,
    PerformanceDegradation,
    DataLossRisk,
    RouterFailure,
    ApiFailure,
    DeploymentFailure,
    TestFailureCascade,
    MemoryLeak,
    InfiniteLoop,
}

impl IncidentType {
    /// All incident types in declaration order
    pub fn all() -> &'static [IncidentType] {
        &[
            Self::BuildFailure,
            Self::RuntimeError,
            Self::DependencyConflict,
            Self::SecurityVulnerability,
            Self::PerformanceDegradation,
            Self::DataLossRisk,
            Self::RouterFailure,
            Self::ApiFailure,
            Self::DeploymentFailure,
            Self::TestFailureCascade,
            Self::MemoryLeak,
            Self::InfiniteLoop,
        ]
    }

    /// Stable snake_case identifier (matches the serde representation)
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BuildFailure => "build_failure",
            Self::RuntimeError => "runtime_error",
            Self::DependencyConflict => "dependency_conflict",
            Self::SecurityVulnerability => "security_vulnerability",
            Self::PerformanceDegradation => "performance_degradation",
            Self::DataLossRisk => "data_loss_risk",
            Self::RouterFailure => "router_failure",
            Self::ApiFailure => "api_failure",
            Self::DeploymentFailure => "deployment_failure",
            Self::TestFailureCascade => "test_failure_cascade",
            Self::MemoryLeak => "memory_leak",
            Self::InfiniteLoop => "infinite_loop",
        }
    }
}

impl std::fmt::Display for IncidentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for IncidentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown incident type: {s}"))
    }
}

/// Incident severity, ordered low < medium < high < critical < catastrophic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
    Catastrophic,
}

impl Severity {
    pub fn all() -> &'static [Severity] {
        &[
            Self::Low,
            Self::Medium,
            Self::High,
            Self::Critical,
            Self::Catastrophic,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
            Self::Catastrophic => "catastrophic",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|v| v.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown severity: {s}"))
    }
}

/// User or business impact, ordered none < low < medium < high < critical
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImpactLevel {
    None,
    Low,
    Medium,
    High,
    Critical,
}

impl ImpactLevel {
    pub fn all() -> &'static [ImpactLevel] {
        &[
            Self::None,
            Self::Low,
            Self::Medium,
            Self::High,
            Self::Critical,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl std::fmt::Display for ImpactLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ImpactLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|v| v.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown impact level: {s}"))
    }
}

/// A fully classified incident
///
/// Built per `handle()` call by the classifier and never stored on its own;
/// the owning [`ResponseRecord`](super::record::ResponseRecord) keeps a copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentContext {
    #[serde(rename = "type")]
    pub incident_type: IncidentType,
    pub severity: Severity,
    pub error_message: String,
    /// Non-exclusive; `{"unknown"}` when no system keyword matched
    pub affected_systems: BTreeSet<String>,
    pub detected_at: DateTime<Utc>,
    pub user_impact: ImpactLevel,
    pub business_impact: ImpactLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack_trace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affected_files: Option<Vec<String>>,
}

/// Caller-supplied hints; any field set here overrides the classifier
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PartialIncidentContext {
    #[serde(rename = "type")]
    pub incident_type: Option<IncidentType>,
    pub severity: Option<Severity>,
    pub affected_systems: Option<BTreeSet<String>>,
    pub detected_at: Option<DateTime<Utc>>,
    pub user_impact: Option<ImpactLevel>,
    pub business_impact: Option<ImpactLevel>,
    pub stack_trace: Option<String>,
    pub affected_files: Option<Vec<String>>,
}

impl PartialIncidentContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_type(mut self, incident_type: IncidentType) -> Self {
        self.incident_type = Some(incident_type);
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = Some(severity);
        self
    }

    pub fn with_user_impact(mut self, impact: ImpactLevel) -> Self {
        self.user_impact = Some(impact);
        self
    }

    pub fn with_business_impact(mut self, impact: ImpactLevel) -> Self {
        self.business_impact = Some(impact);
        self
    }

    pub fn with_affected_systems<I, S>(mut self, systems: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.affected_systems = Some(systems.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_affected_files(mut self, files: Vec<String>) -> Self {
        self.affected_files = Some(files);
        self
    }

    pub fn with_stack_trace(mut self, trace: impl Into<String>) -> Self {
        self.stack_trace = Some(trace.into());
        self
    }
}
