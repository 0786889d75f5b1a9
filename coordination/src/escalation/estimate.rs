//! Resolution-time estimate
//!
//! `estimated_minutes = base_minutes[type] × multiplier[severity]`, rounded
//! up. Both tables are plain data so deployments can recalibrate them from
//! configuration without touching the orchestrator.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::incident::{IncidentType, Severity};

/// Used for types removed from the table programmatically
const FALLBACK_BASE_MINUTES: u32 = 30;

/// Base-minutes and severity-multiplier tables
///
/// Configured tables are merged over the defaults: a `[resolution]` section
/// only needs the entries it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolutionPolicy {
    #[serde(deserialize_with = "merge_base_minutes")]
    pub base_minutes: HashMap<IncidentType, u32>,
    #[serde(deserialize_with = "merge_severity_multipliers")]
    pub severity_multipliers: HashMap<Severity, f64>,
}

fn merge_base_minutes<'de, D>(deserializer: D) -> Result<HashMap<IncidentType, u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let mut merged = ResolutionPolicy::default().base_minutes;
    merged.extend(HashMap::<IncidentType, u32>::deserialize(deserializer)?);
    Ok(merged)
}

fn merge_severity_multipliers<'de, D>(deserializer: D) -> Result<HashMap<Severity, f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let mut merged = ResolutionPolicy::default().severity_multipliers;
    merged.extend(HashMap::<Severity, f64>::deserialize(deserializer)?);
    Ok(merged)
}

impl Default for ResolutionPolicy {
    fn default() -> Self {
        use IncidentType as T;

        let base_minutes = HashMap::from([
            (T::BuildFailure, 15),
            (T::RuntimeError, 30),
            (T::DependencyConflict, 20),
            (T::SecurityVulnerability, 60),
            (T::PerformanceDegradation, 45),
            (T::DataLossRisk, 90),
            (T::RouterFailure, 10),
            (T::ApiFailure, 25),
            (T::DeploymentFailure, 30),
            (T::TestFailureCascade, 20),
            (T::MemoryLeak, 60),
            (T::InfiniteLoop, 20),
        ]);

        let severity_multipliers = HashMap::from([
            (Severity::Low, 0.5),
            (Severity::Medium, 1.0),
            (Severity::High, 1.5),
            (Severity::Critical, 2.0),
            (Severity::Catastrophic, 3.0),
        ]);

        Self {
            base_minutes,
            severity_multipliers,
        }
    }
}

impl ResolutionPolicy {
    pub fn base_minutes_for(&self, incident_type: IncidentType) -> u32 {
        self.base_minutes
            .get(&incident_type)
            .copied()
            .unwrap_or(FALLBACK_BASE_MINUTES)
    }

    pub fn multiplier_for(&self, severity: Severity) -> f64 {
        self.severity_multipliers
            .get(&severity)
            .copied()
            .filter(|m| m.is_finite() && *m >= 0.0)
            .unwrap_or(1.0)
    }

    /// Estimated minutes to resolve an incident
    pub fn estimate_minutes(&self, incident_type: IncidentType, severity: Severity) -> u32 {
        let raw = self.base_minutes_for(incident_type) as f64 * self.multiplier_for(severity);
        raw.ceil() as u32
    }
}
