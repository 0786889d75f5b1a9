//! Incident classification
//!
//! Maps a raw failure message to a complete [`IncidentContext`] by walking an
//! ordered rule table. The first rule whose predicate matches wins, so the
//! table order *is* the classification priority: security and data-loss
//! rules sit above router and build rules, which sit above the generic
//! categories.

use std::sync::LazyLock;

use chrono::Utc;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::systems::detect_affected_systems;
use crate::incident::{ImpactLevel, IncidentContext, IncidentType, PartialIncidentContext, Severity};

static CVE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bcve-\d{4}-\d{4,}\b").expect("CVE_PATTERN regex should compile")
});

static HTTP_5XX_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:status|http|code)\D{0,3}5\d{2}\b")
        .expect("HTTP_5XX_PATTERN regex should compile")
});

/// Classification outcome of a single rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub incident_type: IncidentType,
    pub severity: Severity,
    pub user_impact: ImpactLevel,
    pub business_impact: ImpactLevel,
}

impl Classification {
    pub const fn new(
        incident_type: IncidentType,
        severity: Severity,
        user_impact: ImpactLevel,
        business_impact: ImpactLevel,
    ) -> Self {
        Self {
            incident_type,
            severity,
            user_impact,
            business_impact,
        }
    }

    /// Used when no rule matches
    pub const FALLBACK: Classification = Classification::new(
        IncidentType::RuntimeError,
        Severity::Medium,
        ImpactLevel::Medium,
        ImpactLevel::Low,
    );
}

/// Predicate half of a classification rule
#[derive(Debug, Clone)]
pub enum RulePredicate {
    /// Any of the keywords appears in the lowercased message
    AnyKeyword(&'static [&'static str]),
    /// Keyword match or regex match
    KeywordsOrPattern(&'static [&'static str], &'static LazyLock<Regex>),
}

impl RulePredicate {
    /// `lowered` must already be lowercase
    fn matches(&self, lowered: &str) -> bool {
        match self {
            Self::AnyKeyword(keywords) => keywords.iter().any(|k| lowered.contains(k)),
            Self::KeywordsOrPattern(keywords, pattern) => {
                keywords.iter().any(|k| lowered.contains(k)) || pattern.is_match(lowered)
            }
        }
    }
}

/// One `(predicate, classification)` pair of the rule table
#[derive(Debug, Clone)]
pub struct ClassificationRule {
    /// Short identifier, useful in logs and tests
    pub name: &'static str,
    pub predicate: RulePredicate,
    pub classification: Classification,
}

impl ClassificationRule {
    fn new(
        name: &'static str,
        predicate: RulePredicate,
        classification: Classification,
    ) -> Self {
        Self {
            name,
            predicate,
            classification,
        }
    }
}

/// The default ordered rule table
pub fn default_rules() -> Vec<ClassificationRule> {
    use ImpactLevel as I;
    use IncidentType as T;
    use Severity as S;

    vec![
        ClassificationRule::new(
            "security",
            RulePredicate::KeywordsOrPattern(
                &["security", "vulnerab", "xss", "injection", "exposed secret"],
                &CVE_PATTERN,
            ),
            Classification::new(T::SecurityVulnerability, S::Critical, I::High, I::Critical),
        ),
        ClassificationRule::new(
            "data_loss",
            RulePredicate::AnyKeyword(&["data loss", "corrupt", "dropped table", "data integrity"]),
            Classification::new(T::DataLossRisk, S::Critical, I::Critical, I::Critical),
        ),
        ClassificationRule::new(
            "router",
            RulePredicate::AnyKeyword(&["no routes matched", "route not found", "router", "routing"]),
            Classification::new(T::RouterFailure, S::Critical, I::Critical, I::High),
        ),
        ClassificationRule::new(
            "build",
            RulePredicate::AnyKeyword(&[
                "build failed",
                "compilation error",
                "failed to compile",
                "build error",
                "module not found",
            ]),
            Classification::new(T::BuildFailure, S::High, I::Medium, I::Medium),
        ),
        ClassificationRule::new(
            "deployment",
            RulePredicate::AnyKeyword(&["deploy"]),
            Classification::new(T::DeploymentFailure, S::High, I::High, I::High),
        ),
        ClassificationRule::new(
            "dependency",
            RulePredicate::AnyKeyword(&[
                "dependency conflict",
                "peer dep",
                "eresolve",
                "version conflict",
                "could not resolve dependency",
            ]),
            Classification::new(T::DependencyConflict, S::Medium, I::Low, I::Low),
        ),
        ClassificationRule::new(
            "memory_leak",
            RulePredicate::AnyKeyword(&["memory leak", "out of memory", "heap limit"]),
            Classification::new(T::MemoryLeak, S::High, I::High, I::Medium),
        ),
        ClassificationRule::new(
            "infinite_loop",
            RulePredicate::AnyKeyword(&[
                "infinite loop",
                "maximum call stack",
                "too much recursion",
                "maximum update depth",
            ]),
            Classification::new(T::InfiniteLoop, S::High, I::High, I::Medium),
        ),
        ClassificationRule::new(
            "api",
            RulePredicate::KeywordsOrPattern(
                &["api error", "api request failed", "fetch failed", "econnrefused"],
                &HTTP_5XX_PATTERN,
            ),
            Classification::new(T::ApiFailure, S::High, I::High, I::High),
        ),
        ClassificationRule::new(
            "performance",
            RulePredicate::AnyKeyword(&["slow", "performance", "latency", "timed out"]),
            Classification::new(T::PerformanceDegradation, S::Medium, I::Medium, I::Medium),
        ),
        ClassificationRule::new(
            "test_cascade",
            RulePredicate::AnyKeyword(&["tests failed", "test failed", "failing tests", "test suite"]),
            Classification::new(T::TestFailureCascade, S::Medium, I::Low, I::Medium),
        ),
    ]
}

/// Rule-table incident classifier
///
/// Pure and deterministic: the same message and partial context always
/// produce the same classification (only `detected_at` defaults to now).
pub struct IncidentClassifier {
    rules: Vec<ClassificationRule>,
}

impl IncidentClassifier {
    /// Create a classifier with the default rule table
    pub fn new() -> Self {
        Self {
            rules: default_rules(),
        }
    }

    /// Create a classifier with a custom rule table
    pub fn with_rules(rules: Vec<ClassificationRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[ClassificationRule] {
        &self.rules
    }

    /// The first rule matching `message`, if any
    pub fn matched_rule(&self, message: &str) -> Option<&ClassificationRule> {
        let lowered = message.to_lowercase();
        self.rules.iter().find(|r| r.predicate.matches(&lowered))
    }

    /// Classification for `message` alone, falling back to runtime_error
    pub fn classification_for(&self, message: &str) -> Classification {
        self.matched_rule(message)
            .map(|r| r.classification)
            .unwrap_or(Classification::FALLBACK)
    }

    /// Build a complete incident context
    ///
    /// Any field present in `partial` overrides the classified value.
    pub fn classify(
        &self,
        message: &str,
        partial: Option<&PartialIncidentContext>,
    ) -> IncidentContext {
        let rule = self.matched_rule(message);
        let base = rule
            .map(|r| r.classification)
            .unwrap_or(Classification::FALLBACK);

        tracing::debug!(
            rule = rule.map(|r| r.name).unwrap_or("fallback"),
            incident_type = %base.incident_type,
            severity = %base.severity,
            "Classified incident"
        );

        let default_partial = PartialIncidentContext::default();
        let partial = partial.unwrap_or(&default_partial);

        IncidentContext {
            incident_type: partial.incident_type.unwrap_or(base.incident_type),
            severity: partial.severity.unwrap_or(base.severity),
            error_message: message.to_string(),
            affected_systems: partial
                .affected_systems
                .clone()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| detect_affected_systems(message)),
            detected_at: partial.detected_at.unwrap_or_else(Utc::now),
            user_impact: partial.user_impact.unwrap_or(base.user_impact),
            business_impact: partial.business_impact.unwrap_or(base.business_impact),
            stack_trace: partial.stack_trace.clone(),
            affected_files: partial.affected_files.clone(),
        }
    }
}

impl Default for IncidentClassifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_security_messages_are_critical_and_deterministic() {
        let classifier = IncidentClassifier::new();
        let messages = [
            "Security vulnerability detected in dependencies",
            "SECURITY: token leaked",
            "Possible XSS in comment renderer",
            "npm audit reports CVE-2024-12345",
        ];
        for msg in messages {
            for _ in 0..3 {
                let incident = classifier.classify(msg, None);
                assert_eq!(incident.incident_type, IncidentType::SecurityVulnerability, "{msg}");
                assert_eq!(incident.severity, Severity::Critical);
            }
        }
    }

    #[test]
    fn test_build_failure_classification() {
        let classifier = IncidentClassifier::new();
        let incident = classifier.classify("Build failed with compilation errors", None);
        assert_eq!(incident.incident_type, IncidentType::BuildFailure);
        assert_eq!(incident.severity, Severity::High);
        assert!(incident.affected_systems.contains("build"));
    }

    #[test]
    fn test_router_failure_classification() {
        let classifier = IncidentClassifier::new();
        let incident = classifier.classify("No routes matched location /test", None);
        assert_eq!(incident.incident_type, IncidentType::RouterFailure);
        assert_eq!(incident.severity, Severity::Critical);
        assert_eq!(incident.user_impact, ImpactLevel::Critical);
        assert_eq!(incident.business_impact, ImpactLevel::High);
        assert!(incident.affected_systems.contains("routing"));
    }

    #[test]
    fn test_security_outranks_dependency_rule() {
        // Mentions dependencies, but the security rule is earlier in the table
        let classifier = IncidentClassifier::new();
        let rule = classifier
            .matched_rule("Security vulnerability in peer dependency")
            .unwrap();
        assert_eq!(rule.name, "security");
    }

    #[test]
    fn test_fallback_classification() {
        let classifier = IncidentClassifier::new();
        let incident = classifier.classify("Something odd happened", None);
        assert_eq!(incident.incident_type, IncidentType::RuntimeError);
        assert_eq!(incident.severity, Severity::Medium);
        assert_eq!(incident.user_impact, ImpactLevel::Medium);
        assert_eq!(incident.business_impact, ImpactLevel::Low);
        assert_eq!(
            incident.affected_systems.iter().collect::<Vec<_>>(),
            vec!["unknown"]
        );
        assert!(classifier.matched_rule("Something odd happened").is_none());
    }

    #[test]
    fn test_http_5xx_pattern_classifies_api_failure() {
        let classifier = IncidentClassifier::new();
        let incident = classifier.classify("Request to /orders returned status 503", None);
        assert_eq!(incident.incident_type, IncidentType::ApiFailure);
    }

    #[test]
    fn test_matching_is_case_insensitive() {
        let classifier = IncidentClassifier::new();
        let lower = classifier.classification_for("maximum call stack size exceeded");
        let upper = classifier.classification_for("MAXIMUM CALL STACK SIZE EXCEEDED");
        assert_eq!(lower, upper);
        assert_eq!(lower.incident_type, IncidentType::InfiniteLoop);
    }

    #[test]
    fn test_partial_context_overrides() {
        let classifier = IncidentClassifier::new();
        let partial = PartialIncidentContext::new()
            .with_business_impact(ImpactLevel::Critical)
            .with_affected_files(vec!["src/router.tsx".into()]);
        let incident = classifier.classify("No routes matched location /test", Some(&partial));
        assert_eq!(incident.incident_type, IncidentType::RouterFailure);
        assert_eq!(incident.business_impact, ImpactLevel::Critical);
        assert_eq!(incident.affected_files.as_deref(), Some(&["src/router.tsx".to_string()][..]));
    }

    #[test]
    fn test_empty_partial_systems_do_not_override() {
        let classifier = IncidentClassifier::new();
        let partial = PartialIncidentContext {
            affected_systems: Some(Default::default()),
            ..Default::default()
        };
        let incident = classifier.classify("database query failed", Some(&partial));
        assert!(incident.affected_systems.contains("database"));
    }

    #[test]
    fn test_custom_rule_table() {
        let classifier = IncidentClassifier::with_rules(vec![ClassificationRule::new(
            "custom",
            RulePredicate::AnyKeyword(&["kaboom"]),
            Classification::new(
                IncidentType::DeploymentFailure,
                Severity::Catastrophic,
                ImpactLevel::Critical,
                ImpactLevel::Critical,
            ),
        )]);
        let incident = classifier.classify("Kaboom in prod", None);
        assert_eq!(incident.severity, Severity::Catastrophic);
        // Default rules are gone
        let other = classifier.classify("Build failed", None);
        assert_eq!(other.incident_type, IncidentType::RuntimeError);
    }
}
