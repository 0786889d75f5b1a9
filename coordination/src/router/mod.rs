//! Incident Router Module
//!
//! Routes raw failure messages to incident classifications:
//! - Ordered rule table for type, severity and impact
//! - Independent keyword scan for affected systems
//!
//! # Rule Priority
//!
//! ```text
//! Rule            | Type                     | Severity
//! ----------------|--------------------------|----------
//! security        | security_vulnerability   | critical
//! data_loss       | data_loss_risk           | critical
//! router          | router_failure           | critical
//! build           | build_failure            | high
//! deployment      | deployment_failure       | high
//! dependency      | dependency_conflict      | medium
//! memory_leak     | memory_leak              | high
//! infinite_loop   | infinite_loop            | high
//! api             | api_failure              | high
//! performance     | performance_degradation  | medium
//! test_cascade    | test_failure_cascade     | medium
//! (no match)      | runtime_error            | medium
//! ```

pub mod classifier;
pub mod systems;

pub use classifier::{
    default_rules, Classification, ClassificationRule, IncidentClassifier, RulePredicate,
};
pub use systems::{detect_affected_systems, SYSTEM_KEYWORDS, UNKNOWN_SYSTEM};
