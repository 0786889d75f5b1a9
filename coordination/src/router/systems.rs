//! Affected-system detection
//!
//! Independent of the type rules: every system whose keywords appear in the
//! message is reported. Keywords match at word starts, so `ui` matches
//! "UI glitch" but not "build".

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

/// Reported when no system keyword matches
pub const UNKNOWN_SYSTEM: &str = "unknown";

/// `(system, keywords)` table scanned by [`detect_affected_systems`]
pub const SYSTEM_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "frontend",
        &["component", "ui", "css", "render", "react", "browser", "page"],
    ),
    (
        "backend",
        &["server", "api", "endpoint", "service", "handler"],
    ),
    (
        "database",
        &["database", "sql", "query", "migration", "table", "db"],
    ),
    (
        "build",
        &["build", "compile", "compilation", "webpack", "bundle", "cargo", "tsc"],
    ),
    (
        "routing",
        &["route", "router", "navigation", "url", "location"],
    ),
    ("testing", &["test", "spec", "assert", "jest", "vitest"]),
];

static SYSTEM_PATTERNS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    SYSTEM_KEYWORDS
        .iter()
        .map(|(system, keywords)| {
            let alternation = keywords
                .iter()
                .map(|k| regex::escape(k))
                .collect::<Vec<_>>()
                .join("|");
            let pattern = Regex::new(&format!(r"(?i)\b(?:{alternation})"))
                .expect("system keyword regex should compile");
            (*system, pattern)
        })
        .collect()
});

/// Every system mentioned in `message`, or `{"unknown"}`
pub fn detect_affected_systems(message: &str) -> BTreeSet<String> {
    let systems: BTreeSet<String> = SYSTEM_PATTERNS
        .iter()
        .filter(|(_, pattern)| pattern.is_match(message))
        .map(|(system, _)| system.to_string())
        .collect();

    if systems.is_empty() {
        BTreeSet::from([UNKNOWN_SYSTEM.to_string()])
    } else {
        systems
    }
}
