//! Routing diagnostics: locate the routing configuration and check its shape

use std::path::PathBuf;
use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;

use super::{DiagnosticError, DiagnosticRoutine, DiagnosticsConfig};
use crate::artifacts::{FileReader, ReadError};
use crate::incident::{IncidentContext, ResponseAction};

const ACTOR: &str = "routing-diagnostics";

/// `path: "/x"`, `path="/x"`, `path = '/x'` in route tables and JSX
static ROUTE_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\bpath\s*[:=]\s*\{?\s*["'`]([^"'`]*)["'`]"#)
        .expect("route path regex should compile")
});

/// Location mentioned by router errors, e.g. `No routes matched location "/admin"`
static ERROR_LOCATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)location\s+["']?(/[^\s"']*)"#).expect("location regex should compile")
});

pub struct RoutingDiagnostics {
    config: Arc<DiagnosticsConfig>,
    reader: Arc<dyn FileReader>,
}

impl RoutingDiagnostics {
    pub fn new(config: Arc<DiagnosticsConfig>, reader: Arc<dyn FileReader>) -> Self {
        Self { config, reader }
    }
}

#[async_trait]
impl DiagnosticRoutine for RoutingDiagnostics {
    fn name(&self) -> &'static str {
        ACTOR
    }

    async fn run(
        &self,
        incident: &IncidentContext,
    ) -> Result<Vec<ResponseAction>, DiagnosticError> {
        let mut findings = Vec::new();
        let mut found: Vec<(PathBuf, String)> = Vec::new();

        for candidate in &self.config.routing_files {
            match self.reader.read(candidate).await {
                Ok(contents) => found.push((candidate.clone(), contents)),
                Err(ReadError::NotFound { .. }) => {}
                Err(e) => findings.push(ResponseAction::failure(
                    ACTOR,
                    "routing-config-read",
                    e.to_string(),
                )),
            }
        }

        if found.is_empty() {
            let checked: Vec<String> = self
                .config
                .routing_files
                .iter()
                .map(|p| p.display().to_string())
                .collect();
            findings.push(
                ResponseAction::failure(
                    ACTOR,
                    "routing-config-inspection",
                    format!("No routing configuration found (checked: {})", checked.join(", ")),
                )
                .with_next_actions([
                    "Create a routing configuration with a root route",
                    "Add a catch-all route for unknown locations",
                ]),
            );
            return Ok(findings);
        }

        let declared: Vec<String> = found
            .iter()
            .flat_map(|(_, contents)| declared_routes(contents))
            .collect();
        let files: Vec<String> = found.iter().map(|(p, _)| p.display().to_string()).collect();

        if declared.is_empty() {
            findings.push(
                ResponseAction::partial(
                    ACTOR,
                    "routing-config-inspection",
                    format!("{} present but declares no routes", files.join(", ")),
                )
                .with_next_actions(["Declare at least one route in the routing configuration"]),
            );
            return Ok(findings);
        }

        findings.push(ResponseAction::success(
            ACTOR,
            "routing-config-inspection",
            format!("{} routes declared in {}", declared.len(), files.join(", ")),
        ));

        if let Some(location) = error_location(&incident.error_message) {
            if declared.iter().any(|route| route == &location) {
                findings.push(ResponseAction::success(
                    ACTOR,
                    "route-lookup",
                    format!("Route {location} is declared; check guards and lazy imports"),
                ));
            } else {
                let has_catch_all = declared.iter().any(|route| route == "*" || route == "/*");
                let mut next = vec![format!("Add a route for {location}")];
                if !has_catch_all {
                    next.push("Add a catch-all route for unknown locations".to_string());
                }
                findings.push(
                    ResponseAction::partial(
                        ACTOR,
                        "route-lookup",
                        format!("No declared route matches {location}"),
                    )
                    .with_next_actions(next),
                );
            }
        }

        Ok(findings)
    }
}

/// Route paths declared in a routing file
pub fn declared_routes(contents: &str) -> Vec<String> {
    ROUTE_PATH
        .captures_iter(contents)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Location named in a router error message, if any
pub fn error_location(message: &str) -> Option<String> {
    ERROR_LOCATION
        .captures(message)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}
