use anyhow::{Context, Result};
use coordination::diagnostics::DiagnosticsConfig;
use coordination::escalation::ResolutionPolicy;
use coordination::incident::IncidentType;
use coordination::persistence::DEFAULT_RESOURCE;
use coordination::process::DEFAULT_COMMAND_TIMEOUT_SECS;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level responder configuration.
///
/// Loaded from an optional TOML file, then overridden by `RESPONDER_*`
/// environment variables. Every field has a default, so an empty file (or
/// no file) is a valid configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ResponderConfig {
    /// Working directory for diagnostics, validation and fix commands
    pub project_root: PathBuf,
    /// Directory holding the JSONL incident log
    pub log_dir: PathBuf,
    /// Log resource name (file stem under `log_dir`)
    pub log_resource: String,
    /// Per-command timeout for external tooling
    pub command_timeout_secs: u64,
    pub diagnostics: DiagnosticsConfig,
    pub resolution: ResolutionPolicy,
    /// Capability id → command template
    pub capabilities: BTreeMap<String, String>,
    /// Incident type → remediation commands run during the fixing phase
    pub fix_commands: HashMap<IncidentType, Vec<String>>,
}

impl Default for ResponderConfig {
    fn default() -> Self {
        Self {
            project_root: PathBuf::from("."),
            log_dir: PathBuf::from(".incident-responder"),
            log_resource: DEFAULT_RESOURCE.to_string(),
            command_timeout_secs: DEFAULT_COMMAND_TIMEOUT_SECS,
            diagnostics: DiagnosticsConfig::default(),
            resolution: ResolutionPolicy::default(),
            capabilities: BTreeMap::new(),
            fix_commands: HashMap::new(),
        }
    }
}

impl ResponderConfig {
    /// Load from `path` (if given) and apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file {}", path.display()))?;
                Self::from_toml_str(&raw)
                    .with_context(|| format!("Invalid config file {}", path.display()))?
            }
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str(raw).context("Failed to parse responder configuration")
    }

    /// Apply `RESPONDER_*` overrides from a key lookup (the process
    /// environment in production).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(root) = lookup("RESPONDER_PROJECT_ROOT") {
            self.project_root = PathBuf::from(root);
        }
        if let Some(dir) = lookup("RESPONDER_LOG_DIR") {
            self.log_dir = PathBuf::from(dir);
        }
        if let Some(secs) = lookup("RESPONDER_COMMAND_TIMEOUT_SECS") {
            self.command_timeout_secs = secs
                .trim()
                .parse()
                .with_context(|| format!("RESPONDER_COMMAND_TIMEOUT_SECS must be an integer, got {secs:?}"))?;
        }
        if let Some(command) = lookup("RESPONDER_BUILD_COMMAND") {
            self.diagnostics.build_command = command;
        }
        Ok(())
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    /// Log directory, resolved against the project root when relative
    pub fn resolved_log_dir(&self) -> PathBuf {
        if self.log_dir.is_absolute() {
            self.log_dir.clone()
        } else {
            self.project_root.join(&self.log_dir)
        }
    }

    /// Full path of the JSONL incident log
    pub fn log_path(&self) -> PathBuf {
        self.resolved_log_dir()
            .join(format!("{}.jsonl", self.log_resource))
    }
}
