//! Process runner — the boundary to build, dependency and test tooling
//!
//! Commands are given as a single shell-like string (`"npm ls --all"`),
//! split with `shlex` and executed directly (no shell). Each run carries its
//! own timeout; on timeout the child and its process group are killed.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Default per-command timeout
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 300;

/// Captured result of a finished command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the process was terminated by a signal
    pub exit_code: Option<i32>,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Last `max_bytes` of stderr (falling back to stdout), on a char boundary
    pub fn excerpt(&self, max_bytes: usize) -> String {
        let source = if self.stderr.trim().is_empty() {
            &self.stdout
        } else {
            &self.stderr
        };
        tail_excerpt(source.trim(), max_bytes)
    }
}

/// Errors from running an external command
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProcessError {
    #[error("Empty command")]
    EmptyCommand,

    #[error("Unparseable command line: {0}")]
    Parse(String),

    #[error("Failed to execute `{command}`: {message}")]
    Spawn { command: String, message: String },

    #[error("`{command}` timed out after {secs}s")]
    Timeout { command: String, secs: u64 },
}

/// Runs external commands on behalf of diagnostics, validation and fixes
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    async fn run(&self, command: &str) -> Result<ProcessOutput, ProcessError>;
}

/// `tokio::process` backed runner rooted at a project directory
pub struct TokioProcessRunner {
    working_dir: PathBuf,
    timeout: Duration,
}

impl TokioProcessRunner {
    pub fn new(working_dir: impl AsRef<Path>) -> Self {
        Self {
            working_dir: working_dir.as_ref().to_path_buf(),
            timeout: Duration::from_secs(DEFAULT_COMMAND_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }
}

#[async_trait]
impl ProcessRunner for TokioProcessRunner {
    async fn run(&self, command: &str) -> Result<ProcessOutput, ProcessError> {
        let argv = split_command(command)?;
        let (program, args) = argv.split_first().ok_or(ProcessError::EmptyCommand)?;

        let mut cmd = tokio::process::Command::new(program);
        cmd.args(args)
            .current_dir(&self.working_dir)
            .kill_on_drop(true);

        // Own process group so the whole tree dies with the child on timeout
        #[cfg(unix)]
        cmd.process_group(0);

        tracing::debug!(command, dir = %self.working_dir.display(), "Running command");

        match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(Ok(output)) => Ok(ProcessOutput {
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                exit_code: output.status.code(),
            }),
            Ok(Err(e)) => Err(ProcessError::Spawn {
                command: command.to_string(),
                message: e.to_string(),
            }),
            Err(_) => Err(ProcessError::Timeout {
                command: command.to_string(),
                secs: self.timeout.as_secs(),
            }),
        }
    }
}

/// Split a command line into argv using POSIX shell quoting rules
pub fn split_command(command: &str) -> Result<Vec<String>, ProcessError> {
    if command.trim().is_empty() {
        return Err(ProcessError::EmptyCommand);
    }
    shlex::split(command).ok_or_else(|| ProcessError::Parse(command.to_string()))
}

fn tail_excerpt(text: &str, max_bytes: usize) -> String {
    if text.len() <= max_bytes {
        return text.to_string();
    }
    let mut start = text.len() - max_bytes;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    format!("…{}", &text[start..])
}
