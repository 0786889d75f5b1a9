//! Incident log — append-only JSONL history of finished responses
//!
//! One [`PersistedResponse`] per line in `<dir>/<resource>.jsonl`. All
//! appends go through a single writer task, so lines from concurrent
//! pipelines never interleave. Each append waits for the writer's ack and
//! reports the I/O result back to its caller.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::incident::PersistedResponse;

/// Default log resource name
pub const DEFAULT_RESOURCE: &str = "incident-responses";

/// Pending appends buffered ahead of the writer
const WRITE_QUEUE_CAPACITY: usize = 64;

/// Errors from the incident log
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PersistenceError {
    #[error("Invalid log resource name: {0:?}")]
    InvalidResource(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Failed to write {path}: {message}")]
    Io { path: PathBuf, message: String },

    #[error("Malformed log line {line} in {path}: {message}")]
    Malformed {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("Incident log writer has shut down")]
    WriterClosed,
}

/// Durable sink for terminal response records
#[async_trait]
pub trait IncidentLog: Send + Sync {
    async fn append(&self, resource: &str, record: &PersistedResponse) -> Result<(), PersistenceError>;
}

struct AppendRequest {
    resource: String,
    line: String,
    ack: oneshot::Sender<Result<(), PersistenceError>>,
}

/// JSONL log with a single background writer
#[derive(Clone)]
pub struct JsonlIncidentLog {
    dir: PathBuf,
    sender: mpsc::Sender<AppendRequest>,
}

impl JsonlIncidentLog {
    /// Start the writer task; must be called inside a Tokio runtime
    pub fn spawn(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let (sender, receiver) = mpsc::channel(WRITE_QUEUE_CAPACITY);
        tokio::spawn(writer_loop(dir.clone(), receiver));
        Self { dir, sender }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file backing a resource
    pub fn path_for(&self, resource: &str) -> Result<PathBuf, PersistenceError> {
        resource_path(&self.dir, resource)
    }
}

#[async_trait]
impl IncidentLog for JsonlIncidentLog {
    async fn append(&self, resource: &str, record: &PersistedResponse) -> Result<(), PersistenceError> {
        validate_resource(resource)?;
        let line = serde_json::to_string(record)
            .map_err(|e| PersistenceError::Serialization(e.to_string()))?;

        let (ack, done) = oneshot::channel();
        self.sender
            .send(AppendRequest {
                resource: resource.to_string(),
                line,
                ack,
            })
            .await
            .map_err(|_| PersistenceError::WriterClosed)?;

        done.await.map_err(|_| PersistenceError::WriterClosed)?
    }
}

async fn writer_loop(dir: PathBuf, mut receiver: mpsc::Receiver<AppendRequest>) {
    while let Some(request) = receiver.recv().await {
        let result = write_line(&dir, &request.resource, &request.line).await;
        if let Err(ref e) = result {
            warn!(resource = %request.resource, error = %e, "Failed to append incident record");
        }
        // Caller may have gone away; the line is written either way.
        let _ = request.ack.send(result);
    }
    debug!(dir = %dir.display(), "Incident log writer stopped");
}

async fn write_line(dir: &Path, resource: &str, line: &str) -> Result<(), PersistenceError> {
    let path = resource_path(dir, resource)?;
    let io_err = |e: std::io::Error| PersistenceError::Io {
        path: path.clone(),
        message: e.to_string(),
    };

    tokio::fs::create_dir_all(dir).await.map_err(io_err)?;
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .await
        .map_err(io_err)?;

    let mut buf = Vec::with_capacity(line.len() + 1);
    buf.extend_from_slice(line.as_bytes());
    buf.push(b'\n');
    file.write_all(&buf).await.map_err(io_err)?;
    file.flush().await.map_err(io_err)?;

    info!(path = %path.display(), "Appended incident record");
    Ok(())
}

fn validate_resource(resource: &str) -> Result<(), PersistenceError> {
    let valid = !resource.is_empty()
        && resource
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        && !resource.starts_with('.');
    if valid {
        Ok(())
    } else {
        Err(PersistenceError::InvalidResource(resource.to_string()))
    }
}

fn resource_path(dir: &Path, resource: &str) -> Result<PathBuf, PersistenceError> {
    validate_resource(resource)?;
    Ok(dir.join(format!("{resource}.jsonl")))
}

/// Read every record from a JSONL log; a missing file is an empty log
pub async fn read_records(path: &Path) -> Result<Vec<PersistedResponse>, PersistenceError> {
    let contents = match tokio::fs::read_to_string(path).await {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(PersistenceError::Io {
                path: path.to_path_buf(),
                message: e.to_string(),
            })
        }
    };

    contents
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            serde_json::from_str(line).map_err(|e| PersistenceError::Malformed {
                path: path.to_path_buf(),
                line: idx + 1,
                message: e.to_string(),
            })
        })
        .collect()
}
