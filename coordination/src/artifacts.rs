//! File reader — read-only access to configuration artifacts
//!
//! Diagnostics inspect manifests and routing files through this trait so
//! tests can serve fixtures from memory.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

/// Errors from reading an artifact
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReadError {
    #[error("Artifact not found: {path}")]
    NotFound { path: PathBuf },

    #[error("Failed to read {path}: {message}")]
    Io { path: PathBuf, message: String },
}

impl ReadError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

#[async_trait]
pub trait FileReader: Send + Sync {
    async fn read(&self, path: &Path) -> Result<String, ReadError>;
}

/// Reads from the filesystem; relative paths resolve against `root`
pub struct FsFileReader {
    root: PathBuf,
}

impl FsFileReader {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

#[async_trait]
impl FileReader for FsFileReader {
    async fn read(&self, path: &Path) -> Result<String, ReadError> {
        let full = self.resolve(path);
        tokio::fs::read_to_string(&full)
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => ReadError::NotFound { path: full.clone() },
                _ => ReadError::Io {
                    path: full.clone(),
                    message: e.to_string(),
                },
            })
    }
}

/// Serves a fixed set of in-memory files
#[derive(Debug, Clone, Default)]
pub struct StaticFileReader {
    files: HashMap<PathBuf, String>,
}

impl StaticFileReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>, contents: impl Into<String>) -> Self {
        self.files.insert(path.into(), contents.into());
        self
    }
}

#[async_trait]
impl FileReader for StaticFileReader {
    async fn read(&self, path: &Path) -> Result<String, ReadError> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| ReadError::NotFound {
                path: path.to_path_buf(),
            })
    }
}
