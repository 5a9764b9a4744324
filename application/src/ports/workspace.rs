//! Workspace port
//!
//! File access scoped to the project workspace. Paths are workspace-relative
//! strings, exactly as the model writes them in tool calls.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkspaceError {
    #[error("Path escapes the workspace: {0}")]
    OutsideWorkspace(String),

    #[error("Not writable: {path}: {reason}")]
    NotWritable { path: String, reason: String },

    #[error("I/O error on {path}: {reason}")]
    Io { path: String, reason: String },
}

impl WorkspaceError {
    pub fn io(path: &str, err: impl std::fmt::Display) -> Self {
        WorkspaceError::Io {
            path: path.to_string(),
            reason: err.to_string(),
        }
    }
}

#[async_trait]
pub trait WorkspacePort: Send + Sync {
    /// File contents, or `None` if the file does not exist.
    async fn read(&self, path: &str) -> Result<Option<Vec<u8>>, WorkspaceError>;

    /// Create or overwrite a file, creating parent directories.
    async fn write(&self, path: &str, contents: &[u8]) -> Result<(), WorkspaceError>;

    /// Delete a file; deleting a missing file is not an error.
    async fn remove(&self, path: &str) -> Result<(), WorkspaceError>;

    async fn exists(&self, path: &str) -> bool;

    /// Check that `path` could be written (or deleted) without writing it.
    async fn check_writable(&self, path: &str) -> Result<(), WorkspaceError>;

    /// Read a file as UTF-8 text (lossy).
    async fn read_text(&self, path: &str) -> Result<Option<String>, WorkspaceError> {
        Ok(self
            .read(path)
            .await?
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned()))
    }
}
