//! File tools: read_file, write_file, edit_file, delete_file, list_directory
//!
//! Every path goes through [`LocalWorkspace`], so a tool can never touch a
//! file outside the workspace root.

use crate::workspace::LocalWorkspace;
use async_trait::async_trait;
use ratchet_application::{ToolExecutor, WorkspaceError, WorkspacePort};
use ratchet_domain::{ToolError, ToolInvocation, ToolOutcome};
use std::path::Path;
use std::sync::Arc;

/// Maximum file size to read (10 MB)
const MAX_READ_SIZE: usize = 10 * 1024 * 1024;

/// Maximum entries listed by list_directory
const MAX_LIST_ENTRIES: usize = 500;

/// Directories list_directory does not descend into
const SKIPPED_DIRS: [&str; 5] = [".git", "target", "node_modules", "__pycache__", ".venv"];

pub(crate) fn workspace_error(err: WorkspaceError) -> ToolError {
    match err {
        WorkspaceError::OutsideWorkspace(path) => ToolError::permission_denied(path),
        WorkspaceError::NotWritable { path, reason } => {
            ToolError::permission_denied(format!("{} ({})", path, reason))
        }
        WorkspaceError::Io { path, reason } => {
            ToolError::execution_failed(format!("{}: {}", path, reason))
        }
    }
}

fn require<'a>(invocation: &'a ToolInvocation, key: &str) -> Result<&'a str, ToolOutcome> {
    invocation
        .require_string(key)
        .map_err(|e| ToolOutcome::failure(ToolError::invalid_argument(e)))
}

fn path_of(invocation: &ToolInvocation) -> Result<&str, ToolOutcome> {
    invocation
        .target_path()
        .ok_or_else(|| ToolOutcome::failure(ToolError::invalid_argument("Missing required argument: path")))
}

// ==================== read_file ====================

pub struct ReadFileTool {
    workspace: Arc<LocalWorkspace>,
}

impl ReadFileTool {
    pub fn new(workspace: Arc<LocalWorkspace>) -> Self {
        Self { workspace }
    }

    async fn read(&self, invocation: &ToolInvocation) -> Result<String, ToolOutcome> {
        let path = path_of(invocation)?;
        let bytes = self
            .workspace
            .read(path)
            .await
            .map_err(|e| ToolOutcome::failure(workspace_error(e)))?
            .ok_or_else(|| ToolOutcome::failure(ToolError::not_found(path)))?;

        if bytes.len() > MAX_READ_SIZE {
            return Err(ToolOutcome::failure(ToolError::invalid_argument(format!(
                "File too large ({} bytes). Maximum size is {} bytes",
                bytes.len(),
                MAX_READ_SIZE
            ))));
        }
        let content = String::from_utf8_lossy(&bytes).into_owned();

        let offset = invocation.get_i64("offset").unwrap_or(0).max(0) as usize;
        let limit = invocation.get_i64("limit").map(|l| l.max(0) as usize);
        if offset == 0 && limit.is_none() {
            return Ok(content);
        }
        let lines: Vec<&str> = content.lines().collect();
        if offset >= lines.len() {
            return Ok(String::new());
        }
        let end = limit.map_or(lines.len(), |l| (offset + l).min(lines.len()));
        Ok(lines[offset..end].join("\n"))
    }
}

#[async_trait]
impl ToolExecutor for ReadFileTool {
    async fn execute(&self, invocation: &ToolInvocation) -> ToolOutcome {
        match self.read(invocation).await {
            Ok(content) => ToolOutcome::success(content),
            Err(outcome) => outcome,
        }
    }
}

// ==================== write_file ====================

pub struct WriteFileTool {
    workspace: Arc<LocalWorkspace>,
}

impl WriteFileTool {
    pub fn new(workspace: Arc<LocalWorkspace>) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl ToolExecutor for WriteFileTool {
    async fn execute(&self, invocation: &ToolInvocation) -> ToolOutcome {
        let (path, content) = match (path_of(invocation), require(invocation, "content")) {
            (Ok(p), Ok(c)) => (p, c),
            (Err(outcome), _) | (_, Err(outcome)) => return outcome,
        };
        match self.workspace.write(path, content.as_bytes()).await {
            Ok(()) => ToolOutcome::success(format!(
                "Successfully wrote {} bytes to {}",
                content.len(),
                path
            )),
            Err(e) => ToolOutcome::failure(workspace_error(e)),
        }
    }
}

// ==================== edit_file ====================

/// Replace `old_text` with `new_text`. The old text must occur exactly once
/// unless `replace_all` is set.
pub struct EditFileTool {
    workspace: Arc<LocalWorkspace>,
}

impl EditFileTool {
    pub fn new(workspace: Arc<LocalWorkspace>) -> Self {
        Self { workspace }
    }

    async fn edit(&self, invocation: &ToolInvocation) -> Result<String, ToolOutcome> {
        let path = path_of(invocation)?;
        let old_text = require(invocation, "old_text")?;
        let new_text = require(invocation, "new_text")?;
        let replace_all = invocation.get_bool("replace_all").unwrap_or(false);

        if old_text.is_empty() {
            return Err(ToolOutcome::failure(ToolError::invalid_argument(
                "old_text cannot be empty",
            )));
        }
        let content = self
            .workspace
            .read_text(path)
            .await
            .map_err(|e| ToolOutcome::failure(workspace_error(e)))?
            .ok_or_else(|| ToolOutcome::failure(ToolError::not_found(path)))?;

        let occurrences = content.matches(old_text).count();
        let updated = match occurrences {
            0 => {
                return Err(ToolOutcome::failure(ToolError::invalid_argument(format!(
                    "old_text not found in {}",
                    path
                ))));
            }
            1 => content.replacen(old_text, new_text, 1),
            _ if replace_all => content.replace(old_text, new_text),
            n => {
                return Err(ToolOutcome::failure(ToolError::invalid_argument(format!(
                    "old_text occurs {} times in {}; add context or set replace_all",
                    n, path
                ))));
            }
        };

        self.workspace
            .write(path, updated.as_bytes())
            .await
            .map_err(|e| ToolOutcome::failure(workspace_error(e)))?;
        Ok(format!("Replaced {} occurrence(s) in {}", occurrences, path))
    }
}

#[async_trait]
impl ToolExecutor for EditFileTool {
    async fn execute(&self, invocation: &ToolInvocation) -> ToolOutcome {
        match self.edit(invocation).await {
            Ok(message) => ToolOutcome::success(message),
            Err(outcome) => outcome,
        }
    }
}

// ==================== delete_file ====================

pub struct DeleteFileTool {
    workspace: Arc<LocalWorkspace>,
}

impl DeleteFileTool {
    pub fn new(workspace: Arc<LocalWorkspace>) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl ToolExecutor for DeleteFileTool {
    async fn execute(&self, invocation: &ToolInvocation) -> ToolOutcome {
        let path = match path_of(invocation) {
            Ok(p) => p,
            Err(outcome) => return outcome,
        };
        if !self.workspace.exists(path).await {
            return ToolOutcome::failure(ToolError::not_found(path));
        }
        match self.workspace.remove(path).await {
            Ok(()) => ToolOutcome::success(format!("Deleted {}", path)),
            Err(e) => ToolOutcome::failure(workspace_error(e)),
        }
    }
}

// ==================== list_directory ====================

pub struct ListDirectoryTool {
    workspace: Arc<LocalWorkspace>,
}

impl ListDirectoryTool {
    pub fn new(workspace: Arc<LocalWorkspace>) -> Self {
        Self { workspace }
    }

    async fn list(&self, invocation: &ToolInvocation) -> Result<String, ToolOutcome> {
        let rel = invocation.target_path().unwrap_or(".");
        let recursive = invocation.get_bool("recursive").unwrap_or(false);
        let dir = self
            .workspace
            .resolve(rel)
            .map_err(|e| ToolOutcome::failure(workspace_error(e)))?;
        if !dir.is_dir() {
            return Err(ToolOutcome::failure(ToolError::not_found(format!(
                "directory {}",
                rel
            ))));
        }

        let mut entries = Vec::new();
        let mut pending = vec![dir];
        let mut truncated = false;
        while let Some(current) = pending.pop() {
            let mut reader = tokio::fs::read_dir(&current).await.map_err(|e| {
                ToolOutcome::failure(ToolError::execution_failed(format!("{}: {}", rel, e)))
            })?;
            while let Ok(Some(entry)) = reader.next_entry().await {
                if entries.len() >= MAX_LIST_ENTRIES {
                    truncated = true;
                    break;
                }
                let path = entry.path();
                let is_dir = entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false);
                let display = self.workspace.relative(&path);
                if is_dir {
                    entries.push(format!("{}/", display));
                    if recursive && !is_skipped(&path) {
                        pending.push(path);
                    }
                } else {
                    entries.push(display);
                }
            }
        }

        entries.sort();
        let mut output = entries.join("\n");
        if truncated {
            output.push_str(&format!("\n... (limited to {} entries)", MAX_LIST_ENTRIES));
        }
        if entries.is_empty() {
            output = format!("{} is empty", rel);
        }
        Ok(output)
    }
}

fn is_skipped(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| SKIPPED_DIRS.contains(&n))
}

#[async_trait]
impl ToolExecutor for ListDirectoryTool {
    async fn execute(&self, invocation: &ToolInvocation) -> ToolOutcome {
        match self.list(invocation).await {
            Ok(listing) => ToolOutcome::success(listing),
            Err(outcome) => outcome,
        }
    }
}
