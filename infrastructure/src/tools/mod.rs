//! Tool implementations for the agent
//!
//! Local tools operating on the workspace and the machine's toolchain:
//!
//! - `file`: read_file, write_file, edit_file, delete_file, list_directory
//! - `search`: search_files
//! - `command`: run_command, run_tests
//!
//! Paths are resolved through [`LocalWorkspace`]; nothing escapes its root.

pub mod command;
pub mod file;
pub mod search;

pub use command::{RunCommandTool, RunTestsTool};
pub use file::{DeleteFileTool, EditFileTool, ListDirectoryTool, ReadFileTool, WriteFileTool};
pub use search::SearchFilesTool;

use crate::workspace::LocalWorkspace;
use ratchet_application::{TestRunner, ToolRegistry};
use ratchet_domain::ToolKind;
use std::sync::Arc;

/// Registry with every built-in tool registered.
pub fn default_registry(workspace: Arc<LocalWorkspace>, tests: Arc<dyn TestRunner>) -> ToolRegistry {
    ToolRegistry::new()
        .register(ToolKind::ReadFile, Arc::new(ReadFileTool::new(workspace.clone())))
        .register(ToolKind::WriteFile, Arc::new(WriteFileTool::new(workspace.clone())))
        .register(ToolKind::EditFile, Arc::new(EditFileTool::new(workspace.clone())))
        .register(ToolKind::DeleteFile, Arc::new(DeleteFileTool::new(workspace.clone())))
        .register(
            ToolKind::ListDirectory,
            Arc::new(ListDirectoryTool::new(workspace.clone())),
        )
        .register(
            ToolKind::SearchFiles,
            Arc::new(SearchFilesTool::new(workspace.clone())),
        )
        .register(ToolKind::RunCommand, Arc::new(RunCommandTool::new(workspace)))
        .register(ToolKind::RunTests, Arc::new(RunTestsTool::new(tests)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratchet_application::NoToolchain;
    use ratchet_domain::ToolInvocation;

    #[tokio::test]
    async fn test_default_registry_covers_builtins() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Arc::new(LocalWorkspace::new(dir.path()).unwrap());
        let registry = default_registry(ws, Arc::new(NoToolchain));

        assert_eq!(registry.kinds(), ToolKind::BUILTIN.to_vec());

        let write = ToolInvocation::new(ToolKind::WriteFile)
            .with_arg("path", "hello.txt")
            .with_arg("content", "hi");
        assert!(registry.dispatch(&write).await.success);

        let read = ToolInvocation::new(ToolKind::ReadFile).with_arg("path", "hello.txt");
        assert_eq!(registry.dispatch(&read).await.output, "hi");
    }
}
