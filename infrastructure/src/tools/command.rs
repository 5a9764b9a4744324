//! Command tools: run_command, run_tests

use crate::process::{self, ProcessError};
use crate::tools::file::workspace_error;
use crate::workspace::LocalWorkspace;
use async_trait::async_trait;
use ratchet_application::{CheckRun, TestRunner, ToolExecutor};
use ratchet_domain::{ToolError, ToolInvocation, ToolOutcome};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Default timeout for command execution (60 seconds)
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Upper bound the model may request
const MAX_TIMEOUT_SECS: u64 = 600;

/// Run a shell command inside the workspace.
///
/// Arguments: `command` (required), `working_dir` (workspace-relative),
/// `timeout_secs`. A non-zero exit is a failed outcome that still carries
/// the output, so the model can read the error.
pub struct RunCommandTool {
    workspace: Arc<LocalWorkspace>,
}

impl RunCommandTool {
    pub fn new(workspace: Arc<LocalWorkspace>) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl ToolExecutor for RunCommandTool {
    async fn execute(&self, invocation: &ToolInvocation) -> ToolOutcome {
        let command = match invocation.require_string("command") {
            Ok(c) => c,
            Err(e) => return ToolOutcome::failure(ToolError::invalid_argument(e)),
        };

        let cwd = match invocation.get_string("working_dir") {
            Some(dir) => match self.workspace.resolve(dir) {
                Ok(path) if path.is_dir() => path,
                Ok(_) => {
                    return ToolOutcome::failure(ToolError::not_found(format!(
                        "directory {}",
                        dir
                    )));
                }
                Err(e) => return ToolOutcome::failure(workspace_error(e)),
            },
            None => self.workspace.root().to_path_buf(),
        };

        let timeout_secs = invocation
            .get_i64("timeout_secs")
            .map(|s| s.max(1) as u64)
            .unwrap_or(DEFAULT_TIMEOUT_SECS)
            .min(MAX_TIMEOUT_SECS);

        info!(command, timeout_secs, "Running command");
        match process::run_shell(command, &cwd, Duration::from_secs(timeout_secs)).await {
            Ok(output) if output.success() => ToolOutcome::success(output.output),
            Ok(output) => ToolOutcome::failure_with_output(
                output.output,
                ToolError::execution_failed(format!(
                    "Command exited with code {}",
                    output.exit_code
                )),
            ),
            Err(ProcessError::Timeout { timeout, .. }) => ToolOutcome::failure(ToolError::timeout(
                format!("{} ({}s)", command, timeout.as_secs()),
            )),
            Err(e) => ToolOutcome::failure(ToolError::execution_failed(e.to_string())),
        }
    }
}

/// Run the tests affected by the given files through the configured
/// [`TestRunner`].
///
/// `files` may be a list or a single string; omitted, the runner decides
/// what "affected" means for the whole project.
pub struct RunTestsTool {
    runner: Arc<dyn TestRunner>,
}

impl RunTestsTool {
    pub fn new(runner: Arc<dyn TestRunner>) -> Self {
        Self { runner }
    }
}

fn files_arg(invocation: &ToolInvocation) -> Vec<String> {
    match invocation.args.get("files") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str())
            .map(String::from)
            .collect(),
        Some(Value::String(s)) => s.split_whitespace().map(String::from).collect(),
        _ => Vec::new(),
    }
}

#[async_trait]
impl ToolExecutor for RunTestsTool {
    async fn execute(&self, invocation: &ToolInvocation) -> ToolOutcome {
        let files = files_arg(invocation);
        match self.runner.run_affected(&files).await {
            CheckRun::Passed => ToolOutcome::success("Tests passed"),
            CheckRun::Failed { summary, details } => ToolOutcome::failure_with_output(
                details.join("\n"),
                ToolError::execution_failed(summary),
            ),
            CheckRun::Unavailable(reason) => {
                ToolOutcome::success(format!("Tests skipped: {}", reason))
            }
        }
    }
}
