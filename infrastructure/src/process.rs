//! Child process execution with a timeout and bounded output.

use ratchet_domain::core::string::truncate;
use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

/// Maximum combined output kept (1 MB)
const MAX_OUTPUT_SIZE: usize = 1024 * 1024;

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("Failed to spawn {program}: {reason}")]
    Spawn { program: String, reason: String },

    #[error("{program} timed out after {} seconds", .timeout.as_secs())]
    Timeout { program: String, timeout: Duration },
}

#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub exit_code: i32,
    /// stdout, then stderr after a separator when both are present
    pub output: String,
    pub duration: Duration,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Run `program` with `args` in `cwd`. The child is killed when the timeout
/// elapses.
pub async fn run(
    program: &str,
    args: &[String],
    cwd: &Path,
    timeout: Duration,
) -> Result<ProcessOutput, ProcessError> {
    let mut cmd = Command::new(program);
    cmd.args(args);
    execute(cmd, program, cwd, timeout).await
}

/// Run a command line through the platform shell.
pub async fn run_shell(
    command: &str,
    cwd: &Path,
    timeout: Duration,
) -> Result<ProcessOutput, ProcessError> {
    let cmd = if cfg!(target_os = "windows") {
        let mut c = Command::new("cmd");
        c.args(["/C", command]);
        c
    } else {
        let mut c = Command::new("sh");
        c.args(["-c", command]);
        c
    };
    execute(cmd, command, cwd, timeout).await
}

async fn execute(
    mut cmd: Command,
    program: &str,
    cwd: &Path,
    timeout: Duration,
) -> Result<ProcessOutput, ProcessError> {
    let start = Instant::now();
    cmd.current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let child = cmd.spawn().map_err(|e| ProcessError::Spawn {
        program: program.to_string(),
        reason: e.to_string(),
    })?;

    let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            return Err(ProcessError::Spawn {
                program: program.to_string(),
                reason: e.to_string(),
            });
        }
        // dropping the future drops the child, which kills it
        Err(_) => {
            return Err(ProcessError::Timeout {
                program: program.to_string(),
                timeout,
            });
        }
    };

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    let mut combined = String::new();
    if !stdout.is_empty() {
        combined.push_str(&stdout);
    }
    if !stderr.is_empty() {
        if !combined.is_empty() {
            combined.push_str("\n--- stderr ---\n");
        }
        combined.push_str(&stderr);
    }
    if combined.len() > MAX_OUTPUT_SIZE {
        combined = truncate(&combined, MAX_OUTPUT_SIZE);
        combined.push_str("\n(output truncated)");
    }

    let exit_code = output.status.code().unwrap_or(-1);
    let duration = start.elapsed();
    debug!(program, exit_code, elapsed_ms = duration.as_millis() as u64, "Process finished");

    Ok(ProcessOutput {
        exit_code,
        output: combined,
        duration,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_shell_captures_output_and_exit_code() {
        let dir = tempfile::tempdir().unwrap();
        let out = run_shell("echo hello; echo oops >&2; exit 3", dir.path(), Duration::from_secs(10))
            .await
            .unwrap();
        assert_eq!(out.exit_code, 3);
        assert!(!out.success());
        assert!(out.output.starts_with("hello"));
        assert!(out.output.contains("--- stderr ---\noops"));
    }

    #[tokio::test]
    async fn test_run_uses_working_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "").unwrap();
        let out = run("ls", &[], dir.path(), Duration::from_secs(10)).await.unwrap();
        assert!(out.success());
        assert!(out.output.contains("marker.txt"));
    }

    #[tokio::test]
    async fn test_timeout_and_spawn_errors() {
        let dir = tempfile::tempdir().unwrap();
        let err = run_shell("sleep 5", dir.path(), Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(matches!(err, ProcessError::Timeout { .. }));

        let err = run("definitely-not-a-real-binary", &[], dir.path(), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ProcessError::Spawn { .. }));
    }
}
