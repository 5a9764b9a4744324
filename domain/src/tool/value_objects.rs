//! Tool domain value objects: immutable outcome and error types
//!
//! Every dispatched action produces a [`ToolOutcome`]. Failures carry a
//! [`ToolError`] whose code lets the controller distinguish a missing handler
//! or bad arguments (the model can fix those) from runtime failures.

use serde::{Deserialize, Serialize};

/// Error that occurred during tool execution.
///
/// | Code | Description |
/// |------|-------------|
/// | `INVALID_ARGUMENT` | Missing/wrong parameters: model can fix |
/// | `NOT_FOUND` | Unknown tool or resource: model can correct |
/// | `EXECUTION_FAILED` | Runtime failure (I/O error, non-zero exit) |
/// | `PERMISSION_DENIED` | Access denied or path outside the workspace |
/// | `TIMEOUT` | Operation timed out (enforced by the executor) |
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolError {
    /// Error code (e.g., "NOT_FOUND", "PERMISSION_DENIED")
    pub code: String,
    /// Human-readable error message
    pub message: String,
}

impl ToolError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::new(
            "NOT_FOUND",
            format!("Resource not found: {}", resource.into()),
        )
    }

    pub fn permission_denied(resource: impl Into<String>) -> Self {
        Self::new(
            "PERMISSION_DENIED",
            format!("Permission denied: {}", resource.into()),
        )
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new("INVALID_ARGUMENT", message)
    }

    pub fn execution_failed(message: impl Into<String>) -> Self {
        Self::new("EXECUTION_FAILED", message)
    }

    pub fn timeout(operation: impl Into<String>) -> Self {
        Self::new(
            "TIMEOUT",
            format!("Operation timed out: {}", operation.into()),
        )
    }
}

impl std::fmt::Display for ToolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for ToolError {}

/// Result of a tool execution: `{success, output, error?}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolOutcome {
    pub success: bool,
    #[serde(default)]
    pub output: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ToolError>,
}

impl ToolOutcome {
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
            error: None,
        }
    }

    pub fn failure(error: ToolError) -> Self {
        Self {
            success: false,
            output: String::new(),
            error: Some(error),
        }
    }

    /// Failed execution that still produced output (e.g. a command with a
    /// non-zero exit status).
    pub fn failure_with_output(output: impl Into<String>, error: ToolError) -> Self {
        Self {
            success: false,
            output: output.into(),
            error: Some(error),
        }
    }

    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_error_display() {
        let err = ToolError::not_found("/path/to/file");
        assert_eq!(err.code, "NOT_FOUND");
        assert_eq!(err.to_string(), "[NOT_FOUND] Resource not found: /path/to/file");
    }

    #[test]
    fn test_outcome_success() {
        let outcome = ToolOutcome::success("file contents");
        assert!(outcome.success);
        assert_eq!(outcome.output, "file contents");
        assert!(outcome.error_message().is_none());
    }

    #[test]
    fn test_outcome_failure_keeps_output() {
        let outcome = ToolOutcome::failure_with_output(
            "1 failed",
            ToolError::execution_failed("exit status 1"),
        );
        assert!(!outcome.success);
        assert_eq!(outcome.output, "1 failed");
        assert_eq!(
            outcome.error_message().unwrap(),
            "[EXECUTION_FAILED] exit status 1"
        );
    }
}
