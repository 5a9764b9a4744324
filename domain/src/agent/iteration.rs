//! Iterations and the action records they contain.
//!
//! An [`Iteration`] is one THINKING → REFLECTING pass. Each dispatched action
//! (and each unparseable one) yields exactly one [`ActionRecord`], stored in
//! dispatch order. Records are never mutated after being pushed; the
//! [`IterationLog`] only appends, and indices are strictly monotonic from 0.

use crate::core::error::DomainError;
use crate::core::string::truncate;
use crate::tool::entities::{ToolInvocation, ToolKind, path_arg};
use crate::tool::value_objects::ToolOutcome;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

const SUMMARY_LIMIT: usize = 200;

/// Why an action failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionErrorKind {
    /// The tool ran (or was dispatched) and reported failure.
    Tool,
    /// The model emitted a call that could not be parsed.
    Parse,
    /// A write succeeded but the resulting file failed validation.
    Validation,
    /// The action was not dispatched because the task was cancelled.
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRecord {
    pub tool: ToolKind,
    pub args: Map<String, Value>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ActionErrorKind>,
    pub result_summary: String,
    pub timestamp: DateTime<Utc>,
}

impl ActionRecord {
    /// Record the outcome of a dispatched tool call.
    pub fn from_outcome(invocation: &ToolInvocation, outcome: &ToolOutcome) -> Self {
        Self {
            tool: invocation.kind.clone(),
            args: invocation.args.clone(),
            success: outcome.success,
            error: outcome.error_message(),
            error_kind: (!outcome.success).then_some(ActionErrorKind::Tool),
            result_summary: truncate(outcome.output.trim(), SUMMARY_LIMIT),
            timestamp: Utc::now(),
        }
    }

    /// A call the parser could not turn into an invocation.
    pub fn parse_error(raw_name: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            tool: ToolKind::Custom(raw_name.unwrap_or("unparsed").to_string()),
            args: Map::new(),
            success: false,
            error: Some(message.into()),
            error_kind: Some(ActionErrorKind::Parse),
            result_summary: String::new(),
            timestamp: Utc::now(),
        }
    }

    /// A write whose result failed validation.
    pub fn validation_failure(invocation: &ToolInvocation, message: impl Into<String>) -> Self {
        Self {
            tool: invocation.kind.clone(),
            args: invocation.args.clone(),
            success: false,
            error: Some(message.into()),
            error_kind: Some(ActionErrorKind::Validation),
            result_summary: String::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn cancelled(invocation: &ToolInvocation) -> Self {
        Self {
            tool: invocation.kind.clone(),
            args: invocation.args.clone(),
            success: false,
            error: Some("cancelled before dispatch".to_string()),
            error_kind: Some(ActionErrorKind::Cancelled),
            result_summary: String::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn path(&self) -> Option<&str> {
        path_arg(&self.args)
    }

    /// Same format as [`ToolInvocation::signature`].
    pub fn signature(&self) -> String {
        format!("{}:{}", self.tool, Value::Object(self.args.clone()))
    }

    pub fn is_validation_failure(&self) -> bool {
        self.error_kind == Some(ActionErrorKind::Validation)
    }

    /// Text fed back to the model as the observation for this action.
    pub fn observation(&self) -> String {
        let target = self.path().map(|p| format!(" {}", p)).unwrap_or_default();
        match (&self.error, self.success) {
            (_, true) if self.result_summary.is_empty() => format!("[{}{}] ok", self.tool, target),
            (_, true) => format!("[{}{}] ok\n{}", self.tool, target, self.result_summary),
            (Some(err), false) => format!("[{}{}] failed: {}", self.tool, target, err),
            (None, false) => format!("[{}{}] failed", self.tool, target),
        }
    }
}

/// One pass of the ReAct loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Iteration {
    pub index: usize,
    pub thoughts: String,
    pub actions: Vec<ActionRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reflection: Option<String>,
}

impl Iteration {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            thoughts: String::new(),
            actions: Vec::new(),
            reflection: None,
        }
    }

    pub fn failed_actions(&self) -> usize {
        self.actions.iter().filter(|a| !a.success).count()
    }
}

/// Append-only sequence of iterations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IterationLog {
    iterations: Vec<Iteration>,
}

impl IterationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index the next iteration must carry.
    pub fn next_index(&self) -> usize {
        self.iterations.len()
    }

    pub fn push(&mut self, iteration: Iteration) -> Result<(), DomainError> {
        let expected = self.next_index();
        if iteration.index != expected {
            return Err(DomainError::NonMonotonicIteration {
                expected,
                got: iteration.index,
            });
        }
        self.iterations.push(iteration);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.iterations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.iterations.is_empty()
    }

    pub fn last(&self) -> Option<&Iteration> {
        self.iterations.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Iteration> {
        self.iterations.iter()
    }

    /// Paths written during the task, sorted. A write whose result failed
    /// validation still touched the file.
    pub fn files_touched(&self) -> Vec<String> {
        self.iterations
            .iter()
            .flat_map(|it| it.actions.iter())
            .filter(|a| a.tool.is_write() && (a.success || a.is_validation_failure()))
            .filter_map(|a| a.path().map(str::to_string))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::value_objects::ToolError;

    fn write(path: &str) -> ToolInvocation {
        ToolInvocation::new(ToolKind::WriteFile)
            .with_arg("path", path)
            .with_arg("content", "x")
    }

    #[test]
    fn test_record_from_outcome() {
        let call = ToolInvocation::new(ToolKind::ReadFile).with_arg("path", "a.rs");
        let ok = ActionRecord::from_outcome(&call, &ToolOutcome::success("fn main() {}"));
        assert!(ok.success);
        assert!(ok.error_kind.is_none());
        assert_eq!(ok.path(), Some("a.rs"));
        assert_eq!(ok.signature(), call.signature());

        let failed = ActionRecord::from_outcome(
            &call,
            &ToolOutcome::failure(ToolError::not_found("a.rs")),
        );
        assert_eq!(failed.error_kind, Some(ActionErrorKind::Tool));
        assert!(failed.observation().contains("failed"));
    }

    #[test]
    fn test_log_rejects_non_monotonic_index() {
        let mut log = IterationLog::new();
        log.push(Iteration::new(0)).unwrap();
        let err = log.push(Iteration::new(5)).unwrap_err();
        assert_eq!(
            err,
            DomainError::NonMonotonicIteration {
                expected: 1,
                got: 5
            }
        );
        assert!(log.push(Iteration::new(0)).is_err());
        log.push(Iteration::new(1)).unwrap();
        assert_eq!(log.next_index(), 2);
    }

    #[test]
    fn test_files_touched_counts_successful_writes() {
        let mut log = IterationLog::new();
        let mut it = Iteration::new(0);
        it.actions.push(ActionRecord::from_outcome(
            &write("b.py"),
            &ToolOutcome::success(""),
        ));
        it.actions.push(ActionRecord::from_outcome(
            &write("a.py"),
            &ToolOutcome::success(""),
        ));
        it.actions.push(ActionRecord::from_outcome(
            &write("c.py"),
            &ToolOutcome::failure(ToolError::permission_denied("c.py")),
        ));
        it.actions
            .push(ActionRecord::validation_failure(&write("d.py"), "syntax error"));
        it.actions.push(ActionRecord::from_outcome(
            &write("a.py"),
            &ToolOutcome::success(""),
        ));
        log.push(it).unwrap();
        assert_eq!(log.files_touched(), vec!["a.py", "b.py", "d.py"]);
    }

    #[test]
    fn test_parse_error_record() {
        let record = ActionRecord::parse_error(Some("wrte_file"), "expected ',' at 1:20");
        assert!(!record.success);
        assert_eq!(record.error_kind, Some(ActionErrorKind::Parse));
        assert_eq!(record.tool, ToolKind::Custom("wrte_file".into()));
    }
}
