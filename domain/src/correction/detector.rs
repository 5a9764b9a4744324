//! Per-task loop detection.
//!
//! The controller calls [`SelfCorrector::record`] with each iteration's
//! action records, then [`SelfCorrector::detect`]. Rules are checked in
//! priority order (read loop, syntax loop, tool repetition) and the first
//! match wins.
//!
//! All counters are fields of this session object, so they survive context
//! compression and two tasks never share them. A WARN only fires when the
//! most recent batch contributed to the pattern; ABORT ceilings are
//! cumulative.

use super::signal::{LoopKind, LoopSignal, LoopThresholds, SignalSeverity};
use crate::agent::iteration::{ActionErrorKind, ActionRecord};
use std::collections::{HashMap, VecDeque};

/// What the latest batch contributed.
#[derive(Debug, Clone, Default)]
struct BatchFacts {
    blocked_read_paths: Vec<String>,
    validation_failure_paths: Vec<String>,
    failed_signatures: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct SelfCorrector {
    thresholds: LoopThresholds,
    history: VecDeque<ActionRecord>,
    reads_since_write: HashMap<String, usize>,
    total_blocked_reads: usize,
    consecutive_blocked_iterations: usize,
    validation_failures: HashMap<String, usize>,
    total_validation_failures: usize,
    failure_streaks: HashMap<String, usize>,
    last_batch: BatchFacts,
}

impl Default for SelfCorrector {
    fn default() -> Self {
        Self::new(LoopThresholds::default())
    }
}

impl SelfCorrector {
    pub fn new(thresholds: LoopThresholds) -> Self {
        Self {
            thresholds,
            history: VecDeque::new(),
            reads_since_write: HashMap::new(),
            total_blocked_reads: 0,
            consecutive_blocked_iterations: 0,
            validation_failures: HashMap::new(),
            total_validation_failures: 0,
            failure_streaks: HashMap::new(),
            last_batch: BatchFacts::default(),
        }
    }

    pub fn thresholds(&self) -> &LoopThresholds {
        &self.thresholds
    }

    /// Recent records, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &ActionRecord> {
        self.history.iter()
    }

    pub fn total_blocked_reads(&self) -> usize {
        self.total_blocked_reads
    }

    pub fn total_validation_failures(&self) -> usize {
        self.total_validation_failures
    }

    /// Fold one iteration's records into the counters.
    pub fn record(&mut self, actions: &[ActionRecord]) {
        let mut batch = BatchFacts::default();

        for action in actions {
            self.observe(action, &mut batch);
            self.history.push_back(action.clone());
            while self.history.len() > self.thresholds.history_limit {
                self.history.pop_front();
            }
        }

        if batch.blocked_read_paths.is_empty() {
            self.consecutive_blocked_iterations = 0;
        } else {
            self.consecutive_blocked_iterations += 1;
        }
        self.last_batch = batch;
    }

    fn observe(&mut self, action: &ActionRecord, batch: &mut BatchFacts) {
        let path = action.path().map(str::to_string);

        if action.tool.is_read()
            && let Some(path) = &path
        {
            let count = self.reads_since_write.entry(path.clone()).or_insert(0);
            *count += 1;
            if *count >= self.thresholds.read_warn {
                self.total_blocked_reads += 1;
                batch.blocked_read_paths.push(path.clone());
            }
        }

        if action.tool.is_write()
            && (action.success || action.is_validation_failure())
            && let Some(path) = &path
        {
            self.reads_since_write.remove(path);
        }

        if action.is_validation_failure() {
            let key = path.clone().unwrap_or_default();
            *self.validation_failures.entry(key.clone()).or_insert(0) += 1;
            self.total_validation_failures += 1;
            batch.validation_failure_paths.push(key);
        }

        let signature = action.signature();
        if action.success {
            self.failure_streaks.remove(&signature);
        } else if action.error_kind == Some(ActionErrorKind::Tool) {
            *self.failure_streaks.entry(signature.clone()).or_insert(0) += 1;
            batch.failed_signatures.push(signature);
        }
    }

    /// Evaluate the rules against the current counters.
    pub fn detect(&self) -> Option<LoopSignal> {
        self.detect_read_loop()
            .or_else(|| self.detect_syntax_loop())
            .or_else(|| self.detect_tool_repetition())
    }

    fn detect_read_loop(&self) -> Option<LoopSignal> {
        let t = &self.thresholds;
        let latest_path = self.last_batch.blocked_read_paths.last().cloned();

        if self.total_blocked_reads >= t.blocked_reads_abort
            || self.consecutive_blocked_iterations >= t.consecutive_blocked_iterations_abort
        {
            return Some(LoopSignal {
                kind: LoopKind::ReadLoop,
                count: self.total_blocked_reads,
                severity: SignalSeverity::Abort,
                suggestion: format!(
                    "Aborting: {} blocked reads ({} consecutive iterations re-reading unchanged files).",
                    self.total_blocked_reads, self.consecutive_blocked_iterations
                ),
                path: latest_path,
            });
        }

        let path = latest_path?;
        let count = self.reads_since_write.get(&path).copied().unwrap_or(0);
        let suggestion = if count <= t.read_warn {
            format!(
                "You have read '{}' {} times without changing it. Use the content you already have.",
                path, count
            )
        } else if count <= t.read_warn + 2 {
            format!(
                "Stop re-reading '{}'; it has not changed since you last read it. Edit it or move on to another file.",
                path
            )
        } else {
            format!(
                "Reading '{}' again will abort the task. Make your change now or state what is blocking you.",
                path
            )
        };
        Some(LoopSignal {
            kind: LoopKind::ReadLoop,
            count,
            severity: SignalSeverity::Warn,
            suggestion,
            path: Some(path),
        })
    }

    fn detect_syntax_loop(&self) -> Option<LoopSignal> {
        let t = &self.thresholds;
        if self.total_validation_failures >= t.syntax_abort_total {
            return Some(LoopSignal {
                kind: LoopKind::SyntaxLoop,
                count: self.total_validation_failures,
                severity: SignalSeverity::Abort,
                suggestion: format!(
                    "Aborting: {} validation failures in this task.",
                    self.total_validation_failures
                ),
                path: self.last_batch.validation_failure_paths.last().cloned(),
            });
        }

        let (path, count) = self
            .last_batch
            .validation_failure_paths
            .iter()
            .rev()
            .map(|p| (p, self.validation_failures.get(p).copied().unwrap_or(0)))
            .find(|(_, count)| *count >= t.syntax_warn_per_file)?;
        Some(LoopSignal {
            kind: LoopKind::SyntaxLoop,
            count,
            severity: SignalSeverity::Warn,
            suggestion: format!(
                "'{}' has failed validation {} times. Delete the file and write it again from scratch in small, complete pieces.",
                path, count
            ),
            path: Some(path.clone()),
        })
    }

    fn detect_tool_repetition(&self) -> Option<LoopSignal> {
        let t = &self.thresholds;
        let (signature, count) = self
            .last_batch
            .failed_signatures
            .iter()
            .rev()
            .map(|s| (s, self.failure_streaks.get(s).copied().unwrap_or(0)))
            .max_by_key(|(_, count)| *count)?;

        let tool = signature.split(':').next().unwrap_or(signature);
        if count >= t.repetition_abort {
            return Some(LoopSignal {
                kind: LoopKind::ToolRepetition,
                count,
                severity: SignalSeverity::Abort,
                suggestion: format!(
                    "Aborting: the same '{}' call failed {} times in a row.",
                    tool, count
                ),
                path: None,
            });
        }
        (count >= t.repetition_warn).then(|| LoopSignal {
            kind: LoopKind::ToolRepetition,
            count,
            severity: SignalSeverity::Warn,
            suggestion: format!(
                "The same '{}' call has failed {} times with identical arguments. Try a different tool or different arguments.",
                tool, count
            ),
            path: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::entities::{ToolInvocation, ToolKind};
    use crate::tool::value_objects::{ToolError, ToolOutcome};

    fn read(path: &str) -> ActionRecord {
        let call = ToolInvocation::new(ToolKind::ReadFile).with_arg("path", path);
        ActionRecord::from_outcome(&call, &ToolOutcome::success("contents"))
    }

    fn write(path: &str) -> ActionRecord {
        let call = ToolInvocation::new(ToolKind::WriteFile)
            .with_arg("path", path)
            .with_arg("content", "x");
        ActionRecord::from_outcome(&call, &ToolOutcome::success(""))
    }

    fn invalid_write(path: &str) -> ActionRecord {
        let call = ToolInvocation::new(ToolKind::WriteFile)
            .with_arg("path", path)
            .with_arg("content", "def f(:");
        ActionRecord::validation_failure(&call, "syntax error")
    }

    fn failing_command() -> ActionRecord {
        let call = ToolInvocation::new(ToolKind::RunCommand).with_arg("command", "make");
        ActionRecord::from_outcome(
            &call,
            &ToolOutcome::failure(ToolError::execution_failed("exit 2")),
        )
    }

    #[test]
    fn test_five_reads_warn_in_same_iteration() {
        let mut corrector = SelfCorrector::default();
        for _ in 0..4 {
            corrector.record(&[read("src/a.rs")]);
            assert!(corrector.detect().is_none());
        }
        corrector.record(&[read("src/a.rs")]);
        let signal = corrector.detect().unwrap();
        assert_eq!(signal.kind, LoopKind::ReadLoop);
        assert_eq!(signal.severity, SignalSeverity::Warn);
        assert_eq!(signal.count, 5);
        assert_eq!(signal.path.as_deref(), Some("src/a.rs"));
    }

    #[test]
    fn test_write_resets_read_count() {
        let mut corrector = SelfCorrector::default();
        for _ in 0..4 {
            corrector.record(&[read("a.py")]);
        }
        corrector.record(&[write("a.py")]);
        corrector.record(&[read("a.py")]);
        assert!(corrector.detect().is_none());
    }

    #[test]
    fn test_warn_messages_escalate() {
        let mut corrector = SelfCorrector::default();
        let mut suggestions = Vec::new();
        for _ in 0..8 {
            corrector.record(&[read("a.py"), write("b.py")]);
            if let Some(signal) = corrector.detect() {
                suggestions.push(signal.suggestion);
            }
        }
        // reads 5, 6, 7 warn; the third consecutive blocked iteration aborts
        assert!(suggestions[0].contains("5 times"));
        assert!(suggestions[1].contains("Stop re-reading"));
        assert!(suggestions[2].starts_with("Aborting"));
    }

    #[test]
    fn test_three_consecutive_blocked_iterations_abort() {
        let mut corrector = SelfCorrector::default();
        for _ in 0..4 {
            corrector.record(&[read("a.py")]);
        }
        corrector.record(&[read("a.py")]);
        corrector.record(&[read("a.py")]);
        assert_eq!(corrector.detect().unwrap().severity, SignalSeverity::Warn);
        corrector.record(&[read("a.py")]);
        let signal = corrector.detect().unwrap();
        assert_eq!(signal.severity, SignalSeverity::Abort);
        assert_eq!(signal.kind, LoopKind::ReadLoop);
    }

    #[test]
    fn test_ten_blocked_reads_abort_without_consecutive_streak() {
        let mut corrector = SelfCorrector::default();
        let paths: Vec<String> = (0..5).map(|i| format!("f{}.py", i)).collect();
        // Bring every path to the warn threshold in one iteration
        let warmup: Vec<ActionRecord> = paths
            .iter()
            .flat_map(|p| std::iter::repeat_n(read(p), 4))
            .collect();
        corrector.record(&warmup);
        corrector.record(&[]);
        for pair in paths.chunks(2).chain(paths.chunks(3)) {
            let batch: Vec<_> = pair.iter().map(|p| read(p)).collect();
            corrector.record(&batch);
            corrector.record(&[]);
        }
        assert!(corrector.total_blocked_reads() >= 10);
        assert_eq!(corrector.detect().unwrap().severity, SignalSeverity::Abort);
    }

    #[test]
    fn test_syntax_loop_warn_and_abort() {
        let mut corrector = SelfCorrector::default();
        corrector.record(&[invalid_write("a.py")]);
        corrector.record(&[invalid_write("a.py")]);
        assert!(corrector.detect().is_none());
        corrector.record(&[invalid_write("a.py")]);
        let signal = corrector.detect().unwrap();
        assert_eq!(signal.kind, LoopKind::SyntaxLoop);
        assert_eq!(signal.severity, SignalSeverity::Warn);
        assert!(signal.suggestion.contains("Delete the file"));

        for i in 0..5 {
            corrector.record(&[invalid_write(&format!("other{}.py", i))]);
        }
        let signal = corrector.detect().unwrap();
        assert_eq!(signal.severity, SignalSeverity::Abort);
        assert_eq!(signal.count, 8);
    }

    #[test]
    fn test_warn_requires_latest_batch_contribution() {
        let mut corrector = SelfCorrector::default();
        for _ in 0..3 {
            corrector.record(&[invalid_write("a.py")]);
        }
        assert!(corrector.detect().is_some());
        corrector.record(&[read("b.py")]);
        assert!(corrector.detect().is_none());
    }

    #[test]
    fn test_tool_repetition() {
        let mut corrector = SelfCorrector::default();
        for _ in 0..3 {
            corrector.record(&[failing_command()]);
        }
        assert!(corrector.detect().is_none());
        corrector.record(&[failing_command()]);
        let signal = corrector.detect().unwrap();
        assert_eq!(signal.kind, LoopKind::ToolRepetition);
        assert_eq!(signal.severity, SignalSeverity::Warn);
        corrector.record(&[failing_command()]);
        corrector.record(&[failing_command()]);
        assert_eq!(corrector.detect().unwrap().severity, SignalSeverity::Abort);
    }

    #[test]
    fn test_success_breaks_repetition_streak() {
        let mut corrector = SelfCorrector::default();
        for _ in 0..3 {
            corrector.record(&[failing_command()]);
        }
        let call = ToolInvocation::new(ToolKind::RunCommand).with_arg("command", "make");
        corrector.record(&[ActionRecord::from_outcome(&call, &ToolOutcome::success("ok"))]);
        corrector.record(&[failing_command()]);
        assert!(corrector.detect().is_none());
    }

    #[test]
    fn test_history_is_bounded() {
        let mut corrector = SelfCorrector::new(LoopThresholds {
            history_limit: 3,
            ..LoopThresholds::default()
        });
        for i in 0..10 {
            corrector.record(&[write(&format!("{}.py", i))]);
        }
        assert_eq!(corrector.history().count(), 3);
    }

    #[test]
    fn test_sessions_are_independent() {
        let mut a = SelfCorrector::default();
        let b = SelfCorrector::default();
        for _ in 0..5 {
            a.record(&[read("x.py")]);
        }
        assert!(a.detect().is_some());
        assert!(b.detect().is_none());
    }
}
