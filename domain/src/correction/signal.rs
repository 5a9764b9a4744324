//! Loop signals and their thresholds.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoopKind {
    ReadLoop,
    SyntaxLoop,
    ToolRepetition,
}

impl LoopKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoopKind::ReadLoop => "read_loop",
            LoopKind::SyntaxLoop => "syntax_loop",
            LoopKind::ToolRepetition => "tool_repetition",
        }
    }
}

impl std::fmt::Display for LoopKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalSeverity {
    Warn,
    Abort,
}

/// A detected unproductive pattern. Recomputed on every detection; the
/// counters behind it live in the `SelfCorrector`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopSignal {
    pub kind: LoopKind,
    pub count: usize,
    pub severity: SignalSeverity,
    pub suggestion: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl LoopSignal {
    pub fn is_abort(&self) -> bool {
        self.severity == SignalSeverity::Abort
    }
}

/// Detector thresholds.
///
/// | Pattern | WARN | ABORT |
/// |---------|------|-------|
/// | Read loop | 5 reads of a path since its last write | 10 blocked reads, or 3 consecutive iterations with one |
/// | Syntax loop | 3 validation failures on a path | 8 in the task |
/// | Tool repetition | 4 consecutive failures of one call | 6 |
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopThresholds {
    pub read_warn: usize,
    pub blocked_reads_abort: usize,
    pub consecutive_blocked_iterations_abort: usize,
    pub syntax_warn_per_file: usize,
    pub syntax_abort_total: usize,
    pub repetition_warn: usize,
    pub repetition_abort: usize,
    /// Records kept in the rolling history.
    pub history_limit: usize,
}

impl Default for LoopThresholds {
    fn default() -> Self {
        Self {
            read_warn: 5,
            blocked_reads_abort: 10,
            consecutive_blocked_iterations_abort: 3,
            syntax_warn_per_file: 3,
            syntax_abort_total: 8,
            repetition_warn: 4,
            repetition_abort: 6,
            history_limit: 200,
        }
    }
}
