//! Verification domain module
//!
//! Levels, check results, and the summary that decides whether the agent may
//! continue after a change.
//!
//! | Check | Level | A failure is |
//! |-------|-------|--------------|
//! | Syntax | minimal+ | blocking |
//! | Lint | standard+ | a warning |
//! | Unit tests (affected) | standard+ | deferred |
//! | Types | thorough | a warning |

use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckKind {
    Syntax,
    Lint,
    UnitTests,
    Types,
}

impl CheckKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckKind::Syntax => "syntax",
            CheckKind::Lint => "lint",
            CheckKind::UnitTests => "unit_tests",
            CheckKind::Types => "types",
        }
    }
}

impl std::fmt::Display for CheckKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationLevel {
    Minimal,
    #[default]
    Standard,
    Thorough,
}

impl VerificationLevel {
    pub fn checks(&self) -> &'static [CheckKind] {
        match self {
            VerificationLevel::Minimal => &[CheckKind::Syntax],
            VerificationLevel::Standard => {
                &[CheckKind::Syntax, CheckKind::Lint, CheckKind::UnitTests]
            }
            VerificationLevel::Thorough => &[
                CheckKind::Syntax,
                CheckKind::Lint,
                CheckKind::UnitTests,
                CheckKind::Types,
            ],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationLevel::Minimal => "minimal",
            VerificationLevel::Standard => "standard",
            VerificationLevel::Thorough => "thorough",
        }
    }
}

impl std::fmt::Display for VerificationLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VerificationLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "minimal" => Ok(VerificationLevel::Minimal),
            "standard" => Ok(VerificationLevel::Standard),
            "thorough" => Ok(VerificationLevel::Thorough),
            other => Err(format!(
                "unknown verification level '{}' (expected minimal, standard or thorough)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Passed,
    Failed,
    /// The check's tool is unavailable.
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    pub kind: CheckKind,
    pub status: CheckStatus,
    /// File the check ran on; `None` for workspace-wide checks.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<String>,
}

impl CheckResult {
    pub fn passed(kind: CheckKind, target: Option<String>) -> Self {
        Self {
            kind,
            status: CheckStatus::Passed,
            target,
            message: "ok".to_string(),
            details: Vec::new(),
        }
    }

    pub fn failed(
        kind: CheckKind,
        target: Option<String>,
        message: impl Into<String>,
        details: Vec<String>,
    ) -> Self {
        Self {
            kind,
            status: CheckStatus::Failed,
            target,
            message: message.into(),
            details,
        }
    }

    pub fn skipped(kind: CheckKind, target: Option<String>, reason: impl Into<String>) -> Self {
        Self {
            kind,
            status: CheckStatus::Skipped,
            target,
            message: reason.into(),
            details: Vec::new(),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.status == CheckStatus::Failed
    }

    /// Failures of this check stop the agent.
    pub fn is_blocking(&self) -> bool {
        self.is_failure() && self.kind == CheckKind::Syntax
    }

    /// Failures of this check are reported once the task ends.
    pub fn is_deferred(&self) -> bool {
        self.is_failure() && self.kind == CheckKind::UnitTests
    }

    pub fn is_warning(&self) -> bool {
        self.is_failure() && matches!(self.kind, CheckKind::Lint | CheckKind::Types)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VerificationSummary {
    pub can_continue: bool,
    pub blocking_failures: Vec<CheckResult>,
    pub warnings: Vec<CheckResult>,
    pub deferred: Vec<CheckResult>,
    pub passed: usize,
    pub skipped: usize,
}

pub fn summarize(results: &[CheckResult]) -> VerificationSummary {
    let pick = |f: fn(&CheckResult) -> bool| -> Vec<CheckResult> {
        results.iter().filter(|r| f(r)).cloned().collect()
    };
    let blocking_failures = pick(CheckResult::is_blocking);
    VerificationSummary {
        can_continue: blocking_failures.is_empty(),
        blocking_failures,
        warnings: pick(CheckResult::is_warning),
        deferred: pick(CheckResult::is_deferred),
        passed: results
            .iter()
            .filter(|r| r.status == CheckStatus::Passed)
            .count(),
        skipped: results
            .iter()
            .filter(|r| r.status == CheckStatus::Skipped)
            .count(),
    }
}
