//! Validation results and issues.

use serde::{Deserialize, Serialize};

/// Validation stages. The derived ordering is the fixed execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationStage {
    Syntax,
    Formatting,
    Imports,
    Types,
}

impl ValidationStage {
    pub const ALL: [ValidationStage; 4] = [
        ValidationStage::Syntax,
        ValidationStage::Formatting,
        ValidationStage::Imports,
        ValidationStage::Types,
    ];

    /// Default stages; TYPES only runs in strict mode.
    pub fn defaults(strict: bool) -> Vec<ValidationStage> {
        let mut stages = vec![
            ValidationStage::Syntax,
            ValidationStage::Formatting,
            ValidationStage::Imports,
        ];
        if strict {
            stages.push(ValidationStage::Types);
        }
        stages
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationStage::Syntax => "syntax",
            ValidationStage::Formatting => "formatting",
            ValidationStage::Imports => "imports",
            ValidationStage::Types => "types",
        }
    }
}

impl std::fmt::Display for ValidationStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category of a syntax failure, used to pick corrective guidance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FixHint {
    UnclosedBracket,
    MissingBlockTerminator,
    InconsistentIndentation,
    UnterminatedString,
    Other,
}

impl FixHint {
    pub fn advice(&self) -> &'static str {
        match self {
            FixHint::UnclosedBracket => "close the bracket opened here or remove the stray one",
            FixHint::MissingBlockTerminator => "terminate the block that starts here",
            FixHint::InconsistentIndentation => "re-indent this block consistently",
            FixHint::UnterminatedString => "close the string literal",
            FixHint::Other => "rewrite the statement around this line",
        }
    }
}

/// Location and cause of a syntax error, as reported by a parser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyntaxDiagnostic {
    /// 1-based
    pub line: usize,
    /// 1-based, in characters
    pub column: usize,
    pub message: String,
    pub hint: FixHint,
}

impl SyntaxDiagnostic {
    pub fn new(line: usize, column: usize, message: impl Into<String>, hint: FixHint) -> Self {
        Self {
            line,
            column,
            message: message.into(),
            hint,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub line: usize,
    pub column: usize,
    pub message: String,
    /// Source lines around `line` (±2), prefixed with their numbers.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub context_lines: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fix_hint: Option<FixHint>,
}

impl ValidationIssue {
    pub fn at(line: usize, column: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            column,
            message: message.into(),
            context_lines: Vec::new(),
            fix_hint: None,
        }
    }

    pub fn from_diagnostic(diagnostic: &SyntaxDiagnostic, content: &str) -> Self {
        Self {
            line: diagnostic.line,
            column: diagnostic.column,
            message: diagnostic.message.clone(),
            context_lines: context_lines(content, diagnostic.line, 2),
            fix_hint: Some(diagnostic.hint),
        }
    }
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}: {}", self.line, self.column, self.message)?;
        if let Some(hint) = self.fix_hint {
            write!(f, " (hint: {})", hint.advice())?;
        }
        Ok(())
    }
}

/// Lines `line - radius ..= line + radius` of `content`, numbered.
pub fn context_lines(content: &str, line: usize, radius: usize) -> Vec<String> {
    let first = line.saturating_sub(radius).max(1);
    let last = line + radius;
    content
        .lines()
        .enumerate()
        .map(|(i, text)| (i + 1, text))
        .filter(|(n, _)| *n >= first && *n <= last)
        .map(|(n, text)| format!("{:>4} | {}", n, text))
        .collect()
}

/// Outcome of a single validation stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub stage: ValidationStage,
    pub passed: bool,
    /// The stage's tool was unavailable; `passed` is vacuously true.
    #[serde(default)]
    pub skipped: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<String>,
    #[serde(default)]
    pub errors: Vec<ValidationIssue>,
    #[serde(default)]
    pub auto_fixable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed_content: Option<String>,
}

impl ValidationResult {
    pub fn passed(stage: ValidationStage) -> Self {
        Self {
            stage,
            passed: true,
            skipped: false,
            skip_reason: None,
            errors: Vec::new(),
            auto_fixable: false,
            fixed_content: None,
        }
    }

    pub fn failed(stage: ValidationStage, errors: Vec<ValidationIssue>) -> Self {
        Self {
            passed: false,
            errors,
            ..Self::passed(stage)
        }
    }

    pub fn skipped(stage: ValidationStage, reason: impl Into<String>) -> Self {
        Self {
            skipped: true,
            skip_reason: Some(reason.into()),
            ..Self::passed(stage)
        }
    }

    pub fn with_fix(mut self, fixed_content: String) -> Self {
        self.auto_fixable = true;
        self.fixed_content = Some(fixed_content);
        self
    }

    /// First error message, for one-line reporting.
    pub fn first_error(&self) -> Option<String> {
        self.errors.first().map(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_order_is_fixed() {
        let mut stages = vec![
            ValidationStage::Types,
            ValidationStage::Syntax,
            ValidationStage::Imports,
            ValidationStage::Formatting,
        ];
        stages.sort();
        assert_eq!(stages, ValidationStage::ALL.to_vec());
        assert!(!ValidationStage::defaults(false).contains(&ValidationStage::Types));
        assert!(ValidationStage::defaults(true).contains(&ValidationStage::Types));
    }

    #[test]
    fn test_context_lines_window() {
        let content = "a\nb\nc\nd\ne\nf\n";
        let ctx = context_lines(content, 1, 2);
        assert_eq!(ctx.len(), 3);
        let ctx = context_lines(content, 4, 2);
        assert_eq!(ctx.len(), 5);
        assert!(ctx[0].ends_with("| b"));
        assert!(ctx[4].ends_with("| f"));
    }

    #[test]
    fn test_skipped_is_not_failure() {
        let r = ValidationResult::skipped(ValidationStage::Types, "no type checker");
        assert!(r.passed);
        assert!(r.skipped);
    }
}
