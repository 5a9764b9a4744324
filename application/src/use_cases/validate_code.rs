//! Validate Code use case (CodeValidator)
//!
//! Runs the requested stages in their fixed order
//! (SYNTAX → FORMATTING → IMPORTS → TYPES). A syntax failure gets one bounded
//! repair pass and a single re-parse; later stages see the repaired content.
//! A stage whose tool is unavailable is reported skipped, never failed.

use crate::ports::syntax::{ParseCheck, StructuralParser, SyntaxParser};
use crate::ports::toolchain::{CheckRun, NoToolchain, TypeChecker};
use ratchet_domain::validation::{check_formatting, check_imports, repair};
use ratchet_domain::{Language, ValidationIssue, ValidationResult, ValidationStage};
use std::sync::Arc;
use tracing::debug;

/// Results of one `validate` call, in stage order.
#[derive(Debug, Clone)]
pub struct ValidationReport {
    pub path: String,
    pub language: Language,
    pub results: Vec<ValidationResult>,
}

impl ValidationReport {
    /// No stage failed (skipped stages count as passing).
    pub fn passed(&self) -> bool {
        self.results.iter().all(|r| r.passed)
    }

    pub fn result(&self, stage: ValidationStage) -> Option<&ValidationResult> {
        self.results.iter().find(|r| r.stage == stage)
    }

    pub fn syntax_passed(&self) -> bool {
        self.result(ValidationStage::Syntax).is_none_or(|r| r.passed)
    }

    /// Content with every automatic fix applied, if any stage produced one.
    pub fn fixed_content(&self) -> Option<&str> {
        self.results
            .iter()
            .rev()
            .find_map(|r| r.fixed_content.as_deref())
    }

    /// One-line description of the first failure.
    pub fn first_failure(&self) -> Option<String> {
        self.results.iter().find(|r| !r.passed).map(|r| {
            format!(
                "{} check failed: {}",
                r.stage,
                r.first_error().unwrap_or_else(|| "unknown error".to_string())
            )
        })
    }
}

pub struct CodeValidator {
    parser: Arc<dyn SyntaxParser>,
    type_checker: Arc<dyn TypeChecker>,
}

impl Default for CodeValidator {
    fn default() -> Self {
        Self::new(Arc::new(StructuralParser))
    }
}

impl CodeValidator {
    pub fn new(parser: Arc<dyn SyntaxParser>) -> Self {
        Self {
            parser,
            type_checker: Arc::new(NoToolchain),
        }
    }

    pub fn with_type_checker(mut self, type_checker: Arc<dyn TypeChecker>) -> Self {
        self.type_checker = type_checker;
        self
    }

    pub async fn validate(
        &self,
        content: &str,
        file_path: &str,
        stages: &[ValidationStage],
    ) -> ValidationReport {
        let language = Language::from_path(file_path);
        let mut stages = stages.to_vec();
        stages.sort();
        stages.dedup();

        let mut current = content.to_string();
        let mut results = Vec::with_capacity(stages.len());
        let mut syntax_failed = false;
        for stage in stages {
            if syntax_failed {
                results.push(ValidationResult::skipped(stage, "syntax check failed"));
                continue;
            }
            let result = match stage {
                ValidationStage::Syntax => self.check_syntax(&current, language),
                ValidationStage::Formatting => check_formatting_stage(&current, language),
                ValidationStage::Imports => check_imports_stage(&current, language),
                ValidationStage::Types => self.check_types(&current, file_path, language).await,
            };
            debug!(
                path = file_path,
                stage = %stage,
                passed = result.passed,
                skipped = result.skipped,
                "Validation stage finished"
            );
            if stage == ValidationStage::Syntax && !result.passed {
                syntax_failed = true;
            }
            if let Some(fixed) = &result.fixed_content {
                current = fixed.clone();
            }
            results.push(result);
        }

        ValidationReport {
            path: file_path.to_string(),
            language,
            results,
        }
    }

    /// SYNTAX stage alone.
    pub fn check_syntax(&self, content: &str, language: Language) -> ValidationResult {
        let stage = ValidationStage::Syntax;
        let diagnostic = match self.parse(content, language) {
            ParseCheck::Valid => return ValidationResult::passed(stage),
            ParseCheck::Unsupported => {
                return ValidationResult::skipped(
                    stage,
                    format!("no parser for {} files", language.as_str()),
                );
            }
            ParseCheck::Invalid(diagnostic) => diagnostic,
        };

        if let Some(fixed) = repair(content, language)
            && self.parse(&fixed, language) == ParseCheck::Valid
        {
            debug!(language = language.as_str(), "Syntax error repaired");
            return ValidationResult::passed(stage).with_fix(fixed);
        }
        ValidationResult::failed(stage, vec![ValidationIssue::from_diagnostic(&diagnostic, content)])
    }

    /// Parse with the configured parser, falling back to the structural one.
    fn parse(&self, content: &str, language: Language) -> ParseCheck {
        match self.parser.check(content, language) {
            ParseCheck::Unsupported => StructuralParser.check(content, language),
            check => check,
        }
    }

    async fn check_types(&self, content: &str, path: &str, language: Language) -> ValidationResult {
        let stage = ValidationStage::Types;
        match self.type_checker.check_types(path, content, language).await {
            CheckRun::Passed => ValidationResult::passed(stage),
            CheckRun::Unavailable(reason) => ValidationResult::skipped(stage, reason),
            CheckRun::Failed { summary, details } => {
                let mut errors: Vec<ValidationIssue> = details
                    .iter()
                    .map(|d| issue_from_tool_line(d))
                    .collect();
                if errors.is_empty() {
                    errors.push(ValidationIssue::at(1, 1, summary));
                }
                ValidationResult::failed(stage, errors)
            }
        }
    }
}

fn check_formatting_stage(content: &str, language: Language) -> ValidationResult {
    let report = check_formatting(content, language);
    if report.is_clean() {
        ValidationResult::passed(ValidationStage::Formatting)
    } else {
        ValidationResult::failed(ValidationStage::Formatting, report.issues).with_fix(report.normalized)
    }
}

fn check_imports_stage(content: &str, language: Language) -> ValidationResult {
    let stage = ValidationStage::Imports;
    if !matches!(
        language,
        Language::Python | Language::Rust | Language::JavaScript | Language::TypeScript | Language::Tsx
    ) {
        return ValidationResult::skipped(stage, format!("no import analysis for {}", language.as_str()));
    }
    let issues = check_imports(content, language);
    if issues.is_empty() {
        ValidationResult::passed(stage)
    } else {
        ValidationResult::failed(stage, issues)
    }
}

/// Parse `file:line:col: message` (the shape most checkers print).
fn issue_from_tool_line(line: &str) -> ValidationIssue {
    let mut parts = line.splitn(4, ':');
    let _file = parts.next();
    let line_no = parts.next().and_then(|s| s.trim().parse::<usize>().ok());
    let col = parts.next().and_then(|s| s.trim().parse::<usize>().ok());
    match (line_no, col, parts.next()) {
        (Some(l), Some(c), Some(message)) => ValidationIssue::at(l, c, message.trim()),
        _ => ValidationIssue::at(1, 1, line.trim()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ratchet_domain::FixHint;

    struct FailingTypes;

    #[async_trait]
    impl TypeChecker for FailingTypes {
        async fn check_types(&self, _path: &str, _content: &str, _language: Language) -> CheckRun {
            CheckRun::failed(
                "1 error",
                vec!["app.py:3:5: error: Incompatible types".to_string()],
            )
        }
    }

    #[tokio::test]
    async fn test_valid_file_passes_default_stages() {
        let validator = CodeValidator::default();
        let content = "import os\n\n\nprint(os.getcwd())\n";
        let report = validator
            .validate(content, "app.py", &ValidationStage::defaults(false))
            .await;
        assert!(report.passed(), "{:?}", report.results);
        assert_eq!(report.results.len(), 3);
        assert!(report.result(ValidationStage::Types).is_none());
    }

    #[tokio::test]
    async fn test_stage_order_ignores_request_order() {
        let validator = CodeValidator::default();
        let report = validator
            .validate(
                "fn main() {}\n",
                "main.rs",
                &[ValidationStage::Types, ValidationStage::Imports, ValidationStage::Syntax],
            )
            .await;
        let stages: Vec<_> = report.results.iter().map(|r| r.stage).collect();
        assert_eq!(
            stages,
            vec![ValidationStage::Syntax, ValidationStage::Imports, ValidationStage::Types]
        );
        // no type checker configured
        assert!(report.result(ValidationStage::Types).unwrap().skipped);
    }

    #[tokio::test]
    async fn test_unclosed_bracket_is_repaired() {
        let validator = CodeValidator::default();
        let content = "fn main() {\n    let v = vec![1, 2];\n";
        let report = validator
            .validate(content, "main.rs", &[ValidationStage::Syntax])
            .await;
        let syntax = report.result(ValidationStage::Syntax).unwrap();
        assert!(syntax.passed);
        assert!(syntax.auto_fixable);
        let fixed = report.fixed_content().unwrap();
        assert!(fixed.trim_end().ends_with('}'));
    }

    #[tokio::test]
    async fn test_unrepairable_error_reports_location_and_hint() {
        let validator = CodeValidator::default();
        let content = "def f():\n    return (1, 2]\n";
        let report = validator
            .validate(content, "f.py", &ValidationStage::defaults(false))
            .await;
        assert!(!report.syntax_passed());
        let syntax = report.result(ValidationStage::Syntax).unwrap();
        let issue = &syntax.errors[0];
        assert_eq!(issue.line, 2);
        assert!(!issue.context_lines.is_empty());
        assert_eq!(issue.fix_hint, Some(FixHint::UnclosedBracket));
        // later stages are not run on unparseable content
        assert!(report.result(ValidationStage::Imports).unwrap().skipped);
        assert!(report.first_failure().unwrap().starts_with("syntax check failed"));
    }

    #[tokio::test]
    async fn test_formatting_supplies_fix() {
        let validator = CodeValidator::default();
        let report = validator
            .validate("x = 1   \r\n", "a.py", &[ValidationStage::Formatting])
            .await;
        let formatting = report.result(ValidationStage::Formatting).unwrap();
        assert!(!formatting.passed);
        assert_eq!(formatting.fixed_content.as_deref(), Some("x = 1\n"));
    }

    #[tokio::test]
    async fn test_types_failure_parses_locations() {
        let validator = CodeValidator::default().with_type_checker(Arc::new(FailingTypes));
        let report = validator
            .validate("x: int = 'a'\n", "app.py", &[ValidationStage::Types])
            .await;
        let types = report.result(ValidationStage::Types).unwrap();
        assert!(!types.passed);
        assert_eq!((types.errors[0].line, types.errors[0].column), (3, 5));
    }

    #[tokio::test]
    async fn test_unknown_language_is_skipped() {
        let validator = CodeValidator::default();
        let report = validator
            .validate("whatever", "notes.txt", &[ValidationStage::Syntax])
            .await;
        assert!(report.result(ValidationStage::Syntax).unwrap().skipped);
        assert!(report.passed());
    }
}
