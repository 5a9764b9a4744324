//! Verify Changes use case (VerificationLoop)
//!
//! Runs the checks of a [`VerificationLevel`] over changed files and folds
//! the results into a [`VerificationSummary`]. Only syntax failures block;
//! lint and type failures are warnings and test failures are deferred.

use crate::ports::toolchain::{CheckRun, Linter, NoToolchain, TestRunner, TypeChecker};
use crate::ports::workspace::WorkspacePort;
use crate::use_cases::validate_code::CodeValidator;
use ratchet_domain::verification::summarize;
use ratchet_domain::{CheckKind, CheckResult, Language, VerificationLevel, VerificationSummary};
use std::sync::Arc;
use tracing::{debug, info};

pub struct VerificationLoop {
    validator: Arc<CodeValidator>,
    workspace: Arc<dyn WorkspacePort>,
    linter: Arc<dyn Linter>,
    test_runner: Arc<dyn TestRunner>,
    type_checker: Arc<dyn TypeChecker>,
}

impl VerificationLoop {
    pub fn new(validator: Arc<CodeValidator>, workspace: Arc<dyn WorkspacePort>) -> Self {
        Self {
            validator,
            workspace,
            linter: Arc::new(NoToolchain),
            test_runner: Arc::new(NoToolchain),
            type_checker: Arc::new(NoToolchain),
        }
    }

    pub fn with_linter(mut self, linter: Arc<dyn Linter>) -> Self {
        self.linter = linter;
        self
    }

    pub fn with_test_runner(mut self, test_runner: Arc<dyn TestRunner>) -> Self {
        self.test_runner = test_runner;
        self
    }

    pub fn with_type_checker(mut self, type_checker: Arc<dyn TypeChecker>) -> Self {
        self.type_checker = type_checker;
        self
    }

    pub async fn verify(&self, changed_files: &[String], level: VerificationLevel) -> Vec<CheckResult> {
        let checks = level.checks();
        let mut results = Vec::new();

        for path in changed_files {
            let target = Some(path.clone());
            let content = match self.workspace.read_text(path).await {
                Ok(Some(content)) => content,
                Ok(None) => {
                    for &kind in checks.iter().filter(|k| **k != CheckKind::UnitTests) {
                        results.push(CheckResult::skipped(kind, target.clone(), "file was deleted"));
                    }
                    continue;
                }
                Err(e) => {
                    results.push(CheckResult::failed(
                        CheckKind::Syntax,
                        target,
                        format!("cannot read file: {}", e),
                        Vec::new(),
                    ));
                    continue;
                }
            };
            let language = Language::from_path(path);

            for &kind in checks {
                let result = match kind {
                    CheckKind::Syntax => self.check_syntax(path, &content, language),
                    CheckKind::Lint => {
                        to_check_result(kind, target.clone(), self.linter.lint(path, language).await)
                    }
                    CheckKind::Types => to_check_result(
                        kind,
                        target.clone(),
                        self.type_checker.check_types(path, &content, language).await,
                    ),
                    CheckKind::UnitTests => continue,
                };
                debug!(path = %path, check = %kind, status = ?result.status, "Check finished");
                results.push(result);
            }
        }

        if checks.contains(&CheckKind::UnitTests) && !changed_files.is_empty() {
            let run = self.test_runner.run_affected(changed_files).await;
            results.push(to_check_result(CheckKind::UnitTests, None, run));
        }

        let summary = summarize(&results);
        info!(
            level = %level,
            files = changed_files.len(),
            blocking = summary.blocking_failures.len(),
            warnings = summary.warnings.len(),
            deferred = summary.deferred.len(),
            "Verification finished"
        );
        results
    }

    /// Verify and summarise in one call.
    pub async fn verify_and_summarize(
        &self,
        changed_files: &[String],
        level: VerificationLevel,
    ) -> (Vec<CheckResult>, VerificationSummary) {
        let results = self.verify(changed_files, level).await;
        let summary = summarize(&results);
        (results, summary)
    }

    fn check_syntax(&self, path: &str, content: &str, language: Language) -> CheckResult {
        let target = Some(path.to_string());
        let result = self.validator.check_syntax(content, language);
        if result.skipped {
            return CheckResult::skipped(
                CheckKind::Syntax,
                target,
                result.skip_reason.unwrap_or_default(),
            );
        }
        if result.passed && result.fixed_content.is_none() {
            return CheckResult::passed(CheckKind::Syntax, target);
        }
        // a repairable file is still broken on disk
        let message = result
            .first_error()
            .unwrap_or_else(|| "syntax error (automatically repairable)".to_string());
        let details = result.errors.iter().flat_map(|e| e.context_lines.clone()).collect();
        CheckResult::failed(CheckKind::Syntax, target, message, details)
    }
}

fn to_check_result(kind: CheckKind, target: Option<String>, run: CheckRun) -> CheckResult {
    match run {
        CheckRun::Passed => CheckResult::passed(kind, target),
        CheckRun::Failed { summary, details } => CheckResult::failed(kind, target, summary, details),
        CheckRun::Unavailable(reason) => CheckResult::skipped(kind, target, reason),
    }
}
