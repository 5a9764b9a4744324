//! Toolchain ports: type checker, linter and test runner.
//!
//! Each check reports [`CheckRun::Unavailable`] when its tool is not
//! installed; callers turn that into a skipped result rather than a failure.

use async_trait::async_trait;
use ratchet_domain::Language;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckRun {
    Passed,
    Failed { summary: String, details: Vec<String> },
    Unavailable(String),
}

impl CheckRun {
    pub fn failed(summary: impl Into<String>, details: Vec<String>) -> Self {
        CheckRun::Failed {
            summary: summary.into(),
            details,
        }
    }
}

#[async_trait]
pub trait TypeChecker: Send + Sync {
    /// Type-check `content`, which will be stored at `path`.
    async fn check_types(&self, path: &str, content: &str, language: Language) -> CheckRun;
}

#[async_trait]
pub trait Linter: Send + Sync {
    async fn lint(&self, path: &str, language: Language) -> CheckRun;
}

#[async_trait]
pub trait TestRunner: Send + Sync {
    /// Run the tests affected by the changed files.
    async fn run_affected(&self, changed_files: &[String]) -> CheckRun;
}

/// Toolchain with no tools installed.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoToolchain;

const NOT_CONFIGURED: &str = "no toolchain configured";

#[async_trait]
impl TypeChecker for NoToolchain {
    async fn check_types(&self, _path: &str, _content: &str, _language: Language) -> CheckRun {
        CheckRun::Unavailable(NOT_CONFIGURED.to_string())
    }
}

#[async_trait]
impl Linter for NoToolchain {
    async fn lint(&self, _path: &str, _language: Language) -> CheckRun {
        CheckRun::Unavailable(NOT_CONFIGURED.to_string())
    }
}

#[async_trait]
impl TestRunner for NoToolchain {
    async fn run_affected(&self, _changed_files: &[String]) -> CheckRun {
        CheckRun::Unavailable(NOT_CONFIGURED.to_string())
    }
}
