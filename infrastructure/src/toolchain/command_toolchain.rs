//! Lint, type check and test runs through external commands.

use super::project::{
    CommandSpec, ProjectType, affected_targets, checks_whole_project, default_lint, default_tests,
    default_type_check,
};
use crate::process::{self, ProcessError, ProcessOutput};
use async_trait::async_trait;
use ratchet_application::{CheckRun, Linter, TestRunner, TypeChecker};
use ratchet_domain::Language;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);
const MAX_DETAIL_LINES: usize = 20;

/// Toolchain that shells out to the linters, type checkers and test runners
/// installed on the machine, located with `which`.
///
/// Commands default per language and project type; configured templates
/// replace them check by check.
#[derive(Debug, Clone)]
pub struct CommandToolchain {
    root: PathBuf,
    project: ProjectType,
    timeout: Duration,
    lint_command: Option<CommandSpec>,
    type_command: Option<CommandSpec>,
    test_command: Option<CommandSpec>,
}

impl CommandToolchain {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let project = ProjectType::detect(&root);
        debug!(root = %root.display(), project = project.name(), "Detected project type");
        Self {
            root,
            project,
            timeout: DEFAULT_TIMEOUT,
            lint_command: None,
            type_command: None,
            test_command: None,
        }
    }

    // ==================== Builder Methods ====================

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_lint_command(mut self, template: Option<&str>) -> Self {
        self.lint_command = template.and_then(CommandSpec::parse);
        self
    }

    pub fn with_type_command(mut self, template: Option<&str>) -> Self {
        self.type_command = template.and_then(CommandSpec::parse);
        self
    }

    pub fn with_test_command(mut self, template: Option<&str>) -> Self {
        self.test_command = template.and_then(CommandSpec::parse);
        self
    }

    // ==================== Accessors ====================

    pub fn project(&self) -> ProjectType {
        self.project
    }

    async fn run_spec(&self, spec: &CommandSpec, files: &[String]) -> CheckRun {
        if which::which(&spec.program).is_err() {
            return CheckRun::Unavailable(format!("{} not found on PATH", spec.program));
        }
        let shown = spec.display(files);
        debug!(command = %shown, "Running check");
        match process::run(&spec.program, &spec.render(files), &self.root, self.timeout).await {
            Ok(output) => to_check_run(&shown, &output),
            Err(e @ ProcessError::Timeout { .. }) => {
                warn!(command = %shown, "Check timed out");
                CheckRun::Unavailable(e.to_string())
            }
            Err(e) => CheckRun::Unavailable(e.to_string()),
        }
    }

    async fn disk_matches(&self, path: &str, content: &str) -> bool {
        match tokio::fs::read_to_string(self.root.join(path)).await {
            Ok(on_disk) => on_disk == content,
            Err(_) => false,
        }
    }
}

fn to_check_run(display: &str, output: &ProcessOutput) -> CheckRun {
    if output.success() {
        return CheckRun::Passed;
    }
    CheckRun::failed(
        format!("`{}` exited with code {}", display, output.exit_code),
        detail_lines(&output.output),
    )
}

/// Lines that look like diagnostics, or the tail of the output when none do.
fn detail_lines(output: &str) -> Vec<String> {
    let lines: Vec<&str> = output.lines().filter(|l| !l.trim().is_empty()).collect();
    let marked: Vec<String> = lines
        .iter()
        .filter(|l| {
            let lower = l.to_ascii_lowercase();
            lower.contains("error") || lower.contains("failed") || lower.contains("warning")
        })
        .take(MAX_DETAIL_LINES)
        .map(|l| l.trim_end().to_string())
        .collect();
    if !marked.is_empty() {
        return marked;
    }
    let start = lines.len().saturating_sub(MAX_DETAIL_LINES);
    lines[start..].iter().map(|l| l.trim_end().to_string()).collect()
}

fn extension_suffix(path: &str) -> String {
    Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e))
        .unwrap_or_default()
}

#[async_trait]
impl Linter for CommandToolchain {
    async fn lint(&self, path: &str, language: Language) -> CheckRun {
        let Some(spec) = self
            .lint_command
            .clone()
            .or_else(|| default_lint(language, self.project))
        else {
            return CheckRun::Unavailable(format!("no linter for {}", language.as_str()));
        };
        self.run_spec(&spec, &[path.to_string()]).await
    }
}

#[async_trait]
impl TypeChecker for CommandToolchain {
    async fn check_types(&self, path: &str, content: &str, language: Language) -> CheckRun {
        let configured = self.type_command.is_some();
        let Some(spec) = self
            .type_command
            .clone()
            .or_else(|| default_type_check(language, self.project))
        else {
            return CheckRun::Unavailable(format!("no type checker for {}", language.as_str()));
        };

        if self.disk_matches(path, content).await {
            return self.run_spec(&spec, &[path.to_string()]).await;
        }
        if !configured && checks_whole_project(language) {
            return CheckRun::Unavailable(format!(
                "{} type checks read the project from disk; write {} first",
                language.as_str(),
                path
            ));
        }

        // Check the proposed content from a scratch file with the same extension.
        let scratch = tempfile::Builder::new()
            .prefix("ratchet-check-")
            .suffix(&extension_suffix(path))
            .tempfile();
        let scratch = match scratch {
            Ok(file) => file,
            Err(e) => return CheckRun::Unavailable(format!("scratch file: {}", e)),
        };
        if let Err(e) = tokio::fs::write(scratch.path(), content).await {
            return CheckRun::Unavailable(format!("scratch file: {}", e));
        }
        let scratch_path = scratch.path().to_string_lossy().into_owned();
        self.run_spec(&spec, &[scratch_path]).await
    }
}

#[async_trait]
impl TestRunner for CommandToolchain {
    async fn run_affected(&self, changed_files: &[String]) -> CheckRun {
        let Some(spec) = self
            .test_command
            .clone()
            .or_else(|| default_tests(self.project))
        else {
            return CheckRun::Unavailable("no test runner detected".to_string());
        };

        let wants_targets = spec.args.iter().any(|a| a == "{files}");
        let targets = if self.test_command.is_some() {
            changed_files.to_vec()
        } else {
            affected_targets(&self.root, self.project, changed_files)
        };
        if wants_targets && targets.is_empty() {
            return CheckRun::Unavailable("no tests cover the changed files".to_string());
        }
        self.run_spec(&spec, &targets).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detail_lines_prefer_diagnostics() {
        let output = "compiling\nsrc/a.rs:3: error: bad\nok\nwarning: unused\n";
        assert_eq!(
            detail_lines(output),
            vec!["src/a.rs:3: error: bad", "warning: unused"]
        );

        let output = (0..30).map(|i| format!("line {}", i)).collect::<Vec<_>>().join("\n");
        let details = detail_lines(&output);
        assert_eq!(details.len(), MAX_DETAIL_LINES);
        assert_eq!(details.last().unwrap(), "line 29");
    }

    #[tokio::test]
    async fn test_configured_commands_run_in_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("ok.txt"), "fine").unwrap();
        let toolchain = CommandToolchain::new(dir.path())
            .with_lint_command(Some("test -s {file}"))
            .with_test_command(Some("false"));

        assert_eq!(toolchain.lint("ok.txt", Language::Unknown).await, CheckRun::Passed);
        assert!(matches!(
            toolchain.lint("missing.txt", Language::Unknown).await,
            CheckRun::Failed { .. }
        ));
        match toolchain.run_affected(&["ok.txt".to_string()]).await {
            CheckRun::Failed { summary, .. } => assert!(summary.contains("`false`")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_type_check_uses_scratch_file_for_unsaved_content() {
        let dir = tempfile::tempdir().unwrap();
        let toolchain = CommandToolchain::new(dir.path()).with_type_command(Some("grep -q valid {file}"));

        // content differs from disk, so the scratch copy is checked
        assert_eq!(
            toolchain.check_types("mod.py", "valid = 1\n", Language::Python).await,
            CheckRun::Passed
        );
        assert!(matches!(
            toolchain.check_types("mod.py", "broken = 1\n", Language::Python).await,
            CheckRun::Failed { .. }
        ));
    }

    #[tokio::test]
    async fn test_missing_tools_are_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let toolchain = CommandToolchain::new(dir.path())
            .with_lint_command(Some("definitely-not-a-linter {file}"));
        assert!(matches!(
            toolchain.lint("a.py", Language::Python).await,
            CheckRun::Unavailable(_)
        ));
        // unknown project: no default test runner
        assert!(matches!(
            CommandToolchain::new(dir.path()).run_affected(&[]).await,
            CheckRun::Unavailable(_)
        ));
        assert!(matches!(
            CommandToolchain::new(dir.path())
                .check_types("notes.md", "# hi", Language::Markdown)
                .await,
            CheckRun::Unavailable(_)
        ));
    }
}
