//! Project type detection and the default commands per language.

use ratchet_domain::Language;
use std::path::Path;

/// Build system found at the workspace root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectType {
    Rust,
    Node,
    Python,
    Go,
    Unknown,
}

impl ProjectType {
    pub fn detect(root: &Path) -> Self {
        if root.join("Cargo.toml").exists() {
            ProjectType::Rust
        } else if root.join("package.json").exists() {
            ProjectType::Node
        } else if root.join("pyproject.toml").exists()
            || root.join("setup.py").exists()
            || root.join("requirements.txt").exists()
        {
            ProjectType::Python
        } else if root.join("go.mod").exists() {
            ProjectType::Go
        } else {
            ProjectType::Unknown
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ProjectType::Rust => "Rust",
            ProjectType::Node => "Node.js",
            ProjectType::Python => "Python",
            ProjectType::Go => "Go",
            ProjectType::Unknown => "Unknown",
        }
    }
}

/// A program plus arguments; `{file}` in an argument is replaced with the
/// checked path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: &str, args: &[&str]) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// Parse a whitespace-separated template such as `ruff check {file}`.
    pub fn parse(template: &str) -> Option<Self> {
        let mut parts = template.split_whitespace();
        let program = parts.next()?.to_string();
        Some(Self {
            program,
            args: parts.map(String::from).collect(),
        })
    }

    /// Substitute `{file}` with one path and `{files}` with all of them.
    pub fn render(&self, files: &[String]) -> Vec<String> {
        let mut args = Vec::with_capacity(self.args.len() + files.len());
        for arg in &self.args {
            match arg.as_str() {
                "{files}" => args.extend(files.iter().cloned()),
                _ if arg.contains("{file}") => {
                    let first = files.first().map(String::as_str).unwrap_or_default();
                    args.push(arg.replace("{file}", first));
                }
                _ => args.push(arg.clone()),
            }
        }
        args
    }

    pub fn display(&self, files: &[String]) -> String {
        std::iter::once(self.program.clone())
            .chain(self.render(files))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(windows)]
const NULL_DEVICE: &str = "NUL";
#[cfg(not(windows))]
const NULL_DEVICE: &str = "/dev/null";

pub fn default_lint(language: Language, project: ProjectType) -> Option<CommandSpec> {
    match language {
        Language::Rust if project == ProjectType::Rust => Some(CommandSpec::new(
            "cargo",
            &["clippy", "--quiet", "--message-format=short"],
        )),
        Language::Python => Some(CommandSpec::new("ruff", &["check", "--quiet", "{file}"])),
        Language::JavaScript | Language::TypeScript | Language::Tsx => {
            Some(CommandSpec::new("eslint", &["{file}"]))
        }
        Language::Go => Some(CommandSpec::new("go", &["vet", "{file}"])),
        _ => None,
    }
}

/// Type checkers that accept a single file. Rust and Go check the whole
/// project from disk.
pub fn default_type_check(language: Language, project: ProjectType) -> Option<CommandSpec> {
    match language {
        Language::Rust if project == ProjectType::Rust => Some(CommandSpec::new(
            "cargo",
            &["check", "--quiet", "--message-format=short"],
        )),
        Language::Python => Some(CommandSpec::new("mypy", &["--no-error-summary", "{file}"])),
        Language::TypeScript | Language::Tsx => {
            Some(CommandSpec::new("tsc", &["--noEmit", "--pretty", "false", "{file}"]))
        }
        Language::Go if project == ProjectType::Go => {
            Some(CommandSpec::new("go", &["build", "-o", NULL_DEVICE, "./..."]))
        }
        _ => None,
    }
}

/// Whether a default type check reads the project from disk rather than the
/// file given to it.
pub fn checks_whole_project(language: Language) -> bool {
    matches!(language, Language::Rust | Language::Go)
}

pub fn default_tests(project: ProjectType) -> Option<CommandSpec> {
    match project {
        ProjectType::Rust => Some(CommandSpec::new("cargo", &["test", "--quiet"])),
        ProjectType::Node => Some(CommandSpec::new("npm", &["test", "--silent"])),
        ProjectType::Python => Some(CommandSpec::new("pytest", &["-q", "{files}"])),
        ProjectType::Go => Some(CommandSpec::new("go", &["test", "{files}"])),
        ProjectType::Unknown => None,
    }
}

/// Test targets covering the changed files.
///
/// Python maps each module to its `test_<stem>.py` / `<stem>_test.py`
/// siblings or `tests/` counterpart; Go maps files to their package
/// directories. Other projects run their whole suite, so the list is empty.
pub fn affected_targets(root: &Path, project: ProjectType, changed: &[String]) -> Vec<String> {
    let mut targets: Vec<String> = Vec::new();
    match project {
        ProjectType::Python => {
            for file in changed.iter().filter(|f| f.ends_with(".py")) {
                let path = Path::new(file);
                let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
                if stem.starts_with("test_") || stem.ends_with("_test") {
                    targets.push(file.clone());
                    continue;
                }
                let dir = path.parent().unwrap_or_else(|| Path::new(""));
                let candidates = [
                    dir.join(format!("test_{}.py", stem)),
                    dir.join(format!("{}_test.py", stem)),
                    Path::new("tests").join(format!("test_{}.py", stem)),
                ];
                targets.extend(
                    candidates
                        .iter()
                        .filter(|c| root.join(c).exists())
                        .map(|c| c.to_string_lossy().into_owned()),
                );
            }
        }
        ProjectType::Go => {
            for file in changed.iter().filter(|f| f.ends_with(".go")) {
                let dir = Path::new(file)
                    .parent()
                    .map(|p| p.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let dir = if dir.is_empty() {
                    ".".to_string()
                } else {
                    format!("./{}", dir)
                };
                targets.push(dir);
            }
        }
        _ => {}
    }
    targets.sort();
    targets.dedup();
    targets
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_detect_project_type() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(ProjectType::detect(dir.path()), ProjectType::Unknown);
        fs::write(dir.path().join("go.mod"), "module x").unwrap();
        assert_eq!(ProjectType::detect(dir.path()), ProjectType::Go);
        fs::write(dir.path().join("Cargo.toml"), "").unwrap();
        assert_eq!(ProjectType::detect(dir.path()), ProjectType::Rust);
    }

    #[test]
    fn test_template_render() {
        let spec = CommandSpec::parse("ruff check --select=E {file}").unwrap();
        assert_eq!(spec.program, "ruff");
        assert_eq!(
            spec.render(&["a.py".to_string()]),
            vec!["check", "--select=E", "a.py"]
        );
        let spec = CommandSpec::new("pytest", &["-q", "{files}"]);
        assert_eq!(
            spec.display(&["t1.py".to_string(), "t2.py".to_string()]),
            "pytest -q t1.py t2.py"
        );
        assert!(CommandSpec::parse("   ").is_none());
    }

    #[test]
    fn test_python_affected_targets() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("tests")).unwrap();
        fs::create_dir_all(dir.path().join("pkg")).unwrap();
        fs::write(dir.path().join("tests/test_util.py"), "").unwrap();
        fs::write(dir.path().join("pkg/test_core.py"), "").unwrap();

        let changed = vec![
            "pkg/util.py".to_string(),
            "pkg/core.py".to_string(),
            "pkg/test_core.py".to_string(),
            "README.md".to_string(),
        ];
        let targets = affected_targets(dir.path(), ProjectType::Python, &changed);
        assert_eq!(targets, vec!["pkg/test_core.py", "tests/test_util.py"]);
    }

    #[test]
    fn test_go_targets_are_packages() {
        let dir = tempfile::tempdir().unwrap();
        let changed = vec!["cmd/main.go".to_string(), "cmd/flags.go".to_string(), "lib.go".to_string()];
        assert_eq!(
            affected_targets(dir.path(), ProjectType::Go, &changed),
            vec![".", "./cmd"]
        );
    }
}
