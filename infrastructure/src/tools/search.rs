//! search_files: regex search over workspace files

use crate::tools::file::workspace_error;
use crate::workspace::LocalWorkspace;
use async_trait::async_trait;
use glob::Pattern;
use ratchet_application::ToolExecutor;
use ratchet_domain::{ToolError, ToolInvocation, ToolOutcome};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Maximum number of matches to return
const MAX_RESULTS: usize = 1000;

/// Maximum file size searched (5 MB)
const MAX_SEARCH_FILE_SIZE: u64 = 5 * 1024 * 1024;

const SKIPPED_DIRS: [&str; 4] = [".git", "target", "node_modules", "__pycache__"];

struct SearchRequest {
    regex: Regex,
    root: PathBuf,
    file_pattern: Option<Pattern>,
    context_lines: usize,
}

/// Search file contents with a regex.
///
/// Arguments: `pattern` (required), `path` (file or directory, default the
/// workspace root), `file_pattern` (glob on the relative path, e.g. `*.rs`),
/// `context_lines`, `case_insensitive`.
pub struct SearchFilesTool {
    workspace: Arc<LocalWorkspace>,
}

impl SearchFilesTool {
    pub fn new(workspace: Arc<LocalWorkspace>) -> Self {
        Self { workspace }
    }

    fn request(&self, invocation: &ToolInvocation) -> Result<SearchRequest, ToolError> {
        let pattern = invocation
            .require_string("pattern")
            .map_err(ToolError::invalid_argument)?;
        let case_insensitive = invocation.get_bool("case_insensitive").unwrap_or(false);
        let regex_pattern = if case_insensitive {
            format!("(?i){}", pattern)
        } else {
            pattern.to_string()
        };
        let regex = Regex::new(&regex_pattern)
            .map_err(|e| ToolError::invalid_argument(format!("Invalid regex pattern: {}", e)))?;

        let file_pattern = invocation
            .get_string("file_pattern")
            .map(|p| {
                Pattern::new(p).map_err(|e| {
                    ToolError::invalid_argument(format!("Invalid glob pattern: {}", e))
                })
            })
            .transpose()?;

        let rel = invocation.target_path().unwrap_or(".");
        let root = self.workspace.resolve(rel).map_err(workspace_error)?;
        if !root.exists() {
            return Err(ToolError::not_found(rel));
        }

        Ok(SearchRequest {
            regex,
            root,
            file_pattern,
            context_lines: invocation.get_i64("context_lines").unwrap_or(0).max(0) as usize,
        })
    }
}

#[async_trait]
impl ToolExecutor for SearchFilesTool {
    async fn execute(&self, invocation: &ToolInvocation) -> ToolOutcome {
        let request = match self.request(invocation) {
            Ok(r) => r,
            Err(e) => return ToolOutcome::failure(e),
        };
        let workspace = self.workspace.clone();
        match tokio::task::spawn_blocking(move || search(&workspace, &request)).await {
            Ok(output) => ToolOutcome::success(output),
            Err(e) => ToolOutcome::failure(ToolError::execution_failed(format!(
                "search task failed: {}",
                e
            ))),
        }
    }
}

fn search(workspace: &LocalWorkspace, request: &SearchRequest) -> String {
    let files = if request.root.is_file() {
        vec![request.root.clone()]
    } else {
        let mut files = Vec::new();
        collect_files(workspace, &request.root, request.file_pattern.as_ref(), &mut files);
        files.sort();
        files
    };

    let mut results = Vec::new();
    let mut total_matches = 0;

    'files: for file_path in files {
        if fs::metadata(&file_path).is_ok_and(|m| m.len() > MAX_SEARCH_FILE_SIZE) {
            continue;
        }
        let Ok(content) = fs::read_to_string(&file_path) else {
            continue;
        };
        let lines: Vec<&str> = content.lines().collect();
        let display = workspace.relative(&file_path);

        for (idx, line) in lines.iter().enumerate() {
            if !request.regex.is_match(line) {
                continue;
            }
            if total_matches >= MAX_RESULTS {
                break 'files;
            }
            total_matches += 1;

            if request.context_lines == 0 {
                results.push(format!("{}:{}: {}", display, idx + 1, line));
                continue;
            }
            let start = idx.saturating_sub(request.context_lines);
            let end = (idx + request.context_lines + 1).min(lines.len());
            let mut block = format!("{}:", display);
            for (offset, ctx) in lines[start..end].iter().enumerate() {
                let line_no = start + offset;
                let marker = if line_no == idx { ">" } else { " " };
                block.push_str(&format!("\n{}{}: {}", marker, line_no + 1, ctx));
            }
            results.push(block);
        }
    }

    if results.is_empty() {
        return "No matches found".to_string();
    }
    let mut output = results.join("\n");
    if total_matches >= MAX_RESULTS {
        output.push_str(&format!("\n... (limited to {} matches)", MAX_RESULTS));
    }
    output
}

fn collect_files(
    workspace: &LocalWorkspace,
    dir: &Path,
    file_pattern: Option<&Pattern>,
    files: &mut Vec<PathBuf>,
) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        if file_type.is_dir() {
            let skipped = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| SKIPPED_DIRS.contains(&n));
            if !skipped {
                collect_files(workspace, &path, file_pattern, files);
            }
        } else if file_type.is_file() {
            let matches = file_pattern.is_none_or(|p| {
                let rel = workspace.relative(&path);
                let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
                p.matches(&rel) || p.matches(name)
            });
            if matches {
                files.push(path);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratchet_domain::ToolKind;
    use tempfile::TempDir;

    fn setup() -> (TempDir, SearchFilesTool) {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::create_dir_all(dir.path().join("target")).unwrap();
        fs::write(
            dir.path().join("src/lib.rs"),
            "fn alpha() {}\n// TODO tidy\nfn beta() {}\n",
        )
        .unwrap();
        fs::write(dir.path().join("src/notes.md"), "todo: alpha docs\n").unwrap();
        fs::write(dir.path().join("target/out.rs"), "fn alpha() {}\n").unwrap();
        let ws = Arc::new(LocalWorkspace::new(dir.path()).unwrap());
        (dir, SearchFilesTool::new(ws))
    }

    fn call(pattern: &str) -> ToolInvocation {
        ToolInvocation::new(ToolKind::SearchFiles).with_arg("pattern", pattern)
    }

    #[tokio::test]
    async fn test_search_skips_build_dirs() {
        let (_dir, tool) = setup();
        let outcome = tool.execute(&call("alpha")).await;
        assert!(outcome.success);
        assert_eq!(
            outcome.output,
            "src/lib.rs:1: fn alpha() {}\nsrc/notes.md:1: todo: alpha docs"
        );
    }

    #[tokio::test]
    async fn test_file_pattern_and_case_insensitive() {
        let (_dir, tool) = setup();
        let outcome = tool
            .execute(
                &call("todo")
                    .with_arg("case_insensitive", true)
                    .with_arg("file_pattern", "*.rs"),
            )
            .await;
        assert_eq!(outcome.output, "src/lib.rs:2: // TODO tidy");
    }

    #[tokio::test]
    async fn test_context_lines_mark_the_match() {
        let (_dir, tool) = setup();
        let outcome = tool
            .execute(
                &call("TODO")
                    .with_arg("path", "src/lib.rs")
                    .with_arg("context_lines", 1),
            )
            .await;
        assert_eq!(
            outcome.output,
            "src/lib.rs:\n 1: fn alpha() {}\n>2: // TODO tidy\n 3: fn beta() {}"
        );
    }

    #[tokio::test]
    async fn test_invalid_regex_and_missing_path() {
        let (_dir, tool) = setup();
        let bad = tool.execute(&call("(unclosed")).await;
        assert_eq!(bad.error.unwrap().code, "INVALID_ARGUMENT");

        let missing = tool.execute(&call("x").with_arg("path", "nowhere")).await;
        assert_eq!(missing.error.unwrap().code, "NOT_FOUND");

        let none = tool.execute(&call("zzz")).await;
        assert_eq!(none.output, "No matches found");
    }
}
