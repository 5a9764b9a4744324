//! Tool domain entities

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Identifier of a tool the agent can invoke.
///
/// The built-in kinds form a closed set so that dispatch is a map lookup
/// rather than string matching. `Custom` covers tools registered at startup
/// by the embedding application.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    ReadFile,
    WriteFile,
    EditFile,
    DeleteFile,
    ListDirectory,
    SearchFiles,
    RunCommand,
    RunTests,
    Custom(String),
}

/// What a tool does to the workspace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolCategory {
    /// Observes the workspace without changing it
    Read,
    /// Mutates a file; checkpointed before execution
    Write,
    /// Runs an external process
    Execute,
}

/// Alias → kind table. Models frequently use shell-ish names for the
/// built-in tools; these are resolved when an action is parsed.
const ALIASES: &[(&str, ToolKind)] = &[
    ("read", ToolKind::ReadFile),
    ("cat", ToolKind::ReadFile),
    ("view", ToolKind::ReadFile),
    ("open_file", ToolKind::ReadFile),
    ("write", ToolKind::WriteFile),
    ("create_file", ToolKind::WriteFile),
    ("edit", ToolKind::EditFile),
    ("str_replace", ToolKind::EditFile),
    ("replace_in_file", ToolKind::EditFile),
    ("delete", ToolKind::DeleteFile),
    ("rm", ToolKind::DeleteFile),
    ("remove_file", ToolKind::DeleteFile),
    ("ls", ToolKind::ListDirectory),
    ("list_dir", ToolKind::ListDirectory),
    ("list_files", ToolKind::ListDirectory),
    ("grep", ToolKind::SearchFiles),
    ("rg", ToolKind::SearchFiles),
    ("search", ToolKind::SearchFiles),
    ("grep_search", ToolKind::SearchFiles),
    ("bash", ToolKind::RunCommand),
    ("shell", ToolKind::RunCommand),
    ("exec", ToolKind::RunCommand),
    ("execute_command", ToolKind::RunCommand),
    ("test", ToolKind::RunTests),
    ("pytest", ToolKind::RunTests),
];

impl ToolKind {
    /// Every built-in kind, in a stable order.
    pub const BUILTIN: [ToolKind; 8] = [
        ToolKind::ReadFile,
        ToolKind::WriteFile,
        ToolKind::EditFile,
        ToolKind::DeleteFile,
        ToolKind::ListDirectory,
        ToolKind::SearchFiles,
        ToolKind::RunCommand,
        ToolKind::RunTests,
    ];

    /// Canonical name used on the wire and in logs.
    pub fn name(&self) -> &str {
        match self {
            ToolKind::ReadFile => "read_file",
            ToolKind::WriteFile => "write_file",
            ToolKind::EditFile => "edit_file",
            ToolKind::DeleteFile => "delete_file",
            ToolKind::ListDirectory => "list_directory",
            ToolKind::SearchFiles => "search_files",
            ToolKind::RunCommand => "run_command",
            ToolKind::RunTests => "run_tests",
            ToolKind::Custom(name) => name,
        }
    }

    /// Resolve a name emitted by a model: canonical names first, then
    /// aliases, otherwise a custom tool.
    pub fn parse(name: &str) -> ToolKind {
        let normalized = name.trim().to_ascii_lowercase().replace(['-', '.'], "_");
        if let Some(kind) = Self::BUILTIN.iter().find(|k| k.name() == normalized) {
            return kind.clone();
        }
        if let Some((_, kind)) = ALIASES.iter().find(|(alias, _)| *alias == normalized) {
            return kind.clone();
        }
        ToolKind::Custom(name.trim().to_string())
    }

    pub fn category(&self) -> ToolCategory {
        match self {
            ToolKind::ReadFile | ToolKind::ListDirectory | ToolKind::SearchFiles => {
                ToolCategory::Read
            }
            ToolKind::WriteFile | ToolKind::EditFile | ToolKind::DeleteFile => ToolCategory::Write,
            ToolKind::RunCommand | ToolKind::RunTests | ToolKind::Custom(_) => {
                ToolCategory::Execute
            }
        }
    }

    /// Argument names that must be present for the tool to run.
    pub fn required_args(&self) -> &'static [&'static str] {
        match self {
            ToolKind::ReadFile | ToolKind::DeleteFile => &["path"],
            ToolKind::WriteFile => &["path", "content"],
            ToolKind::EditFile => &["path", "old_text", "new_text"],
            ToolKind::ListDirectory => &[],
            ToolKind::SearchFiles => &["pattern"],
            ToolKind::RunCommand => &["command"],
            ToolKind::RunTests | ToolKind::Custom(_) => &[],
        }
    }

    pub fn is_read(&self) -> bool {
        self.category() == ToolCategory::Read
    }

    pub fn is_write(&self) -> bool {
        self.category() == ToolCategory::Write
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Path argument of a tool call (`path`, `file_path` or `file`).
pub fn path_arg(args: &Map<String, Value>) -> Option<&str> {
    ["path", "file_path", "file"]
        .iter()
        .find_map(|key| args.get(*key).and_then(|v| v.as_str()))
}

/// A call to a tool with arguments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub kind: ToolKind,
    pub args: Map<String, Value>,
}

impl ToolInvocation {
    pub fn new(kind: ToolKind) -> Self {
        Self {
            kind,
            args: Map::new(),
        }
    }

    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.args.insert(key.into(), value.into());
        self
    }

    /// Get a string argument
    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.args.get(key).and_then(|v| v.as_str())
    }

    /// Get a required string argument or return an error message
    pub fn require_string(&self, key: &str) -> Result<&str, String> {
        self.get_string(key)
            .ok_or_else(|| format!("Missing required argument: {}", key))
    }

    /// Get an optional i64 argument
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.args.get(key).and_then(|v| v.as_i64())
    }

    /// Get an optional bool argument
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.args.get(key).and_then(|v| v.as_bool())
    }

    /// The file path this invocation targets, if any.
    pub fn target_path(&self) -> Option<&str> {
        path_arg(&self.args)
    }

    /// Stable `(tool, args)` signature used for repetition detection.
    ///
    /// `serde_json::Map` keeps keys sorted, so identical arguments always
    /// serialize identically.
    pub fn signature(&self) -> String {
        format!("{}:{}", self.kind, Value::Object(self.args.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_canonical_and_alias() {
        assert_eq!(ToolKind::parse("read_file"), ToolKind::ReadFile);
        assert_eq!(ToolKind::parse("Read-File"), ToolKind::ReadFile);
        assert_eq!(ToolKind::parse("cat"), ToolKind::ReadFile);
        assert_eq!(ToolKind::parse("bash"), ToolKind::RunCommand);
        assert_eq!(ToolKind::parse("rg"), ToolKind::SearchFiles);
        assert_eq!(
            ToolKind::parse("deploy_preview"),
            ToolKind::Custom("deploy_preview".to_string())
        );
    }

    #[test]
    fn test_categories() {
        assert!(ToolKind::ReadFile.is_read());
        assert!(ToolKind::SearchFiles.is_read());
        assert!(ToolKind::WriteFile.is_write());
        assert!(ToolKind::EditFile.is_write());
        assert_eq!(ToolKind::RunCommand.category(), ToolCategory::Execute);
        assert_eq!(
            ToolKind::Custom("x".into()).category(),
            ToolCategory::Execute
        );
    }

    #[test]
    fn test_builtin_names_round_trip() {
        for kind in ToolKind::BUILTIN {
            assert_eq!(ToolKind::parse(kind.name()), kind);
        }
    }

    #[test]
    fn test_invocation_accessors() {
        let call = ToolInvocation::new(ToolKind::ReadFile)
            .with_arg("path", "src/main.rs")
            .with_arg("limit", 20);

        assert_eq!(call.get_string("path"), Some("src/main.rs"));
        assert_eq!(call.target_path(), Some("src/main.rs"));
        assert_eq!(call.get_i64("limit"), Some(20));
        assert!(call.require_string("content").is_err());
    }

    #[test]
    fn test_signature_is_order_independent() {
        let a = ToolInvocation::new(ToolKind::RunCommand)
            .with_arg("command", "ls")
            .with_arg("cwd", "/tmp");
        let b = ToolInvocation::new(ToolKind::RunCommand)
            .with_arg("cwd", "/tmp")
            .with_arg("command", "ls");
        assert_eq!(a.signature(), b.signature());
    }
}
