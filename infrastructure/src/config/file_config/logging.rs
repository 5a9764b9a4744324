//! Logging configuration from TOML (`[logging]` section)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where diagnostic logs and agent records are written.
///
/// ```toml
/// [logging]
/// dir = "~/.local/state/ratchet/logs"   # daily-rolling tracing log
/// records = ".ratchet/records.jsonl"    # action records, loop signals, plan steps
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLoggingConfig {
    /// Directory for the rolling log file; console only when unset
    pub dir: Option<String>,
    /// JSONL file receiving persisted agent records; nothing is persisted when unset
    pub records: Option<String>,
}

impl FileLoggingConfig {
    pub fn log_dir(&self) -> Option<PathBuf> {
        self.dir.as_deref().map(expand_home)
    }

    pub fn records_path(&self) -> Option<PathBuf> {
        self.records.as_deref().map(expand_home)
    }
}

fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    PathBuf::from(path)
}
