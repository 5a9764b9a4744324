//! Checkpoint entities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CheckpointId(String);

static CHECKPOINT_COUNTER: AtomicU64 = AtomicU64::new(1);

impl CheckpointId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn generate() -> Self {
        let n = CHECKPOINT_COUNTER.fetch_add(1, Ordering::Relaxed);
        Self(format!(
            "ckpt-{}-{}",
            Utc::now().format("%Y%m%d%H%M%S"),
            n
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CheckpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Snapshot of a set of files.
///
/// `file_contents[i]` belongs to `file_paths[i]`; `None` means the file did
/// not exist, so restoring deletes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub id: CheckpointId,
    pub file_paths: Vec<String>,
    pub file_contents: Vec<Option<Vec<u8>>>,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl Checkpoint {
    pub fn new(description: impl Into<String>, files: Vec<(String, Option<Vec<u8>>)>) -> Self {
        let (file_paths, file_contents) = files.into_iter().unzip();
        Self {
            id: CheckpointId::generate(),
            file_paths,
            file_contents,
            description: description.into(),
            created_at: Utc::now(),
        }
    }

    pub fn files(&self) -> impl Iterator<Item = (&str, Option<&[u8]>)> {
        self.file_paths
            .iter()
            .zip(&self.file_contents)
            .map(|(path, content)| (path.as_str(), content.as_deref()))
    }

    pub fn contains(&self, path: &str) -> bool {
        self.file_paths.iter().any(|p| p == path)
    }

    pub fn total_bytes(&self) -> usize {
        self.file_contents.iter().flatten().map(Vec::len).sum()
    }
}
