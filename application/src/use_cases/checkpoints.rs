//! Checkpoint use case (CheckpointStore)
//!
//! Every mutation is preceded by a snapshot. Restoring is all-or-nothing:
//! targets are staged (checked writable) before anything is written, and a
//! write failure part-way reverts the files already restored.

use crate::ports::workspace::{WorkspaceError, WorkspacePort};
use ratchet_domain::checkpoint::diff_preview;
use ratchet_domain::{Checkpoint, CheckpointId, DiffPreview};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CheckpointError {
    #[error("Unknown checkpoint: {0}")]
    UnknownCheckpoint(CheckpointId),

    #[error(transparent)]
    Workspace(#[from] WorkspaceError),

    #[error("Restore failed at {path}: {reason} (earlier files reverted: {reverted})")]
    RestoreFailed {
        path: String,
        reason: String,
        reverted: bool,
    },
}

pub struct CheckpointStore {
    workspace: Arc<dyn WorkspacePort>,
    checkpoints: Mutex<Vec<Checkpoint>>,
}

impl CheckpointStore {
    pub fn new(workspace: Arc<dyn WorkspacePort>) -> Self {
        Self {
            workspace,
            checkpoints: Mutex::new(Vec::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Checkpoint>> {
        self.checkpoints
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Capture the current contents of `paths`. Missing files are recorded
    /// as absent.
    pub async fn snapshot(
        &self,
        paths: &[String],
        description: &str,
    ) -> Result<CheckpointId, CheckpointError> {
        let mut files = Vec::with_capacity(paths.len());
        for path in paths {
            let contents = self.workspace.read(path).await?;
            files.push((path.clone(), contents));
        }
        let checkpoint = Checkpoint::new(description, files);
        let id = checkpoint.id.clone();
        info!(
            checkpoint = %id,
            files = paths.len(),
            bytes = checkpoint.total_bytes(),
            description,
            "Checkpoint created"
        );
        self.lock().push(checkpoint);
        Ok(id)
    }

    /// Diff the file at `path` against proposed contents.
    pub async fn preview(&self, path: &str, proposed: &str) -> Result<DiffPreview, CheckpointError> {
        let current = self.workspace.read_text(path).await?.unwrap_or_default();
        Ok(diff_preview(path, &current, proposed))
    }

    /// Put every file of the checkpoint back as it was and return the
    /// restored paths, in snapshot order.
    pub async fn restore(&self, id: &CheckpointId) -> Result<Vec<String>, CheckpointError> {
        let checkpoint = self
            .get(id)
            .ok_or_else(|| CheckpointError::UnknownCheckpoint(id.clone()))?;

        for path in &checkpoint.file_paths {
            self.workspace.check_writable(path).await?;
        }

        let mut pre_restore = Vec::with_capacity(checkpoint.file_paths.len());
        for path in &checkpoint.file_paths {
            pre_restore.push(self.workspace.read(path).await?);
        }

        for (index, (path, contents)) in checkpoint.files().enumerate() {
            if let Err(e) = self.put(path, contents).await {
                warn!(checkpoint = %id, path, error = %e, "Restore failed, reverting");
                let mut reverted = true;
                for (done, previous) in checkpoint.file_paths[..index].iter().zip(&pre_restore) {
                    if let Err(revert_err) = self.put(done, previous.as_deref()).await {
                        warn!(path = %done, error = %revert_err, "Failed to revert file");
                        reverted = false;
                    }
                }
                return Err(CheckpointError::RestoreFailed {
                    path: path.to_string(),
                    reason: e.to_string(),
                    reverted,
                });
            }
        }
        info!(checkpoint = %id, files = checkpoint.file_paths.len(), "Checkpoint restored");
        Ok(checkpoint.file_paths)
    }

    async fn put(&self, path: &str, contents: Option<&[u8]>) -> Result<(), WorkspaceError> {
        match contents {
            Some(bytes) => self.workspace.write(path, bytes).await,
            None => self.workspace.remove(path).await,
        }
    }

    pub fn get(&self, id: &CheckpointId) -> Option<Checkpoint> {
        self.lock().iter().find(|c| &c.id == id).cloned()
    }

    pub fn latest(&self) -> Option<Checkpoint> {
        self.lock().last().cloned()
    }

    /// Checkpoints, oldest first.
    pub fn list(&self) -> Vec<Checkpoint> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Drop all but the newest `keep_last` checkpoints; returns how many
    /// were removed.
    pub fn prune(&self, keep_last: usize) -> usize {
        let mut checkpoints = self.lock();
        let excess = checkpoints.len().saturating_sub(keep_last);
        checkpoints.drain(..excess);
        excess
    }
}
