//! Checkpoint domain module
//!
//! File snapshots taken before every mutation, and the line diff used to
//! preview a proposed change.

pub mod diff;
pub mod entities;

pub use diff::{CONTEXT_LINES, DiffHunk, DiffLine, DiffLineKind, DiffPreview, diff_preview};
pub use entities::{Checkpoint, CheckpointId};
