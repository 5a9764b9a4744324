//! Tool domain module
//!
//! Defines how the agent names, invokes and validates tools.
//!
//! ```text
//! model output ──parse──▶ ToolKind ──▶ ToolInvocation ──dispatch──▶ ToolOutcome
//!                 │
//!                 ├─ canonical: "run_command" → ToolKind::RunCommand
//!                 └─ aliases:   "bash"        → ToolKind::RunCommand
//! ```
//!
//! [`ToolKind`] is a closed set of built-in tools plus `Custom(name)`. The
//! application layer's `ToolRegistry` maps kinds to handlers registered at
//! startup, so dispatch is a typed lookup rather than string matching.
//!
//! Each kind has a [`ToolCategory`]: `Write` tools are checkpointed before
//! execution, `Read` tools feed the read-loop detector.

pub mod entities;
pub mod traits;
pub mod value_objects;

pub use entities::{ToolCategory, ToolInvocation, ToolKind};
pub use traits::{DefaultToolValidator, ToolValidator};
pub use value_objects::{ToolError, ToolOutcome};
