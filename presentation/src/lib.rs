//! Presentation layer for ratchet
//!
//! This crate contains the CLI definition, console formatters for plans,
//! validation, verification and diffs, and the agent event renderer.

pub mod agent;
pub mod cli;
pub mod output;

// Re-export commonly used types
pub use agent::EventRenderer;
pub use cli::{Cli, Command, DecisionArg};
pub use output::{ConsoleFormatter, SourceLine};
