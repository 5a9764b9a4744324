//! Configuration value objects for the domain layer
//!
//! These are domain concepts related to configuration that are
//! used across multiple layers.

pub mod issue;
mod output_format;

pub use issue::{ConfigIssue, ConfigIssueCode, Severity};
pub use output_format::OutputFormat;
