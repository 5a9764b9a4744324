//! Incremental build domain module
//!
//! A file is written as a skeleton of placeholders and then filled one
//! [`CodeSection`] at a time in dependency order, so a bad section can be
//! rolled back without losing the rest.

pub mod placeholder;
pub mod report;
pub mod section;

pub use placeholder::{fill_placeholder, placeholder, skeleton, strip_placeholders};
pub use report::{BuildReport, FailureKind, SectionFailure};
pub use section::{CodeSection, SectionKind, expand_sections, split_section, topological_order};
