//! Code validation domain module
//!
//! Pure checks used by the application's `CodeValidator`:
//!
//! - [`scanner`]: structural lexing (brackets, literals, comments, Python blocks)
//! - [`repair`]: the single bounded repair pass, shared with action parsing
//! - [`formatting`]: whitespace normalisation
//! - [`imports`]: unused / missing import heuristics

pub mod entities;
pub mod formatting;
pub mod imports;
pub mod language;
pub mod repair;
pub mod scanner;

pub use entities::{
    FixHint, SyntaxDiagnostic, ValidationIssue, ValidationResult, ValidationStage, context_lines,
};
pub use formatting::{FormattingReport, check_formatting};
pub use imports::check_imports;
pub use language::Language;
pub use repair::{repair, repair_json};
pub use scanner::structural_check;
