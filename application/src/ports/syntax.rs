//! Syntax parser port
//!
//! The code validator asks a [`SyntaxParser`] whether content parses. The
//! infrastructure layer provides a tree-sitter adapter; [`StructuralParser`]
//! is the built-in fallback that only checks structure (brackets, literals,
//! comments and Python blocks).

use ratchet_domain::validation::structural_check;
use ratchet_domain::{Language, SyntaxDiagnostic};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseCheck {
    Valid,
    Invalid(SyntaxDiagnostic),
    /// The parser has no grammar for this language.
    Unsupported,
}

pub trait SyntaxParser: Send + Sync {
    fn check(&self, content: &str, language: Language) -> ParseCheck;
}

/// Structure-only parser for every checkable language.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuralParser;

impl SyntaxParser for StructuralParser {
    fn check(&self, content: &str, language: Language) -> ParseCheck {
        if !language.is_checkable() {
            return ParseCheck::Unsupported;
        }
        match structural_check(content, language) {
            Some(diagnostic) => ParseCheck::Invalid(diagnostic),
            None => ParseCheck::Valid,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structural_parser() {
        let parser = StructuralParser;
        assert_eq!(parser.check("fn a() {}\n", Language::Rust), ParseCheck::Valid);
        assert!(matches!(
            parser.check("fn a() {\n", Language::Rust),
            ParseCheck::Invalid(_)
        ));
        assert_eq!(parser.check("anything", Language::Unknown), ParseCheck::Unsupported);
    }
}
