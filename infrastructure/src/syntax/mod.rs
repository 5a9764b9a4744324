//! Syntax checking adapter backed by tree-sitter grammars.

mod parser;

pub use parser::TreeSitterParser;
