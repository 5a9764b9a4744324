//! Tree-sitter based [`SyntaxParser`].
//!
//! Source languages are parsed with tree-sitter grammars; JSON and TOML go
//! through their serde parsers. The first `ERROR` or `MISSING` node in
//! document order becomes the diagnostic.

use ratchet_application::{ParseCheck, SyntaxParser};
use ratchet_domain::validation::structural_check;
use ratchet_domain::{FixHint, Language, SyntaxDiagnostic};
use std::cell::RefCell;
use tree_sitter::{Node, Parser, Tree};

// One parser per grammar per thread; parsers are reusable but not Sync.
thread_local! {
    static RUST_PARSER: RefCell<Parser> = RefCell::new(parser_for(&tree_sitter_rust::LANGUAGE.into()));
    static PYTHON_PARSER: RefCell<Parser> = RefCell::new(parser_for(&tree_sitter_python::LANGUAGE.into()));
    static JS_PARSER: RefCell<Parser> = RefCell::new(parser_for(&tree_sitter_javascript::LANGUAGE.into()));
    static TS_PARSER: RefCell<Parser> =
        RefCell::new(parser_for(&tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into()));
    static TSX_PARSER: RefCell<Parser> =
        RefCell::new(parser_for(&tree_sitter_typescript::LANGUAGE_TSX.into()));
    static GO_PARSER: RefCell<Parser> = RefCell::new(parser_for(&tree_sitter_go::LANGUAGE.into()));
}

fn parser_for(language: &tree_sitter::Language) -> Parser {
    let mut parser = Parser::new();
    // A grammar/ABI mismatch leaves the parser without a language and
    // `parse` then returns None, which is reported as unsupported.
    let _ = parser.set_language(language);
    parser
}

fn parse(content: &str, language: Language) -> Option<Tree> {
    let run = |cell: &RefCell<Parser>| cell.borrow_mut().parse(content, None);
    match language {
        Language::Rust => RUST_PARSER.with(run),
        Language::Python => PYTHON_PARSER.with(run),
        Language::JavaScript => JS_PARSER.with(run),
        Language::TypeScript => TS_PARSER.with(run),
        Language::Tsx => TSX_PARSER.with(run),
        Language::Go => GO_PARSER.with(run),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TreeSitterParser;

impl TreeSitterParser {
    pub fn new() -> Self {
        Self
    }
}

impl SyntaxParser for TreeSitterParser {
    fn check(&self, content: &str, language: Language) -> ParseCheck {
        match language {
            Language::Json => check_json(content),
            Language::Toml => check_toml(content),
            Language::Markdown | Language::Unknown => ParseCheck::Unsupported,
            _ => match parse(content, language) {
                Some(tree) if !tree.root_node().has_error() => ParseCheck::Valid,
                Some(tree) => ParseCheck::Invalid(diagnose(&tree, content, language)),
                None => ParseCheck::Unsupported,
            },
        }
    }
}

/// First error or missing node, depth first, skipping error-free subtrees.
fn first_error(root: Node<'_>) -> Option<Node<'_>> {
    let mut cursor = root.walk();
    loop {
        let node = cursor.node();
        if node.is_error() || node.is_missing() {
            return Some(node);
        }
        if node.has_error() && cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return None;
            }
        }
    }
}

fn diagnose(tree: &Tree, content: &str, language: Language) -> SyntaxDiagnostic {
    let root = tree.root_node();
    let Some(node) = first_error(root) else {
        return SyntaxDiagnostic::new(1, 1, "file does not parse", FixHint::Other);
    };

    let start = node.start_position();
    let line = start.row + 1;
    let column = char_column(content, node.start_byte());

    let (message, mut hint) = if node.is_missing() {
        let kind = node.kind();
        (format!("missing `{}`", kind), hint_for_missing(kind))
    } else {
        let text = node
            .utf8_text(content.as_bytes())
            .unwrap_or_default()
            .lines()
            .next()
            .unwrap_or_default()
            .trim();
        let snippet: String = text.chars().take(40).collect();
        if snippet.is_empty() {
            ("unexpected end of input".to_string(), FixHint::MissingBlockTerminator)
        } else {
            (format!("unexpected `{}`", snippet), FixHint::Other)
        }
    };

    // The scanner names bracket and string problems more precisely.
    if hint == FixHint::Other
        && let Some(structural) = structural_check(content, language)
    {
        hint = structural.hint;
    }

    SyntaxDiagnostic::new(line, column, message, hint)
}

fn hint_for_missing(kind: &str) -> FixHint {
    match kind {
        ")" | "]" | "}" | ">" => FixHint::UnclosedBracket,
        "\"" | "'" | "`" => FixHint::UnterminatedString,
        ";" | "end" | ":" => FixHint::MissingBlockTerminator,
        _ => FixHint::Other,
    }
}

/// 1-based character column of a byte offset.
fn char_column(content: &str, byte: usize) -> usize {
    let byte = byte.min(content.len());
    let line_start = content[..byte].rfind('\n').map(|i| i + 1).unwrap_or(0);
    content
        .get(line_start..byte)
        .map(|s| s.chars().count())
        .unwrap_or(0)
        + 1
}

fn check_json(content: &str) -> ParseCheck {
    match serde_json::from_str::<serde_json::Value>(content) {
        Ok(_) => ParseCheck::Valid,
        Err(e) => {
            let hint = if e.is_eof() {
                FixHint::UnclosedBracket
            } else {
                FixHint::Other
            };
            ParseCheck::Invalid(SyntaxDiagnostic::new(
                e.line().max(1),
                e.column().max(1),
                e.to_string(),
                hint,
            ))
        }
    }
}

fn check_toml(content: &str) -> ParseCheck {
    match toml::from_str::<toml::Table>(content) {
        Ok(_) => ParseCheck::Valid,
        Err(e) => {
            let (line, column) = match e.span() {
                Some(span) => {
                    let start = span.start.min(content.len());
                    let line = content[..start].matches('\n').count() + 1;
                    (line, char_column(content, start))
                }
                None => (1, 1),
            };
            let message = e.message().to_string();
            ParseCheck::Invalid(SyntaxDiagnostic::new(line, column, message, FixHint::Other))
        }
    }
}
