//! Structural source scanner.
//!
//! A language-aware lexer that only tracks what matters for structure:
//! brackets, string literals, comments and (for Python) indentation. It is
//! the fallback when no real parser handles a language, it classifies parser
//! errors into [`FixHint`]s, and it drives the repair pass.
//!
//! Scanning stops at the first structural error.

use super::entities::{FixHint, SyntaxDiagnostic};
use super::language::Language;

/// A delimiter occurrence with its position (1-based line/column, byte offset).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delimiter {
    pub ch: char,
    pub line: usize,
    pub column: usize,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanError {
    Mismatch { open: Delimiter, found: Delimiter },
    StrayCloser(Delimiter),
    /// `insert_at` is where the closing sequence belongs: end of the line
    /// for single-line literals, end of input otherwise.
    UnterminatedString {
        start: Delimiter,
        close: String,
        insert_at: usize,
    },
    UnterminatedComment { start: Delimiter },
}

/// Per-line facts gathered while scanning.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineInfo {
    /// The line begins outside any bracket, string or comment.
    pub starts_clean: bool,
    /// The line ends outside any bracket, string or comment.
    pub ends_clean: bool,
    /// The line holds something other than whitespace and comments.
    pub has_code: bool,
    pub last_code: Option<char>,
    pub prev_code: Option<char>,
}

impl LineInfo {
    fn push_code(&mut self, c: char) {
        self.has_code = true;
        self.prev_code = self.last_code;
        self.last_code = Some(c);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// Brackets still open at the end of input (outermost first).
    pub open: Vec<Delimiter>,
    pub error: Option<ScanError>,
    pub lines: Vec<LineInfo>,
}

impl ScanReport {
    pub fn is_balanced(&self) -> bool {
        self.open.is_empty() && self.error.is_none()
    }

    /// Describe the first structural problem, if any.
    pub fn diagnostic(&self) -> Option<SyntaxDiagnostic> {
        if let Some(error) = &self.error {
            return Some(match error {
                ScanError::Mismatch { open, found } => SyntaxDiagnostic::new(
                    found.line,
                    found.column,
                    format!(
                        "mismatched closing '{}': expected '{}' to close '{}' from line {}",
                        found.ch,
                        closer_for(open.ch),
                        open.ch,
                        open.line
                    ),
                    FixHint::UnclosedBracket,
                ),
                ScanError::StrayCloser(d) => SyntaxDiagnostic::new(
                    d.line,
                    d.column,
                    format!("unexpected closing '{}'", d.ch),
                    FixHint::UnclosedBracket,
                ),
                ScanError::UnterminatedString { start, .. } => SyntaxDiagnostic::new(
                    start.line,
                    start.column,
                    "unterminated string literal",
                    FixHint::UnterminatedString,
                ),
                ScanError::UnterminatedComment { start } => SyntaxDiagnostic::new(
                    start.line,
                    start.column,
                    "unterminated block comment",
                    FixHint::MissingBlockTerminator,
                ),
            });
        }
        self.open.last().map(|d| {
            let hint = if d.ch == '{' {
                FixHint::MissingBlockTerminator
            } else {
                FixHint::UnclosedBracket
            };
            SyntaxDiagnostic::new(
                d.line,
                d.column,
                format!("'{}' is never closed", d.ch),
                hint,
            )
        })
    }
}

pub fn closer_for(open: char) -> char {
    match open {
        '(' => ')',
        '[' => ']',
        _ => '}',
    }
}

fn opener_for(close: char) -> char {
    match close {
        ')' => '(',
        ']' => '[',
        _ => '{',
    }
}

enum State {
    Code,
    LineComment,
    BlockComment { depth: usize, start: Delimiter },
    Str {
        close: Vec<char>,
        escapes: bool,
        multiline: bool,
        start: Delimiter,
    },
}

struct StringStart {
    open_len: usize,
    close: Vec<char>,
    escapes: bool,
    multiline: bool,
}

fn char_at(chars: &[(usize, char)], i: usize) -> Option<char> {
    chars.get(i).map(|(_, c)| *c)
}

fn matches_at(chars: &[(usize, char)], i: usize, pattern: &[char]) -> bool {
    pattern
        .iter()
        .enumerate()
        .all(|(k, p)| char_at(chars, i + k) == Some(*p))
}

fn is_ident(c: Option<char>) -> bool {
    c.is_some_and(|c| c.is_alphanumeric() || c == '_')
}

fn string_start(language: Language, chars: &[(usize, char)], i: usize) -> Option<StringStart> {
    let c = char_at(chars, i)?;
    let triple_quoted = matches!(language, Language::Python | Language::Toml);
    match c {
        '"' | '\'' if triple_quoted && matches_at(chars, i, &[c, c, c]) => Some(StringStart {
            open_len: 3,
            close: vec![c, c, c],
            escapes: language == Language::Python || c == '"',
            multiline: true,
        }),
        '"' => Some(StringStart {
            open_len: 1,
            close: vec!['"'],
            escapes: true,
            multiline: language == Language::Rust,
        }),
        '\''
            if matches!(language, Language::Python | Language::Go | Language::Toml)
                || language.is_js_like() =>
        {
            Some(StringStart {
                open_len: 1,
                close: vec!['\''],
                escapes: language != Language::Toml,
                multiline: false,
            })
        }
        '`' if language == Language::Go || language.is_js_like() => Some(StringStart {
            open_len: 1,
            close: vec!['`'],
            escapes: language != Language::Go,
            multiline: true,
        }),
        'r' if language == Language::Rust => {
            let prev = i.checked_sub(1).and_then(|p| char_at(chars, p));
            let byte_prefix = prev == Some('b')
                && !is_ident(i.checked_sub(2).and_then(|p| char_at(chars, p)));
            if is_ident(prev) && !byte_prefix {
                return None;
            }
            let mut j = i + 1;
            while char_at(chars, j) == Some('#') {
                j += 1;
            }
            if char_at(chars, j) != Some('"') {
                return None;
            }
            let hashes = j - i - 1;
            let mut close = vec!['"'];
            close.extend(std::iter::repeat_n('#', hashes));
            Some(StringStart {
                open_len: hashes + 2,
                close,
                escapes: false,
                multiline: true,
            })
        }
        _ => None,
    }
}

/// Rust `'` starts a char literal (`'a'`, `'\n'`) or a lifetime (`'a`).
fn is_rust_char_literal(chars: &[(usize, char)], i: usize) -> bool {
    char_at(chars, i + 1) == Some('\\') || char_at(chars, i + 2) == Some('\'')
}

pub fn scan(content: &str, language: Language) -> ScanReport {
    let chars: Vec<(usize, char)> = content.char_indices().collect();
    let line_comment: Vec<char> = language
        .line_comment()
        .map(|s| s.chars().collect())
        .unwrap_or_default();

    let mut report = ScanReport::default();
    let mut stack: Vec<Delimiter> = Vec::new();
    let mut state = State::Code;
    let mut line = 1;
    let mut column = 1;
    let mut current = LineInfo {
        starts_clean: true,
        ..LineInfo::default()
    };

    let mut i = 0;
    while i < chars.len() {
        let (offset, c) = chars[i];
        let here = Delimiter {
            ch: c,
            line,
            column,
            offset,
        };
        let mut advance = 1;
        let mut next_state = None;

        match &mut state {
            State::LineComment => {
                if c == '\n' {
                    next_state = Some(State::Code);
                }
            }
            State::BlockComment { depth, .. } => {
                if c == '*' && char_at(&chars, i + 1) == Some('/') {
                    advance = 2;
                    if *depth <= 1 {
                        next_state = Some(State::Code);
                    } else {
                        *depth -= 1;
                    }
                } else if language == Language::Rust
                    && c == '/'
                    && char_at(&chars, i + 1) == Some('*')
                {
                    advance = 2;
                    *depth += 1;
                }
            }
            State::Str {
                close,
                escapes,
                multiline,
                start,
            } => {
                if *escapes && c == '\\' {
                    advance = 2;
                } else if matches_at(&chars, i, close) {
                    advance = close.len();
                    current.push_code(c);
                    next_state = Some(State::Code);
                } else if c == '\n' && !*multiline {
                    report.error = Some(ScanError::UnterminatedString {
                        start: *start,
                        close: close.iter().collect(),
                        insert_at: offset,
                    });
                    report.lines.push(current);
                    report.open = stack;
                    return report;
                }
            }
            State::Code => {
                if c.is_whitespace() {
                    // nothing
                } else if !line_comment.is_empty() && matches_at(&chars, i, &line_comment) {
                    next_state = Some(State::LineComment);
                } else if language.has_block_comments()
                    && c == '/'
                    && char_at(&chars, i + 1) == Some('*')
                {
                    advance = 2;
                    next_state = Some(State::BlockComment {
                        depth: 1,
                        start: here,
                    });
                } else if let Some(start) = string_start(language, &chars, i) {
                    advance = start.open_len;
                    current.push_code(c);
                    next_state = Some(State::Str {
                        close: start.close,
                        escapes: start.escapes,
                        multiline: start.multiline,
                        start: here,
                    });
                } else if language == Language::Rust && c == '\'' {
                    current.push_code(c);
                    if is_rust_char_literal(&chars, i) {
                        next_state = Some(State::Str {
                            close: vec!['\''],
                            escapes: true,
                            multiline: false,
                            start: here,
                        });
                    }
                } else {
                    current.push_code(c);
                    match c {
                        '(' | '[' | '{' => stack.push(here),
                        ')' | ']' | '}' => match stack.pop() {
                            Some(open) if open.ch == opener_for(c) => {}
                            Some(open) => {
                                report.error = Some(ScanError::Mismatch { open, found: here });
                                report.lines.push(current);
                                stack.push(open);
                                report.open = stack;
                                return report;
                            }
                            None => {
                                report.error = Some(ScanError::StrayCloser(here));
                                report.lines.push(current);
                                return report;
                            }
                        },
                        _ => {}
                    }
                }
            }
        }

        if let Some(next) = next_state {
            state = next;
        }

        for k in 0..advance {
            match char_at(&chars, i + k) {
                Some('\n') => {
                    let clean = matches!(state, State::Code) && stack.is_empty();
                    current.ends_clean = clean;
                    report.lines.push(current);
                    current = LineInfo {
                        starts_clean: clean,
                        ..LineInfo::default()
                    };
                    line += 1;
                    column = 1;
                }
                Some(_) => column += 1,
                None => {}
            }
        }
        i += advance;
    }

    if !content.is_empty() && !content.ends_with('\n') {
        current.ends_clean = matches!(state, State::Code) && stack.is_empty();
        report.lines.push(current);
    }

    match state {
        State::Str { close, start, .. } => {
            report.error = Some(ScanError::UnterminatedString {
                start,
                close: close.into_iter().collect(),
                insert_at: content.len(),
            });
        }
        State::BlockComment { start, .. } => {
            report.error = Some(ScanError::UnterminatedComment { start });
        }
        State::Code | State::LineComment => {}
    }
    report.open = stack;
    report
}

/// Python block structure: consistent indentation and an indented body after
/// every line ending in `:`.
pub fn check_python_indentation(content: &str, lines: &[LineInfo]) -> Option<SyntaxDiagnostic> {
    let mut levels = vec![0usize];
    let mut opener: Option<usize> = None;
    let mut indent_char: Option<char> = None;
    let mut continuation = false;

    for (index, (text, info)) in content.lines().zip(lines).enumerate() {
        let number = index + 1;
        if !info.has_code {
            continue;
        }
        let logical_start = info.starts_clean && !continuation;
        continuation = info.last_code == Some('\\');
        if !logical_start {
            if info.ends_clean && info.last_code == Some(':') {
                opener = Some(number);
            }
            continue;
        }

        let indent: String = text.chars().take_while(|c| *c == ' ' || *c == '\t').collect();
        if indent.contains(' ') && indent.contains('\t') {
            return Some(SyntaxDiagnostic::new(
                number,
                1,
                "indentation mixes tabs and spaces",
                FixHint::InconsistentIndentation,
            ));
        }
        if let Some(first) = indent.chars().next() {
            match indent_char {
                Some(expected) if expected != first => {
                    return Some(SyntaxDiagnostic::new(
                        number,
                        1,
                        "inconsistent use of tabs and spaces in indentation",
                        FixHint::InconsistentIndentation,
                    ));
                }
                None => indent_char = Some(first),
                _ => {}
            }
        }

        let width = indent.chars().count();
        let top = levels.last().copied().unwrap_or(0);
        if let Some(opened_at) = opener.take() {
            if width <= top {
                return Some(SyntaxDiagnostic::new(
                    number,
                    width + 1,
                    format!("expected an indented block after line {}", opened_at),
                    FixHint::MissingBlockTerminator,
                ));
            }
            levels.push(width);
        } else if width > top {
            return Some(SyntaxDiagnostic::new(
                number,
                width + 1,
                "unexpected indent",
                FixHint::InconsistentIndentation,
            ));
        } else {
            while levels.last().is_some_and(|level| *level > width) {
                levels.pop();
            }
            if levels.last().copied().unwrap_or(0) != width {
                return Some(SyntaxDiagnostic::new(
                    number,
                    width + 1,
                    "unindent does not match any outer indentation level",
                    FixHint::InconsistentIndentation,
                ));
            }
        }

        if info.ends_clean && info.last_code == Some(':') {
            opener = Some(number);
        }
    }

    opener.map(|opened_at| {
        SyntaxDiagnostic::new(
            opened_at,
            1,
            format!("expected an indented block after line {}", opened_at),
            FixHint::MissingBlockTerminator,
        )
    })
}

/// Full structural check: brackets, literals, comments, and Python blocks.
pub fn structural_check(content: &str, language: Language) -> Option<SyntaxDiagnostic> {
    let report = scan(content, language);
    if let Some(diagnostic) = report.diagnostic() {
        return Some(diagnostic);
    }
    if language == Language::Python {
        return check_python_indentation(content, &report.lines);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_balanced_rust() {
        let src = "fn main() {\n    let v = vec![1, 2];\n    println!(\"{}\", v[0]);\n}\n";
        assert!(scan(src, Language::Rust).is_balanced());
        assert!(structural_check(src, Language::Rust).is_none());
    }

    #[test]
    fn test_brackets_in_strings_and_comments_ignored() {
        let src = "let s = \"(\"; // )\n/* { */ let c = '}';\n";
        assert!(scan(src, Language::Rust).is_balanced());
        let py = "x = '(' # )\ny = \"\"\"\n{\n\"\"\"\n";
        assert!(scan(py, Language::Python).is_balanced());
    }

    #[test]
    fn test_rust_lifetimes_are_not_chars() {
        let src = "fn f<'a>(x: &'a str) -> &'a str { x }\nconst C: char = 'x';\n";
        assert!(scan(src, Language::Rust).is_balanced());
    }

    #[test]
    fn test_rust_raw_string() {
        let src = "let s = r#\"a \" { \"#;\n";
        assert!(scan(src, Language::Rust).is_balanced());
    }

    #[test]
    fn test_unclosed_brace() {
        let src = "fn main() {\n    let x = 1;\n";
        let diag = structural_check(src, Language::Rust).unwrap();
        assert_eq!(diag.hint, FixHint::MissingBlockTerminator);
        assert_eq!((diag.line, diag.column), (1, 11));
    }

    #[test]
    fn test_mismatch_reports_position() {
        let src = "foo(a, [b)\n";
        let report = scan(src, Language::JavaScript);
        assert!(matches!(report.error, Some(ScanError::Mismatch { .. })));
        let diag = report.diagnostic().unwrap();
        assert_eq!((diag.line, diag.column), (1, 10));
        assert_eq!(diag.hint, FixHint::UnclosedBracket);
    }

    #[test]
    fn test_unterminated_string() {
        let src = "x = 'abc\ny = 1\n";
        let report = scan(src, Language::Python);
        match report.error {
            Some(ScanError::UnterminatedString { insert_at, .. }) => assert_eq!(insert_at, 8),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(
            report.diagnostic().unwrap().hint,
            FixHint::UnterminatedString
        );
    }

    #[test]
    fn test_python_indentation() {
        let ok = "def f(x):\n    if x:\n        return 1\n    return 2\n";
        assert!(structural_check(ok, Language::Python).is_none());

        let bad = "def f(x):\n    y = 1\n      return y\n";
        let diag = structural_check(bad, Language::Python).unwrap();
        assert_eq!(diag.hint, FixHint::InconsistentIndentation);
        assert_eq!(diag.line, 3);

        let missing = "def f(x):\nreturn 1\n";
        let diag = structural_check(missing, Language::Python).unwrap();
        assert_eq!(diag.hint, FixHint::MissingBlockTerminator);

        let dangling = "class A:\n";
        assert!(structural_check(dangling, Language::Python).is_some());
    }

    #[test]
    fn test_python_multiline_call_with_colon() {
        let src = "def f(\n    a,\n    b,\n):\n    return a\n";
        assert!(structural_check(src, Language::Python).is_none());
    }

    #[test]
    fn test_go_raw_string_and_js_template() {
        assert!(scan("s := `a\n{`\n", Language::Go).is_balanced());
        assert!(scan("const s = `x ${a}\n(`;\n", Language::JavaScript).is_balanced());
    }
}
