//! Bounded automatic repair.
//!
//! One pass, no iteration: drop an incomplete trailing statement, remove a
//! single stray closer, close an unterminated literal or comment, then close
//! every bracket still open. Mismatched brackets are never guessed at.
//!
//! The same machinery repairs the JSON bodies of model-emitted actions,
//! except that a cut-off JSON string is never closed: its content is lost.

use super::language::Language;
use super::scanner::{ScanError, ScanReport, closer_for, scan};

/// Attempt a repair. `None` when nothing could (or needed to) be changed.
pub fn repair(content: &str, language: Language) -> Option<String> {
    let trimmed = trim_incomplete_tail(content, language);
    let fixed = close_structures(&trimmed, language, true)?;
    let fixed = restore_final_newline(content, fixed);
    (fixed != content).then_some(fixed)
}

/// Repair a JSON object emitted by a model: close brackets, then drop
/// trailing commas. `None` for an unterminated string.
pub fn repair_json(text: &str) -> Option<String> {
    let trimmed = text.trim();
    let closed = close_structures(trimmed, Language::Json, false)?;
    let fixed = strip_trailing_commas(&closed);
    (fixed != trimmed).then_some(fixed)
}

fn close_structures(text: &str, language: Language, close_strings: bool) -> Option<String> {
    let mut text = text.to_string();
    let mut report = scan(&text, language);

    if let Some(ScanError::StrayCloser(stray)) = &report.error {
        text.remove(stray.offset);
        report = scan(&text, language);
    }

    match report.error.clone() {
        Some(ScanError::UnterminatedString {
            close, insert_at, ..
        }) if close_strings => {
            text.insert_str(insert_at, &close);
            report = scan(&text, language);
        }
        Some(ScanError::UnterminatedComment { .. }) => {
            text.push_str(" */");
            report = scan(&text, language);
        }
        _ => {}
    }

    if report.error.is_some() {
        return None;
    }
    Some(append_closers(text, &report, language))
}

fn append_closers(mut text: String, report: &ScanReport, language: Language) -> String {
    if report.open.is_empty() {
        return text;
    }
    let keep = text.trim_end().len();
    text.truncate(keep);
    for open in report.open.iter().rev() {
        let closer = closer_for(open.ch);
        if open.ch == '{' && language.uses_braces() {
            text.push('\n');
            text.push_str(&leading_indent(&text, open.offset));
        }
        text.push(closer);
    }
    text
}

/// Indentation of the line containing byte `offset`.
fn leading_indent(text: &str, offset: usize) -> String {
    let start = text[..offset.min(text.len())]
        .rfind('\n')
        .map(|i| i + 1)
        .unwrap_or(0);
    text[start..]
        .chars()
        .take_while(|c| *c == ' ' || *c == '\t')
        .collect()
}

/// Remove the last code line when it ends mid-expression.
fn trim_incomplete_tail(content: &str, language: Language) -> String {
    let report = scan(content, language);
    let Some((index, info)) = report
        .lines
        .iter()
        .enumerate()
        .rev()
        .find(|(_, info)| info.has_code)
    else {
        return content.to_string();
    };
    let Some(last) = info.last_code else {
        return content.to_string();
    };
    let prev = info.prev_code;
    let dangling = match last {
        '=' | ',' | '.' | '\\' | '&' | '|' => true,
        '+' | '-' => prev != Some(last),
        '*' => language != Language::Python,
        '>' => matches!(prev, Some('=') | Some('-')),
        _ => false,
    };
    if !dangling {
        return content.to_string();
    }
    content
        .lines()
        .enumerate()
        .filter(|(i, _)| *i != index)
        .map(|(_, line)| line)
        .collect::<Vec<_>>()
        .join("\n")
}

fn restore_final_newline(original: &str, mut fixed: String) -> String {
    if original.ends_with('\n') && !fixed.ends_with('\n') {
        fixed.push('\n');
    }
    fixed
}

fn strip_trailing_commas(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in chars.iter().enumerate() {
        if in_string {
            out.push(*c);
            if escaped {
                escaped = false;
            } else if *c == '\\' {
                escaped = true;
            } else if *c == '"' {
                in_string = false;
            }
            continue;
        }
        if *c == '"' {
            in_string = true;
        } else if *c == ',' {
            let next = chars[i + 1..].iter().find(|n| !n.is_whitespace());
            if matches!(next, Some('}') | Some(']') | None) {
                continue;
            }
        }
        out.push(*c);
    }
    out
}
