//! Skeleton files with one placeholder line per section.

use crate::validation::language::Language;

const MARKER: &str = "@section:";

/// The placeholder line for a section, written in the file's comment syntax.
pub fn placeholder(language: Language, id: &str) -> String {
    match language.line_comment() {
        Some(prefix) => format!("{} {}{}", prefix, MARKER, id),
        None if language == Language::Markdown => format!("<!-- {}{} -->", MARKER, id),
        None => format!("# {}{}", MARKER, id),
    }
}

/// A file holding the placeholders in the given order.
pub fn skeleton<'a>(language: Language, ids: impl IntoIterator<Item = &'a str>) -> String {
    let mut out = String::new();
    for id in ids {
        out.push_str(&placeholder(language, id));
        out.push('\n');
    }
    out
}

fn placeholder_id(line: &str) -> Option<&str> {
    let trimmed = line.trim();
    let rest = &trimmed[trimmed.find(MARKER)? + MARKER.len()..];
    let id = rest.strip_suffix("-->").unwrap_or(rest).trim();
    (!id.is_empty()).then_some(id)
}

/// Replace the placeholder of `id` with `content`. `None` when the file has
/// no such placeholder.
pub fn fill_placeholder(file: &str, language: Language, id: &str, content: &str) -> Option<String> {
    let line = placeholder(language, id);
    let mut out = String::with_capacity(file.len() + content.len());
    let mut found = false;
    for existing in file.split_inclusive('\n') {
        if !found && existing.trim_end_matches(['\n', '\r']) == line {
            found = true;
            out.push_str(content);
            if !content.is_empty() && !content.ends_with('\n') {
                out.push('\n');
            }
        } else {
            out.push_str(existing);
        }
    }
    found.then_some(out)
}

/// Drop every remaining placeholder line.
pub fn strip_placeholders(file: &str) -> String {
    file.split_inclusive('\n')
        .filter(|line| placeholder_id(line).is_none())
        .collect()
}
