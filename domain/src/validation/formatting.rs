//! Formatting normalisation.
//!
//! Only whitespace is touched, so the normalised text is always safe to
//! write back.

use super::entities::ValidationIssue;
use super::language::Language;

const MAX_BLANK_RUN: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattingReport {
    pub issues: Vec<ValidationIssue>,
    pub normalized: String,
}

impl FormattingReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

pub fn check_formatting(content: &str, language: Language) -> FormattingReport {
    let mut issues = Vec::new();
    let mut out = String::with_capacity(content.len());

    if content.contains("\r\n") {
        issues.push(ValidationIssue::at(1, 1, "CRLF line endings"));
    }

    let mut blank_run = 0;
    let mut reported_blank_run = false;
    for (index, raw) in content.lines().enumerate() {
        let number = index + 1;
        let mut line = raw.trim_end_matches('\r').to_string();

        let stripped_len = line.trim_end().len();
        if stripped_len != line.len() {
            issues.push(ValidationIssue::at(
                number,
                stripped_len + 1,
                "trailing whitespace",
            ));
            line.truncate(stripped_len);
        }

        if language == Language::Python && line.starts_with('\t') {
            issues.push(ValidationIssue::at(number, 1, "tab indentation"));
            let tabs = line.chars().take_while(|c| *c == '\t').count();
            line = format!("{}{}", "    ".repeat(tabs), &line[tabs..]);
        }

        if line.is_empty() {
            blank_run += 1;
            if blank_run > MAX_BLANK_RUN {
                if !reported_blank_run {
                    issues.push(ValidationIssue::at(
                        number,
                        1,
                        format!("more than {} consecutive blank lines", MAX_BLANK_RUN),
                    ));
                    reported_blank_run = true;
                }
                continue;
            }
        } else {
            blank_run = 0;
            reported_blank_run = false;
        }

        out.push_str(&line);
        out.push('\n');
    }

    if !content.is_empty() && !content.ends_with('\n') {
        issues.push(ValidationIssue::at(
            content.lines().count().max(1),
            1,
            "missing final newline",
        ));
    }

    // A trailing run of blank lines collapses to the single final newline
    while out.ends_with("\n\n") {
        out.pop();
    }

    FormattingReport {
        issues,
        normalized: out,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_content() {
        let report = check_formatting("fn main() {}\n", Language::Rust);
        assert!(report.is_clean());
        assert_eq!(report.normalized, "fn main() {}\n");
    }

    #[test]
    fn test_fixes_whitespace_problems() {
        let src = "a = 1   \r\nb = 2\r\n\n\n\n\nc = 3";
        let report = check_formatting(src, Language::Python);
        let messages: Vec<_> = report.issues.iter().map(|i| i.message.as_str()).collect();
        assert!(messages.contains(&"CRLF line endings"));
        assert!(messages.contains(&"trailing whitespace"));
        assert!(messages.contains(&"missing final newline"));
        assert!(messages.iter().any(|m| m.contains("blank lines")));
        assert_eq!(report.normalized, "a = 1\nb = 2\n\n\nc = 3\n");
    }

    #[test]
    fn test_python_tabs_expanded() {
        let report = check_formatting("if x:\n\treturn 1\n", Language::Python);
        assert_eq!(report.normalized, "if x:\n    return 1\n");
        assert_eq!(report.issues.len(), 1);
    }

    #[test]
    fn test_tabs_allowed_in_go() {
        assert!(check_formatting("func f() {\n\treturn\n}\n", Language::Go).is_clean());
    }
}
