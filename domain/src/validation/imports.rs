//! Import analysis: unused imports and well-known names used without one.
//!
//! Line-based heuristics for Python, Rust and JavaScript/TypeScript. Content
//! is never modified.

use super::entities::ValidationIssue;
use super::language::Language;
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Binding {
    name: String,
    line: usize,
}

static PY_IMPORT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*import\s+(.+)$").expect("valid regex"));
static PY_FROM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*from\s+[\w.]+\s+import\s+\(?([^)#]+)\)?").expect("valid regex")
});
static RUST_USE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:pub(?:\([^)]*\))?\s+)?use\s+([^;]+);").expect("valid regex")
});
static JS_IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*import\s+(?:type\s+)?(.+?)\s+from\s+['"]"#).expect("valid regex")
});
static JS_REQUIRE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*(?:const|let|var)\s+(.+?)\s*=\s*require\(['"]"#).expect("valid regex")
});

/// Python standard modules that are commonly used without an import.
const PY_WELL_KNOWN: &[&str] = &[
    "os", "sys", "re", "json", "math", "time", "datetime", "subprocess", "pathlib", "typing",
    "collections", "itertools", "functools", "logging", "random", "shutil", "tempfile",
];

/// Rust std items commonly used without a `use`.
const RUST_WELL_KNOWN: &[&str] = &[
    "HashMap", "HashSet", "BTreeMap", "BTreeSet", "VecDeque", "Arc", "Mutex", "RwLock", "Rc",
    "RefCell", "Cell", "PathBuf", "Path", "Duration", "Instant",
];

pub fn check_imports(content: &str, language: Language) -> Vec<ValidationIssue> {
    let (bindings, import_lines) = match language {
        Language::Python => python_bindings(content),
        Language::Rust => rust_bindings(content),
        l if l.is_js_like() => js_bindings(content),
        _ => return Vec::new(),
    };

    let body: String = content
        .lines()
        .enumerate()
        .filter(|(i, _)| !import_lines.contains(&(i + 1)))
        .map(|(_, line)| strip_line_comment(line, language))
        .collect::<Vec<_>>()
        .join("\n");

    let mut issues: Vec<ValidationIssue> = bindings
        .iter()
        .filter(|b| !contains_word(&body, &b.name))
        .map(|b| ValidationIssue::at(b.line, 1, format!("unused import '{}'", b.name)))
        .collect();

    let bound: HashSet<&str> = bindings.iter().map(|b| b.name.as_str()).collect();
    issues.extend(missing_imports(content, language, &bound, &import_lines));
    issues.sort_by_key(|i| i.line);
    issues
}

fn strip_line_comment(line: &str, language: Language) -> &str {
    match language.line_comment() {
        Some(marker) => line.split(marker).next().unwrap_or(line),
        None => line,
    }
}

fn contains_word(haystack: &str, word: &str) -> bool {
    Regex::new(&format!(r"\b{}\b", regex::escape(word)))
        .map(|re| re.is_match(haystack))
        .unwrap_or(true)
}

fn python_bindings(content: &str) -> (Vec<Binding>, HashSet<usize>) {
    let mut bindings = Vec::new();
    let mut lines = HashSet::new();
    for (index, line) in content.lines().enumerate() {
        let number = index + 1;
        let names = if let Some(caps) = PY_FROM.captures(line) {
            caps[1].to_string()
        } else if let Some(caps) = PY_IMPORT.captures(line) {
            caps[1].to_string()
        } else {
            continue;
        };
        lines.insert(number);
        let is_from = PY_FROM.is_match(line);
        for item in names.split(',') {
            let item = item.trim();
            if item.is_empty() || item == "*" {
                continue;
            }
            let name = match item.split_once(" as ") {
                Some((_, alias)) => alias.trim(),
                // `import a.b` binds `a`
                None if !is_from => item.split('.').next().unwrap_or(item),
                None => item,
            };
            bindings.push(Binding {
                name: name.to_string(),
                line: number,
            });
        }
    }
    (bindings, lines)
}

fn rust_bindings(content: &str) -> (Vec<Binding>, HashSet<usize>) {
    let mut bindings = Vec::new();
    let mut lines = HashSet::new();
    for (index, line) in content.lines().enumerate() {
        let Some(caps) = RUST_USE.captures(line) else {
            continue;
        };
        let number = index + 1;
        lines.insert(number);
        if line.trim_start().starts_with("pub") {
            // re-exports are used by definition
            continue;
        }
        let tree = caps[1].trim();
        let leaves: Vec<&str> = match (tree.find('{'), tree.rfind('}')) {
            (Some(open), Some(close)) if open < close => tree[open + 1..close].split(',').collect(),
            _ => vec![tree],
        };
        for leaf in leaves {
            let leaf = leaf.trim();
            if leaf.is_empty() || leaf.contains('{') || leaf.contains('}') {
                continue;
            }
            let name = match leaf.split_once(" as ") {
                Some((_, alias)) => alias.trim(),
                None => leaf.rsplit("::").next().unwrap_or(leaf),
            };
            if matches!(name, "*" | "self" | "_" | "super" | "crate") {
                continue;
            }
            bindings.push(Binding {
                name: name.to_string(),
                line: number,
            });
        }
    }
    (bindings, lines)
}

fn js_bindings(content: &str) -> (Vec<Binding>, HashSet<usize>) {
    let mut bindings = Vec::new();
    let mut lines = HashSet::new();
    for (index, line) in content.lines().enumerate() {
        let number = index + 1;
        let clause = if let Some(caps) = JS_IMPORT.captures(line) {
            caps[1].to_string()
        } else if let Some(caps) = JS_REQUIRE.captures(line) {
            caps[1].to_string()
        } else {
            continue;
        };
        lines.insert(number);
        let mut names = Vec::new();
        let (outside, inside) = match (clause.find('{'), clause.rfind('}')) {
            (Some(open), Some(close)) if open < close => (
                format!("{}{}", &clause[..open], &clause[close + 1..]),
                clause[open + 1..close].to_string(),
            ),
            _ => (clause.clone(), String::new()),
        };
        for item in inside.split(',') {
            let item = item.trim().trim_start_matches("type ");
            if item.is_empty() {
                continue;
            }
            let name = match item.split_once(" as ") {
                Some((_, alias)) => alias,
                None => item.split_once(':').map(|(_, a)| a).unwrap_or(item),
            };
            names.push(name.trim().to_string());
        }
        for item in outside.split(',') {
            let item = item.trim();
            if item.is_empty() {
                continue;
            }
            let name = item.strip_prefix("* as ").unwrap_or(item);
            names.push(name.trim().to_string());
        }
        bindings.extend(names.into_iter().map(|name| Binding { name, line: number }));
    }
    (bindings, lines)
}

fn missing_imports(
    content: &str,
    language: Language,
    bound: &HashSet<&str>,
    import_lines: &HashSet<usize>,
) -> Vec<ValidationIssue> {
    let candidates = match language {
        Language::Python => PY_WELL_KNOWN,
        Language::Rust => RUST_WELL_KNOWN,
        _ => return Vec::new(),
    };

    let mut issues = Vec::new();
    for name in candidates {
        if bound.contains(name) || is_defined(content, language, name) {
            continue;
        }
        let Ok(re) = Regex::new(&unqualified_use_pattern(language, name)) else {
            continue;
        };
        let first_use = content.lines().enumerate().find(|(i, line)| {
            !import_lines.contains(&(i + 1))
                && re.is_match(strip_line_comment(line, language))
        });
        if let Some((index, line)) = first_use {
            let column = line.find(name).map(|c| c + 1).unwrap_or(1);
            issues.push(ValidationIssue::at(
                index + 1,
                column,
                format!("'{}' is used but never imported", name),
            ));
        }
    }
    issues
}

/// Matches a use of `name` that relies on it being in scope.
fn unqualified_use_pattern(language: Language, name: &str) -> String {
    match language {
        Language::Python => format!(r"\b{}\.\w", name),
        _ => format!(r"(?:^|[^:\w]){}\s*(?:::|<|\(|\{{)", name),
    }
}

fn is_defined(content: &str, language: Language, name: &str) -> bool {
    let pattern = match language {
        Language::Python => format!(r"(?m)^\s*(?:def|class)\s+{}\b|^\s*{}\s*=", name, name),
        _ => format!(
            r"\b(?:struct|enum|type|trait|fn|mod)\s+{}\b",
            regex::escape(name)
        ),
    };
    Regex::new(&pattern)
        .map(|re| re.is_match(content))
        .unwrap_or(false)
}
