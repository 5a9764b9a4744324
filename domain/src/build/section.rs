//! Code sections and their ordering.

use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    Imports,
    Declarations,
    Types,
    Functions,
    Tests,
    #[default]
    Other,
}

/// A piece of a file to be built incrementally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeSection {
    pub id: String,
    #[serde(default)]
    pub kind: SectionKind,
    pub content: String,
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Set on the parts of a split section: `(original id, part, total)`,
    /// with `part` 1-based.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub part_of: Option<(String, usize, usize)>,
}

impl CodeSection {
    pub fn new(id: impl Into<String>, kind: SectionKind, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            content: content.into(),
            dependencies: Vec::new(),
            part_of: None,
        }
    }

    pub fn depends_on(mut self, id: impl Into<String>) -> Self {
        self.dependencies.push(id.into());
        self
    }

    pub fn line_count(&self) -> usize {
        crate::core::string::line_count(&self.content)
    }

    /// Whether this is a split part other than the last one.
    pub fn is_partial(&self) -> bool {
        matches!(&self.part_of, Some((_, part, total)) if part < total)
    }

    /// Id of the section this part belongs to (its own id when unsplit).
    pub fn origin_id(&self) -> &str {
        self.part_of
            .as_ref()
            .map(|(origin, _, _)| origin.as_str())
            .unwrap_or(&self.id)
    }
}

/// Order sections so each comes after its dependencies.
///
/// Among sections that are ready at the same time, input order is kept.
/// Duplicate ids, unknown dependencies and cycles are errors.
pub fn topological_order(sections: &[CodeSection]) -> Result<Vec<usize>, DomainError> {
    let mut index_of: HashMap<&str, usize> = HashMap::new();
    for (i, section) in sections.iter().enumerate() {
        if index_of.insert(section.id.as_str(), i).is_some() {
            return Err(DomainError::DuplicateSection(section.id.clone()));
        }
    }

    let mut pending_deps: Vec<usize> = Vec::with_capacity(sections.len());
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); sections.len()];
    for (i, section) in sections.iter().enumerate() {
        let unique: HashSet<&str> = section.dependencies.iter().map(String::as_str).collect();
        for dep in &unique {
            let Some(&d) = index_of.get(dep) else {
                return Err(DomainError::UnknownDependency {
                    section: section.id.clone(),
                    dependency: dep.to_string(),
                });
            };
            dependents[d].push(i);
        }
        pending_deps.push(unique.len());
    }

    let mut ready: BTreeSet<usize> = (0..sections.len())
        .filter(|&i| pending_deps[i] == 0)
        .collect();
    let mut order = Vec::with_capacity(sections.len());
    while let Some(i) = ready.pop_first() {
        order.push(i);
        for &dependent in &dependents[i] {
            pending_deps[dependent] -= 1;
            if pending_deps[dependent] == 0 {
                ready.insert(dependent);
            }
        }
    }

    if order.len() < sections.len() {
        let placed: HashSet<usize> = order.iter().copied().collect();
        return Err(DomainError::DependencyCycle(find_cycle(
            sections, &index_of, &placed,
        )));
    }
    Ok(order)
}

/// Walk dependencies among unplaced sections until one repeats.
fn find_cycle(
    sections: &[CodeSection],
    index_of: &HashMap<&str, usize>,
    placed: &HashSet<usize>,
) -> Vec<String> {
    let Some(mut current) = (0..sections.len()).find(|i| !placed.contains(i)) else {
        return Vec::new();
    };
    let mut path: Vec<usize> = Vec::new();
    loop {
        if let Some(pos) = path.iter().position(|&p| p == current) {
            let mut cycle: Vec<String> = path[pos..]
                .iter()
                .map(|&i| sections[i].id.clone())
                .collect();
            cycle.push(sections[current].id.clone());
            return cycle;
        }
        path.push(current);
        let next = sections[current]
            .dependencies
            .iter()
            .filter_map(|d| index_of.get(d.as_str()).copied())
            .find(|d| !placed.contains(d));
        match next {
            Some(n) => current = n,
            None => {
                return path.iter().map(|&i| sections[i].id.clone()).collect();
            }
        }
    }
}

/// Split a section longer than `max_lines` into chained parts.
///
/// Cuts prefer blank lines; part `k` depends on part `k - 1` and the first
/// part keeps the original dependencies.
pub fn split_section(section: &CodeSection, max_lines: usize) -> Vec<CodeSection> {
    let max_lines = max_lines.max(1);
    let lines: Vec<&str> = section.content.lines().collect();
    if lines.len() <= max_lines {
        return vec![section.clone()];
    }

    let mut chunks: Vec<Vec<&str>> = Vec::new();
    let mut start = 0;
    while start < lines.len() {
        let hard_end = (start + max_lines).min(lines.len());
        let end = if hard_end == lines.len() {
            hard_end
        } else {
            // cut after the last blank line in the window, if any
            (start + 1..hard_end)
                .rev()
                .find(|&i| lines[i].trim().is_empty())
                .map(|i| i + 1)
                .unwrap_or(hard_end)
        };
        chunks.push(lines[start..end].to_vec());
        start = end;
    }

    let total = chunks.len();
    chunks
        .into_iter()
        .enumerate()
        .map(|(i, chunk)| {
            let part = i + 1;
            let dependencies = if part == 1 {
                section.dependencies.clone()
            } else {
                vec![part_id(&section.id, part - 1)]
            };
            CodeSection {
                id: part_id(&section.id, part),
                kind: section.kind,
                content: format!("{}\n", chunk.join("\n")),
                dependencies,
                part_of: Some((section.id.clone(), part, total)),
            }
        })
        .collect()
}

fn part_id(id: &str, part: usize) -> String {
    format!("{}#{}", id, part)
}

/// Split every oversized section and point dependents of a split section
/// at its last part.
pub fn expand_sections(sections: &[CodeSection], max_lines: usize) -> Vec<CodeSection> {
    let mut last_part: HashMap<String, String> = HashMap::new();
    let mut expanded = Vec::new();
    for section in sections {
        let parts = split_section(section, max_lines);
        if parts.len() > 1
            && let Some(last) = parts.last()
        {
            last_part.insert(section.id.clone(), last.id.clone());
        }
        expanded.extend(parts);
    }
    for section in &mut expanded {
        if section.part_of.as_ref().is_some_and(|(_, part, _)| *part > 1) {
            continue;
        }
        for dep in &mut section.dependencies {
            if let Some(last) = last_part.get(dep) {
                *dep = last.clone();
            }
        }
    }
    expanded
}
