//! Task complexity classification and plan drafting.
//!
//! Classification works on rough *estimates* (affected files, changed lines)
//! plus keyword triggers in the description. When signals disagree the
//! higher complexity wins.
//!
//! | Complexity | Files | Lines | Keywords |
//! |------------|-------|-------|----------|
//! | Simple     | ≤ 1   | < 50  | none |
//! | Moderate   | 2–3   | ≥ 50  | pattern reuse ("similar to", ...) |
//! | Complex    | ≥ 4   |       | architectural ("refactor", "migrate", ...) |
//!
//! The keyword lists are heuristics and are configurable through
//! [`PlannerConfig`].

use super::entities::{Complexity, PlanStep, StepRisk};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::LazyLock;

/// Estimated size of a task. Neither value is measured.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSignals {
    pub estimated_files: usize,
    pub estimated_lines: usize,
}

impl TaskSignals {
    pub fn new(estimated_files: usize, estimated_lines: usize) -> Self {
        Self {
            estimated_files,
            estimated_lines,
        }
    }
}

/// Keyword triggers for classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub architectural_keywords: Vec<String>,
    pub pattern_keywords: Vec<String>,
    pub high_risk_keywords: Vec<String>,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            architectural_keywords: [
                "refactor",
                "architecture",
                "migrate",
                "redesign",
                "restructure",
                "rewrite",
            ]
            .map(String::from)
            .to_vec(),
            pattern_keywords: ["similar to", "same as", "like the", "pattern", "consistent with"]
                .map(String::from)
                .to_vec(),
            high_risk_keywords: ["delete", "remove", "drop", "migrate", "schema", "database"]
                .map(String::from)
                .to_vec(),
        }
    }
}

/// Why a task received its complexity, for display and logging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub complexity: Complexity,
    pub signals: TaskSignals,
    pub reasons: Vec<String>,
}

static FILE_COUNT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d+)\s+(?:\w+\s+)?(?:files|modules|components|services)\b")
        .expect("valid regex")
});

static FILE_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[\w./-]+\.(?:rs|py|js|jsx|ts|tsx|go|java|kt|rb|md|toml|json|yaml|yml|c|h|cpp|cs|swift|sql|html|css)\b")
        .expect("valid regex")
});

static LINE_COUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(\d+)\s+lines?\b").expect("valid regex"));

/// Classifies tasks and drafts execution steps.
#[derive(Debug, Clone, Default)]
pub struct TaskClassifier {
    config: PlannerConfig,
}

impl TaskClassifier {
    pub fn new(config: PlannerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Estimate signals from the description alone.
    ///
    /// Uses an explicit "N files" phrase when present, otherwise the number
    /// of distinct file-like tokens. Line estimates come from "N lines" or a
    /// size heuristic on file count.
    pub fn estimate_signals(&self, description: &str) -> TaskSignals {
        let explicit_files = FILE_COUNT
            .captures_iter(description)
            .filter_map(|c| c[1].parse::<usize>().ok())
            .max();
        let named_files: BTreeSet<&str> = FILE_TOKEN
            .find_iter(description)
            .map(|m| m.as_str())
            .collect();
        let estimated_files = explicit_files
            .unwrap_or(0)
            .max(named_files.len())
            .max(1);

        let estimated_lines = LINE_COUNT
            .captures_iter(description)
            .filter_map(|c| c[1].parse::<usize>().ok())
            .max()
            .unwrap_or(estimated_files * 20);

        TaskSignals::new(estimated_files, estimated_lines)
    }

    /// Classify a task; ties resolve toward the higher complexity.
    pub fn classify(&self, description: &str, signals: TaskSignals) -> Classification {
        let lowered = description.to_lowercase();
        let mut complexity = Complexity::Simple;
        let mut reasons = Vec::new();

        if signals.estimated_files >= 4 {
            complexity = complexity.max(Complexity::Complex);
            reasons.push(format!("{} files affected", signals.estimated_files));
        } else if signals.estimated_files >= 2 {
            complexity = complexity.max(Complexity::Moderate);
            reasons.push(format!("{} files affected", signals.estimated_files));
        }

        if signals.estimated_lines >= 50 {
            complexity = complexity.max(Complexity::Moderate);
            reasons.push(format!("~{} lines changed", signals.estimated_lines));
        }

        if let Some(keyword) = find_keyword(&lowered, &self.config.pattern_keywords) {
            complexity = complexity.max(Complexity::Moderate);
            reasons.push(format!("pattern reuse ('{}')", keyword));
        }

        if let Some(keyword) = find_keyword(&lowered, &self.config.architectural_keywords) {
            complexity = complexity.max(Complexity::Complex);
            reasons.push(format!("architectural keyword '{}'", keyword));
        }

        if reasons.is_empty() {
            reasons.push("single small change".to_string());
        }

        Classification {
            complexity,
            signals,
            reasons,
        }
    }

    /// Draft ordered steps for a classified task.
    pub fn draft_steps(&self, description: &str, complexity: Complexity) -> Vec<PlanStep> {
        let lowered = description.to_lowercase();
        let task_is_risky = find_keyword(&lowered, &self.config.high_risk_keywords).is_some();
        let change_risk = if task_is_risky {
            StepRisk::High
        } else {
            StepRisk::Medium
        };
        let summary = crate::core::string::one_line(description, 80);

        let outline: Vec<(String, StepRisk)> = match complexity {
            Complexity::Simple => vec![(summary, change_risk.min(StepRisk::Medium))],
            Complexity::Moderate => vec![
                ("Inspect the affected files and existing patterns".to_string(), StepRisk::Low),
                (format!("Implement: {}", summary), change_risk),
                ("Verify the change (syntax, lint, affected tests)".to_string(), StepRisk::Low),
            ],
            Complexity::Complex => vec![
                ("Map the affected modules and their dependencies".to_string(), StepRisk::Low),
                ("Design the target structure and migration order".to_string(), StepRisk::Low),
                (format!("Implement core changes: {}", summary), change_risk),
                ("Update dependent call sites".to_string(), change_risk),
                ("Run thorough verification and fix regressions".to_string(), StepRisk::Medium),
            ],
        };

        outline
            .into_iter()
            .enumerate()
            .map(|(i, (text, risk))| PlanStep::new(i, text, risk))
            .collect()
    }
}

fn find_keyword<'a>(lowered: &str, keywords: &'a [String]) -> Option<&'a str> {
    keywords
        .iter()
        .find(|k| !k.is_empty() && lowered.contains(&k.to_lowercase()))
        .map(|k| k.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_task() {
        let classifier = TaskClassifier::default();
        let c = classifier.classify("fix typo in README.md", TaskSignals::new(1, 5));
        assert_eq!(c.complexity, Complexity::Simple);
    }

    #[test]
    fn test_estimate_from_description() {
        let classifier = TaskClassifier::default();
        let signals = classifier.estimate_signals("fix typo in README.md");
        assert_eq!(signals.estimated_files, 1);
        assert!(signals.estimated_lines < 50);

        let signals =
            classifier.estimate_signals("refactor authentication to use JWT across 5 files");
        assert_eq!(signals.estimated_files, 5);

        let signals = classifier.estimate_signals("update api.py and models.py, about 120 lines");
        assert_eq!(signals, TaskSignals::new(2, 120));
    }

    #[test]
    fn test_complex_by_keyword_and_files() {
        let classifier = TaskClassifier::default();
        let description = "refactor authentication to use JWT across 5 files";
        let signals = classifier.estimate_signals(description);
        let c = classifier.classify(description, signals);
        assert_eq!(c.complexity, Complexity::Complex);
        assert!(c.reasons.iter().any(|r| r.contains("refactor")));
    }

    #[test]
    fn test_keyword_alone_is_complex() {
        let classifier = TaskClassifier::default();
        let c = classifier.classify("migrate config loader", TaskSignals::new(1, 10));
        assert_eq!(c.complexity, Complexity::Complex);
    }

    #[test]
    fn test_moderate_by_file_count_or_pattern() {
        let classifier = TaskClassifier::default();
        assert_eq!(
            classifier
                .classify("add a field", TaskSignals::new(3, 10))
                .complexity,
            Complexity::Moderate
        );
        assert_eq!(
            classifier
                .classify("add an endpoint similar to /users", TaskSignals::new(1, 10))
                .complexity,
            Complexity::Moderate
        );
        assert_eq!(
            classifier
                .classify("add a helper", TaskSignals::new(1, 80))
                .complexity,
            Complexity::Moderate
        );
    }

    #[test]
    fn test_tie_break_prefers_higher() {
        // 2 files says Moderate, the keyword says Complex
        let classifier = TaskClassifier::default();
        let c = classifier.classify("redesign the cache", TaskSignals::new(2, 10));
        assert_eq!(c.complexity, Complexity::Complex);
    }

    #[test]
    fn test_custom_keywords() {
        let classifier = TaskClassifier::new(PlannerConfig {
            architectural_keywords: vec!["overhaul".to_string()],
            ..PlannerConfig::default()
        });
        assert_eq!(
            classifier
                .classify("refactor x", TaskSignals::new(1, 5))
                .complexity,
            Complexity::Simple
        );
        assert_eq!(
            classifier
                .classify("overhaul logging", TaskSignals::new(1, 5))
                .complexity,
            Complexity::Complex
        );
    }

    #[test]
    fn test_draft_steps_shape() {
        let classifier = TaskClassifier::default();
        assert_eq!(
            classifier
                .draft_steps("fix typo", Complexity::Simple)
                .len(),
            1
        );
        assert_eq!(
            classifier
                .draft_steps("add endpoint", Complexity::Moderate)
                .len(),
            3
        );
        let steps = classifier.draft_steps("migrate the database schema", Complexity::Complex);
        assert_eq!(steps.len(), 5);
        assert!(steps.iter().any(|s| s.risk == StepRisk::High));
        assert_eq!(steps[0].risk, StepRisk::Low);
    }
}
