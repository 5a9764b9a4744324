//! Incremental build use case (IncrementalBuilder)
//!
//! Writes a file section by section. Ordering errors surface before the
//! file is touched; afterwards each insertion is syntax-checked and a bad
//! one is rolled back on its own.
//!
//! ```text
//! sections ──split──▶ parts ──order──▶ checkpoint ──▶ skeleton
//!                                                        │
//!                  ┌─────────────────────────────────────┘
//!                  ▼
//!   fill placeholder ──▶ SYNTAX ──ok──▶ write
//!                          │
//!                          └─fail──▶ roll back, skip dependents
//! ```

use crate::ports::workspace::{WorkspaceError, WorkspacePort};
use crate::use_cases::checkpoints::{CheckpointError, CheckpointStore};
use crate::use_cases::validate_code::CodeValidator;
use ratchet_domain::build::{
    expand_sections, fill_placeholder, skeleton, strip_placeholders, topological_order,
};
use ratchet_domain::{BuildReport, CodeSection, DomainError, Language, SectionFailure};
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum BuildError {
    /// Cycles, unknown dependencies and duplicate ids. Nothing was written.
    #[error("Invalid sections: {0}")]
    InvalidSections(#[from] DomainError),

    #[error("Checkpoint failed: {0}")]
    Checkpoint(#[from] CheckpointError),

    #[error("Workspace error: {0}")]
    Workspace(#[from] WorkspaceError),
}

/// Parts of a split section inserted so far, validated together once the
/// last part is in.
struct OpenChain {
    origin: String,
    content_before: String,
    part_ids: Vec<String>,
}

pub struct IncrementalBuilder {
    workspace: Arc<dyn WorkspacePort>,
    checkpoints: Arc<CheckpointStore>,
    validator: Arc<CodeValidator>,
}

impl IncrementalBuilder {
    pub fn new(
        workspace: Arc<dyn WorkspacePort>,
        checkpoints: Arc<CheckpointStore>,
        validator: Arc<CodeValidator>,
    ) -> Self {
        Self {
            workspace,
            checkpoints,
            validator,
        }
    }

    pub async fn build(
        &self,
        file_path: &str,
        sections: &[CodeSection],
        max_section_lines: usize,
    ) -> Result<BuildReport, BuildError> {
        let parts = expand_sections(sections, max_section_lines);
        let order = topological_order(&parts)?;
        let language = Language::from_path(file_path);

        let checkpoint = self
            .checkpoints
            .snapshot(&[file_path.to_string()], &format!("incremental build of {}", file_path))
            .await?;

        match self.fill(file_path, language, &parts, &order).await {
            Ok(report) => {
                info!(
                    file = file_path,
                    added = report.sections_added.len(),
                    failed = report.failures.len(),
                    lines = report.final_line_count,
                    "Incremental build finished"
                );
                Ok(report)
            }
            Err(e) => {
                warn!(file = file_path, error = %e, "Incremental build failed, restoring checkpoint");
                if let Err(restore_err) = self.checkpoints.restore(&checkpoint).await {
                    warn!(checkpoint = %checkpoint, error = %restore_err, "Restore after failed build did not complete");
                }
                Err(e.into())
            }
        }
    }

    async fn fill(
        &self,
        file_path: &str,
        language: Language,
        parts: &[CodeSection],
        order: &[usize],
    ) -> Result<BuildReport, WorkspaceError> {
        let mut content = skeleton(language, order.iter().map(|&i| parts[i].id.as_str()));
        self.workspace.write(file_path, content.as_bytes()).await?;

        let mut added: Vec<String> = Vec::new();
        let mut failures: Vec<SectionFailure> = Vec::new();
        let mut failed: HashSet<String> = HashSet::new();
        let mut chain: Option<OpenChain> = None;

        for &i in order {
            let part = &parts[i];
            if let Some(dep) = part.dependencies.iter().find(|d| failed.contains(*d)) {
                debug!(section = %part.id, dependency = %dep, "Skipping section");
                failures.push(SectionFailure::dependency_failed(&part.id, dep));
                failed.insert(part.id.clone());
                continue;
            }

            let Some(filled) = fill_placeholder(&content, language, &part.id, &part.content) else {
                failures.push(SectionFailure::invalid(&part.id, "placeholder not found"));
                failed.insert(part.id.clone());
                continue;
            };

            if part.is_partial() {
                let open = chain.get_or_insert_with(|| OpenChain {
                    origin: part.origin_id().to_string(),
                    content_before: content.clone(),
                    part_ids: Vec::new(),
                });
                open.part_ids.push(part.id.clone());
                content = filled;
                continue;
            }

            let open = chain.take();
            let check = self.validator.check_syntax(&filled, language);
            // a result that only parses after repair is not what the section said
            if check.passed && check.fixed_content.is_none() {
                if let Some(open) = open {
                    added.extend(open.part_ids);
                }
                added.push(part.id.clone());
                content = filled;
                self.workspace.write(file_path, content.as_bytes()).await?;
                continue;
            }

            let reason = check
                .first_error()
                .unwrap_or_else(|| "file does not parse after insertion".to_string());
            match open {
                Some(open) => {
                    debug!(section = %open.origin, parts = open.part_ids.len() + 1, "Rolling back split section");
                    failures.push(SectionFailure::invalid(&open.origin, reason));
                    failed.extend(open.part_ids);
                    content = open.content_before;
                }
                None => {
                    debug!(section = %part.id, "Rolling back section");
                    failures.push(SectionFailure::invalid(&part.id, reason));
                }
            }
            failed.insert(part.id.clone());
        }

        let final_content = strip_placeholders(&content);
        self.workspace
            .write(file_path, final_content.as_bytes())
            .await?;
        Ok(BuildReport::new(added, failures, &final_content))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MemoryWorkspace;
    use ratchet_domain::{FailureKind, SectionKind};

    fn builder(ws: Arc<MemoryWorkspace>) -> (IncrementalBuilder, Arc<CheckpointStore>) {
        let checkpoints = Arc::new(CheckpointStore::new(ws.clone()));
        let builder = IncrementalBuilder::new(
            ws,
            checkpoints.clone(),
            Arc::new(CodeValidator::default()),
        );
        (builder, checkpoints)
    }

    fn section(id: &str, content: &str, deps: &[&str]) -> CodeSection {
        let mut s = CodeSection::new(id, SectionKind::Functions, content);
        s.dependencies = deps.iter().map(|d| d.to_string()).collect();
        s
    }

    #[tokio::test]
    async fn test_sections_inserted_in_dependency_order() {
        let ws = Arc::new(MemoryWorkspace::new());
        let (builder, checkpoints) = builder(ws.clone());
        let sections = vec![
            section("main", "fn main() {\n    helper();\n}\n", &["helper"]),
            section("helper", "fn helper() {}\n", &["imports"]),
            section("imports", "use std::fmt;\n", &[]),
        ];
        let report = builder.build("src/main.rs", &sections, 80).await.unwrap();

        assert!(report.success);
        assert_eq!(report.sections_added, vec!["imports", "helper", "main"]);
        assert_eq!(
            ws.text("src/main.rs").unwrap(),
            "use std::fmt;\nfn helper() {}\nfn main() {\n    helper();\n}\n"
        );
        assert_eq!(report.final_line_count, 5);
        assert_eq!(checkpoints.len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_section_rolled_back_and_dependents_skipped() {
        let ws = Arc::new(MemoryWorkspace::new());
        let (builder, _) = builder(ws.clone());
        let sections = vec![
            section("good", "fn good() {}\n", &[]),
            section("bad", "fn bad() {\n    let x = (1;\n", &[]),
            section("user", "fn user() { bad(); }\n", &["bad"]),
            section("indirect", "fn indirect() { user(); }\n", &["user"]),
        ];
        let report = builder.build("lib.rs", &sections, 80).await.unwrap();

        assert!(!report.success);
        assert_eq!(report.sections_added, vec!["good"]);
        assert_eq!(ws.text("lib.rs").unwrap(), "fn good() {}\n");
        let kinds: Vec<_> = report
            .failures
            .iter()
            .map(|f| (f.section_id.as_str(), f.kind))
            .collect();
        assert_eq!(
            kinds,
            vec![
                ("bad", FailureKind::Invalid),
                ("user", FailureKind::DependencyFailed),
                ("indirect", FailureKind::DependencyFailed),
            ]
        );
        assert_eq!(report.skipped().count(), 2);
    }

    #[tokio::test]
    async fn test_cycle_reported_before_any_write() {
        let ws = Arc::new(MemoryWorkspace::new());
        ws.insert("lib.rs", "// original\n");
        let (builder, checkpoints) = builder(ws.clone());
        let sections = vec![section("a", "", &["b"]), section("b", "", &["a"])];
        let err = builder.build("lib.rs", &sections, 80).await.unwrap_err();

        assert!(matches!(
            err,
            BuildError::InvalidSections(DomainError::DependencyCycle(_))
        ));
        assert_eq!(ws.text("lib.rs").unwrap(), "// original\n");
        assert!(checkpoints.is_empty());
    }

    #[tokio::test]
    async fn test_oversized_section_split_and_validated_as_a_whole() {
        let ws = Arc::new(MemoryWorkspace::new());
        let (builder, _) = builder(ws.clone());
        let body = "fn long() {\n    let a = 1;\n\n    let b = 2;\n\n    let c = a + b;\n}\n";
        let sections = vec![section("long", body, &[]), section("after", "fn after() {}\n", &["long"])];
        let report = builder.build("lib.rs", &sections, 3).await.unwrap();

        assert!(report.success, "{:?}", report.failures);
        assert!(report.sections_added.len() > 2);
        assert!(report.sections_added.iter().all(|id| id.starts_with("long#") || id == "after"));
        assert_eq!(ws.text("lib.rs").unwrap(), format!("{}fn after() {{}}\n", body));
    }

    #[tokio::test]
    async fn test_broken_split_section_rolls_back_every_part() {
        let ws = Arc::new(MemoryWorkspace::new());
        let (builder, _) = builder(ws.clone());
        let body = "fn open() {\n    let a = 1;\n\n    let b = 2;\n";
        let sections = vec![section("first", "fn first() {}\n", &[]), section("open", body, &["first"])];
        let report = builder.build("lib.rs", &sections, 2).await.unwrap();

        assert_eq!(report.sections_added, vec!["first"]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].section_id, "open");
        assert_eq!(ws.text("lib.rs").unwrap(), "fn first() {}\n");
    }

    #[tokio::test]
    async fn test_workspace_failure_restores_checkpoint() {
        let ws = Arc::new(MemoryWorkspace::new());
        ws.insert("ro.rs", "// keep\n");
        ws.deny_writes("ro.rs");
        let (builder, _) = builder(ws.clone());
        let err = builder
            .build("ro.rs", &[section("a", "fn a() {}\n", &[])], 80)
            .await
            .unwrap_err();
        assert!(matches!(err, BuildError::Workspace(_)));
        assert_eq!(ws.text("ro.rs").unwrap(), "// keep\n");
    }
}
