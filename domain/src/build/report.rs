use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Inserting the section left the file unparseable; it was rolled back.
    Invalid,
    /// A section it depends on failed or was skipped.
    DependencyFailed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionFailure {
    pub section_id: String,
    pub kind: FailureKind,
    pub reason: String,
}

impl SectionFailure {
    pub fn invalid(section_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            section_id: section_id.into(),
            kind: FailureKind::Invalid,
            reason: reason.into(),
        }
    }

    pub fn dependency_failed(section_id: impl Into<String>, dependency: &str) -> Self {
        Self {
            section_id: section_id.into(),
            kind: FailureKind::DependencyFailed,
            reason: format!("depends on '{}', which was not added", dependency),
        }
    }
}

/// Result of an incremental build.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BuildReport {
    pub success: bool,
    /// Ids of the sections inserted, in insertion order.
    pub sections_added: Vec<String>,
    pub final_line_count: usize,
    pub failures: Vec<SectionFailure>,
}

impl BuildReport {
    pub fn new(sections_added: Vec<String>, failures: Vec<SectionFailure>, final_content: &str) -> Self {
        Self {
            success: failures.is_empty(),
            sections_added,
            final_line_count: crate::core::string::line_count(final_content),
            failures,
        }
    }

    pub fn skipped(&self) -> impl Iterator<Item = &SectionFailure> {
        self.failures
            .iter()
            .filter(|f| f.kind == FailureKind::DependencyFailed)
    }
}
