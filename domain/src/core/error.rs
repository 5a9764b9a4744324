//! Domain error types

use thiserror::Error;

/// Domain-level errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Invalid plan transition: {from} -> {to}")]
    InvalidPlanTransition { from: String, to: String },

    #[error("Invalid phase transition: {from} -> {to}")]
    InvalidPhaseTransition { from: String, to: String },

    #[error("Iteration index {got} out of order (expected {expected})")]
    NonMonotonicIteration { expected: usize, got: usize },

    #[error("Dependency cycle between sections: {}", .0.join(" -> "))]
    DependencyCycle(Vec<String>),

    #[error("Section '{section}' depends on unknown section '{dependency}'")]
    UnknownDependency { section: String, dependency: String },

    #[error("Duplicate section id: {0}")]
    DuplicateSection(String),

    #[error("Invalid task: {0}")]
    InvalidTask(String),

    #[error("Operation cancelled")]
    Cancelled,
}

impl DomainError {
    /// Check if this error represents a cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, DomainError::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancelled_error_display() {
        let error = DomainError::Cancelled;
        assert_eq!(error.to_string(), "Operation cancelled");
    }

    #[test]
    fn test_cycle_display_joins_ids() {
        let error = DomainError::DependencyCycle(vec!["a".into(), "b".into(), "a".into()]);
        assert_eq!(
            error.to_string(),
            "Dependency cycle between sections: a -> b -> a"
        );
    }

    #[test]
    fn test_is_cancelled_check() {
        assert!(DomainError::Cancelled.is_cancelled());
        assert!(!DomainError::InvalidTask("empty".to_string()).is_cancelled());
    }
}
