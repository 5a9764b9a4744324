//! Configuration issues found while turning file values into typed settings.
//!
//! Invalid values never fail loading: the setting falls back to its default
//! and an issue is returned so the caller can warn about it.

/// Severity level of a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Fatal: the configuration cannot work at all.
    Error,
    /// Non-fatal: a default was used instead.
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigIssueCode {
    /// A string field held a value outside its enum.
    InvalidEnumValue {
        field: String,
        value: String,
        valid_values: Vec<String>,
    },
    /// A numeric field broke an ordering or range constraint.
    InvalidConstraint { field: String, reason: String },
}

#[derive(Debug, Clone)]
pub struct ConfigIssue {
    pub severity: Severity,
    pub code: ConfigIssueCode,
    pub message: String,
}

impl ConfigIssue {
    pub fn invalid_enum(field: &str, value: &str, valid_values: &[&str], fallback: &str) -> Self {
        Self {
            severity: Severity::Warning,
            code: ConfigIssueCode::InvalidEnumValue {
                field: field.to_string(),
                value: value.to_string(),
                valid_values: valid_values.iter().map(|v| v.to_string()).collect(),
            },
            message: format!(
                "{}: unknown value '{}', falling back to '{}'",
                field, value, fallback
            ),
        }
    }

    pub fn invalid_constraint(field: &str, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self {
            severity: Severity::Warning,
            message: format!("{}: {}, using defaults", field, reason),
            code: ConfigIssueCode::InvalidConstraint {
                field: field.to_string(),
                reason,
            },
        }
    }

    pub fn field(&self) -> &str {
        match &self.code {
            ConfigIssueCode::InvalidEnumValue { field, .. }
            | ConfigIssueCode::InvalidConstraint { field, .. } => field,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_enum_message_names_fallback() {
        let issue = ConfigIssue::invalid_enum(
            "verification.level",
            "paranoid",
            &["minimal", "standard", "thorough"],
            "standard",
        );
        assert_eq!(issue.severity, Severity::Warning);
        assert_eq!(issue.field(), "verification.level");
        assert!(issue.message.contains("'paranoid'"));
        assert!(issue.message.contains("'standard'"));
    }
}
