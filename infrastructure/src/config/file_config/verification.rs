//! Verification configuration from TOML (`[verification]` section)

use ratchet_domain::{ConfigIssue, VerificationLevel};
use serde::{Deserialize, Serialize};

/// Raw verification configuration from TOML
///
/// # Example
///
/// ```toml
/// [verification]
/// level = "standard"            # "off", "minimal", "standard", "thorough"
/// lint_command = "ruff check {file}"
/// test_command = "pytest -q"
/// timeout_secs = 120
/// ```
///
/// Command templates replace the detected toolchain for their check;
/// `{file}` is substituted with the workspace-relative path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileVerificationConfig {
    pub level: String,
    pub lint_command: Option<String>,
    pub type_command: Option<String>,
    pub test_command: Option<String>,
    pub timeout_secs: u64,
}

impl Default for FileVerificationConfig {
    fn default() -> Self {
        Self {
            level: "off".to_string(),
            lint_command: None,
            type_command: None,
            test_command: None,
            timeout_secs: 120,
        }
    }
}

impl FileVerificationConfig {
    /// `None` when verification is off.
    pub fn parse_level(&self) -> (Option<VerificationLevel>, Vec<ConfigIssue>) {
        match self.level.trim().to_ascii_lowercase().as_str() {
            "off" | "none" | "" => (None, vec![]),
            other => match other.parse::<VerificationLevel>() {
                Ok(level) => (Some(level), vec![]),
                Err(_) => {
                    let issue = ConfigIssue::invalid_enum(
                        "verification.level",
                        &self.level,
                        &["off", "minimal", "standard", "thorough"],
                        "off",
                    );
                    (None, vec![issue])
                }
            },
        }
    }

    pub fn parse_timeout_secs(&self) -> (u64, Vec<ConfigIssue>) {
        if self.timeout_secs > 0 {
            return (self.timeout_secs, vec![]);
        }
        let fallback = Self::default().timeout_secs;
        let issue =
            ConfigIssue::invalid_constraint("verification.timeout_secs", "must be at least 1");
        (fallback, vec![issue])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_parsing() {
        let mut config = FileVerificationConfig::default();
        assert_eq!(config.parse_level().0, None);

        config.level = "Thorough".to_string();
        assert_eq!(config.parse_level().0, Some(VerificationLevel::Thorough));

        config.level = "paranoid".to_string();
        let (level, issues) = config.parse_level();
        assert_eq!(level, None);
        assert_eq!(issues.len(), 1);
        assert!(issues[0].message.contains("'paranoid'"));
    }

    #[test]
    fn test_command_templates_deserialize() {
        let toml_str = r#"
[verification]
level = "standard"
lint_command = "ruff check {file}"
timeout_secs = 0
"#;
        let config: super::super::FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(
            config.verification.lint_command.as_deref(),
            Some("ruff check {file}")
        );
        assert!(config.verification.test_command.is_none());
        let (timeout, issues) = config.verification.parse_timeout_secs();
        assert_eq!(timeout, 120);
        assert_eq!(issues.len(), 1);
    }
}
