//! Context window configuration from TOML (`[context]` section)

use ratchet_domain::{CompressionPolicy, CompressionTier, ConfigIssue};
use serde::{Deserialize, Serialize};

/// Compression thresholds for the conversation history.
///
/// # Example
///
/// ```toml
/// [context]
/// warn_ratio = 0.80
/// aggressive_ratio = 0.95
/// target_ratio = 0.70
/// keep_recent = 3
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileContextConfig {
    pub warn_ratio: f64,
    pub aggressive_ratio: f64,
    pub target_ratio: f64,
    /// Messages at the tail that are never summarised
    pub keep_recent: usize,
    pub standard_batch: usize,
    pub aggressive_batch: usize,
    /// Tokens held back for the summary request itself
    pub summary_reserve_tokens: usize,
    /// Window size assumed when the gateway does not report one
    pub fallback_context_tokens: usize,
}

impl Default for FileContextConfig {
    fn default() -> Self {
        let policy = CompressionPolicy::default();
        Self {
            warn_ratio: policy.warn_ratio(),
            aggressive_ratio: policy.aggressive_ratio(),
            target_ratio: policy.target_ratio(),
            keep_recent: policy.keep_recent(),
            standard_batch: policy.batch_size(CompressionTier::Standard),
            aggressive_batch: policy.batch_size(CompressionTier::Aggressive),
            summary_reserve_tokens: policy.summary_reserve_tokens(),
            fallback_context_tokens: policy.fallback_context_tokens(),
        }
    }
}

impl FileContextConfig {
    /// Convert to the domain policy.
    ///
    /// Ratios that break `0 < target < warn <= aggressive <= 1` fall back to
    /// the default policy as a whole, with a warning.
    pub fn to_policy(&self) -> (CompressionPolicy, Vec<ConfigIssue>) {
        let policy = CompressionPolicy::default()
            .with_thresholds(self.warn_ratio, self.aggressive_ratio, self.target_ratio)
            .with_keep_recent(self.keep_recent)
            .with_batch_sizes(self.standard_batch, self.aggressive_batch)
            .with_summary_reserve_tokens(self.summary_reserve_tokens)
            .with_fallback_context_tokens(self.fallback_context_tokens);

        let mut issues = Vec::new();
        if let Err(reason) = policy.validate() {
            issues.push(ConfigIssue::invalid_constraint("context", reason));
        }
        if self.standard_batch == 0 || self.aggressive_batch == 0 {
            issues.push(ConfigIssue::invalid_constraint(
                "context.standard_batch",
                "batch sizes must be at least 1",
            ));
        }

        if issues.is_empty() {
            (policy, issues)
        } else {
            (CompressionPolicy::default(), issues)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_round_trips_to_default_policy() {
        let (policy, issues) = FileContextConfig::default().to_policy();
        assert!(issues.is_empty());
        assert_eq!(policy, CompressionPolicy::default());
    }

    #[test]
    fn test_context_config_deserialize() {
        let toml_str = r#"
[context]
warn_ratio = 0.6
target_ratio = 0.5
keep_recent = 5
"#;
        let config: super::super::FileConfig = toml::from_str(toml_str).unwrap();
        let (policy, issues) = config.context.to_policy();
        assert!(issues.is_empty());
        assert_eq!(policy.warn_ratio(), 0.6);
        assert_eq!(policy.keep_recent(), 5);
        assert_eq!(policy.aggressive_ratio(), 0.95);
    }

    #[test]
    fn test_unordered_ratios_fall_back_to_default() {
        let config = FileContextConfig {
            warn_ratio: 0.5,
            target_ratio: 0.9,
            ..Default::default()
        };
        let (policy, issues) = config.to_policy();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].field(), "context");
        assert_eq!(policy, CompressionPolicy::default());
    }
}
