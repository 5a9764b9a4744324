//! Agent configuration from TOML (`[agent]` section)

use super::ConfigValidationError;
use ratchet_domain::ConfigIssue;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Raw agent configuration from TOML
///
/// # Example
///
/// ```toml
/// [agent]
/// model = "gpt-5-mini"
/// max_iterations = 50
/// ceiling_lookahead = 5
/// enable_task_planning = true
/// enable_prompt_builder = true
/// allow_parallel_independent = false
/// plan_approval_timeout_ms = 2000
/// max_section_lines = 80
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileAgentConfig {
    /// Model name handed to the gateway
    pub model: String,
    /// Hard ceiling on ReAct iterations
    pub max_iterations: usize,
    /// Iterations before the ceiling at which a warning is emitted
    pub ceiling_lookahead: usize,
    pub enable_task_planning: bool,
    pub enable_prompt_builder: bool,
    pub allow_parallel_independent: bool,
    /// Auto-approval delay for moderate plans
    pub plan_approval_timeout_ms: u64,
    /// Incremental builder split threshold
    pub max_section_lines: usize,
}

impl Default for FileAgentConfig {
    fn default() -> Self {
        Self {
            model: "default".to_string(),
            max_iterations: 50,
            ceiling_lookahead: 5,
            enable_task_planning: false,
            enable_prompt_builder: false,
            allow_parallel_independent: false,
            plan_approval_timeout_ms: 2000,
            max_section_lines: 80,
        }
    }
}

impl FileAgentConfig {
    /// Fatal checks: a run cannot start with these values.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.model.trim().is_empty() {
            return Err(ConfigValidationError::EmptyModelName);
        }
        if self.max_iterations == 0 {
            return Err(ConfigValidationError::ZeroIterations);
        }
        Ok(())
    }

    /// A lookahead at or past the ceiling would warn on the first
    /// iteration; fall back to the default instead.
    pub fn parse_ceiling_lookahead(&self) -> (usize, Vec<ConfigIssue>) {
        if self.ceiling_lookahead < self.max_iterations {
            return (self.ceiling_lookahead, vec![]);
        }
        let fallback = Self::default().ceiling_lookahead.min(self.max_iterations.saturating_sub(1));
        let issue = ConfigIssue::invalid_constraint(
            "agent.ceiling_lookahead",
            format!(
                "must be below max_iterations ({}), got {}",
                self.max_iterations, self.ceiling_lookahead
            ),
        );
        (fallback, vec![issue])
    }

    pub fn plan_approval_timeout(&self) -> Duration {
        Duration::from_millis(self.plan_approval_timeout_ms)
    }
}
