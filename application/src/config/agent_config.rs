//! Agent configuration: explicit settings handed to the controller.
//!
//! [`AgentConfig`] groups everything that shapes one agent run: loop limits,
//! optional features, and the policies of the planner, context manager and
//! self-corrector. The infrastructure config loader builds it from files and
//! environment variables; tests build it directly.

use ratchet_domain::{
    CompressionPolicy, LoopThresholds, ModelId, PlannerConfig, VerificationLevel,
};
use std::time::Duration;

/// Configuration for one agent run.
///
/// # Optional features
///
/// | Field | Default | Effect when set |
/// |-------|---------|-----------------|
/// | `enable_task_planning` | off | classify the task and draft a plan before the loop |
/// | `enable_prompt_builder` | off | prepend the built-in system prompt when history has none |
/// | `verification_level` | `None` | run the verification loop after each write |
/// | `allow_parallel_independent` | off | run a batch of independent actions concurrently |
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub model: ModelId,
    pub max_iterations: usize,
    /// Iterations before the ceiling at which a warning is emitted.
    pub ceiling_lookahead: usize,
    pub enable_task_planning: bool,
    pub enable_prompt_builder: bool,
    pub verification_level: Option<VerificationLevel>,
    pub allow_parallel_independent: bool,
    /// How long a moderate plan waits for a decision before auto-approval.
    pub plan_approval_timeout: Duration,
    /// Sections longer than this are split by the incremental builder.
    pub max_section_lines: usize,
    pub compression: CompressionPolicy,
    pub loop_thresholds: LoopThresholds,
    pub planner: PlannerConfig,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: ModelId::default(),
            max_iterations: 50,
            ceiling_lookahead: 5,
            enable_task_planning: false,
            enable_prompt_builder: false,
            verification_level: None,
            allow_parallel_independent: false,
            plan_approval_timeout: Duration::from_secs(2),
            max_section_lines: 80,
            compression: CompressionPolicy::default(),
            loop_thresholds: LoopThresholds::default(),
            planner: PlannerConfig::default(),
        }
    }
}

impl AgentConfig {
    pub fn new(model: impl Into<ModelId>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    /// Index at which the ceiling warning fires.
    pub fn ceiling_warning_at(&self) -> usize {
        self.max_iterations.saturating_sub(self.ceiling_lookahead)
    }

    // ==================== Builder Methods ====================

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_ceiling_lookahead(mut self, lookahead: usize) -> Self {
        self.ceiling_lookahead = lookahead;
        self
    }

    pub fn with_task_planning(mut self, enabled: bool) -> Self {
        self.enable_task_planning = enabled;
        self
    }

    pub fn with_prompt_builder(mut self, enabled: bool) -> Self {
        self.enable_prompt_builder = enabled;
        self
    }

    pub fn with_verification_level(mut self, level: Option<VerificationLevel>) -> Self {
        self.verification_level = level;
        self
    }

    pub fn with_parallel_independent(mut self, enabled: bool) -> Self {
        self.allow_parallel_independent = enabled;
        self
    }

    pub fn with_plan_approval_timeout(mut self, timeout: Duration) -> Self {
        self.plan_approval_timeout = timeout;
        self
    }

    pub fn with_max_section_lines(mut self, lines: usize) -> Self {
        self.max_section_lines = lines.max(1);
        self
    }

    pub fn with_compression(mut self, policy: CompressionPolicy) -> Self {
        self.compression = policy;
        self
    }

    pub fn with_loop_thresholds(mut self, thresholds: LoopThresholds) -> Self {
        self.loop_thresholds = thresholds;
        self
    }

    pub fn with_planner(mut self, planner: PlannerConfig) -> Self {
        self.planner = planner;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AgentConfig::default();
        assert_eq!(config.max_iterations, 50);
        assert_eq!(config.ceiling_warning_at(), 45);
        assert!(!config.enable_task_planning);
        assert!(config.verification_level.is_none());
        assert_eq!(config.plan_approval_timeout, Duration::from_secs(2));
    }

    #[test]
    fn test_builder_chain() {
        let config = AgentConfig::new("gpt-5-mini")
            .with_max_iterations(3)
            .with_ceiling_lookahead(10)
            .with_verification_level(Some(VerificationLevel::Minimal));
        assert_eq!(config.model.as_str(), "gpt-5-mini");
        assert_eq!(config.ceiling_warning_at(), 0);
        assert_eq!(config.verification_level, Some(VerificationLevel::Minimal));
    }
}
