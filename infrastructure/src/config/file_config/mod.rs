//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! They are deserialized directly and use domain types where appropriate.
//! Turning them into an [`AgentConfig`] never fails on a bad value: the
//! setting falls back to its default and a [`ConfigIssue`] is reported.

mod agent;
mod context;
mod correction;
mod logging;
mod output;
mod planner;
mod verification;

pub use agent::FileAgentConfig;
pub use context::FileContextConfig;
pub use correction::parse_thresholds;
pub use logging::FileLoggingConfig;
pub use output::FileOutputConfig;
pub use planner::FilePlannerConfig;
pub use verification::FileVerificationConfig;

use ratchet_application::AgentConfig;
use ratchet_domain::{ConfigIssue, LoopThresholds, ModelId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Values no fallback can repair.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigValidationError {
    #[error("agent.model cannot be empty")]
    EmptyModelName,

    #[error("agent.max_iterations cannot be 0")]
    ZeroIterations,
}

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Loop limits and optional features
    pub agent: FileAgentConfig,
    /// Context window compression
    pub context: FileContextConfig,
    /// Loop detection thresholds
    pub correction: LoopThresholds,
    /// Complexity keywords
    pub planner: FilePlannerConfig,
    /// Post-write verification
    pub verification: FileVerificationConfig,
    /// Log file and record persistence
    pub logging: FileLoggingConfig,
    /// Output settings
    pub output: FileOutputConfig,
}

impl FileConfig {
    /// Validate the entire configuration, returning all detected issues.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        self.to_agent_config_lenient().1
    }

    /// Build the agent configuration.
    ///
    /// Fails only on [`ConfigValidationError`]; everything else is reported
    /// as issues alongside a usable config.
    pub fn to_agent_config(&self) -> Result<(AgentConfig, Vec<ConfigIssue>), ConfigValidationError> {
        self.agent.validate()?;
        Ok(self.to_agent_config_lenient())
    }

    fn to_agent_config_lenient(&self) -> (AgentConfig, Vec<ConfigIssue>) {
        let mut issues = Vec::new();

        let (lookahead, agent_issues) = self.agent.parse_ceiling_lookahead();
        issues.extend(agent_issues);
        let (compression, context_issues) = self.context.to_policy();
        issues.extend(context_issues);
        let (thresholds, correction_issues) = parse_thresholds(&self.correction);
        issues.extend(correction_issues);
        let (planner, planner_issues) = self.planner.to_planner_config();
        issues.extend(planner_issues);
        let (level, level_issues) = self.verification.parse_level();
        issues.extend(level_issues);
        issues.extend(self.verification.parse_timeout_secs().1);

        let config = AgentConfig::new(ModelId::new(self.agent.model.trim()))
            .with_max_iterations(self.agent.max_iterations)
            .with_ceiling_lookahead(lookahead)
            .with_task_planning(self.agent.enable_task_planning)
            .with_prompt_builder(self.agent.enable_prompt_builder)
            .with_parallel_independent(self.agent.allow_parallel_independent)
            .with_plan_approval_timeout(self.agent.plan_approval_timeout())
            .with_max_section_lines(self.agent.max_section_lines)
            .with_verification_level(level)
            .with_compression(compression)
            .with_loop_thresholds(thresholds)
            .with_planner(planner);

        (config, issues)
    }
}
