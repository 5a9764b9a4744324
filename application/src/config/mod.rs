//! Application-level configuration.
//!
//! - [`AgentConfig`]: limits, optional features and policies of an agent run

pub mod agent_config;

pub use agent_config::AgentConfig;
