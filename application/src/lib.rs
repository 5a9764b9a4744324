//! Application layer for ratchet
//!
//! This crate contains use cases, port definitions, the tool registry and
//! application configuration. It depends only on the domain layer.

pub mod config;
pub mod ports;
pub mod tool_registry;
pub mod use_cases;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used types
pub use config::AgentConfig;
pub use ports::{
    agent_events::{AgentEvent, AgentEventSink, NoEvents},
    model_gateway::{GatewayError, ModelGateway, StreamHandle},
    persistence::{NoPersistence, PersistenceError, PersistenceStore},
    syntax::{ParseCheck, StructuralParser, SyntaxParser},
    tool_executor::ToolExecutor,
    toolchain::{CheckRun, Linter, NoToolchain, TestRunner, TypeChecker},
    workspace::{WorkspaceError, WorkspacePort},
};
pub use tool_registry::ToolRegistry;
pub use use_cases::build_incrementally::{BuildError, IncrementalBuilder};
pub use use_cases::checkpoints::{CheckpointError, CheckpointStore};
pub use use_cases::manage_context::{ContextError, ContextManager};
pub use use_cases::plan_task::{
    PlanApprovals, PlanDecision, PlanResolution, PlanningError, TaskPlanner,
};
pub use use_cases::run_agent::{AgentController, PlanOutcome, RunAgentError};
pub use use_cases::validate_code::{CodeValidator, ValidationReport};
pub use use_cases::verify_changes::VerificationLoop;
