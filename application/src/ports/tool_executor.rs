//! Tool executor port
//!
//! One handler per tool kind. The [`ToolRegistry`](crate::tool_registry::ToolRegistry)
//! maps kinds to handlers; adapters live in the infrastructure layer.

use async_trait::async_trait;
use ratchet_domain::{ToolInvocation, ToolOutcome};

/// Port for tool execution
///
/// Failures are reported in the outcome, never as a panic or error value:
/// a failed tool call is an observation the model can react to.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    async fn execute(&self, invocation: &ToolInvocation) -> ToolOutcome;
}
