//! Tool Registry
//!
//! The [`ToolRegistry`] maps each [`ToolKind`] to the handler registered for
//! it at startup. Dispatch is a typed map lookup: names are resolved to kinds
//! once, when the action is parsed.
//!
//! # Usage
//!
//! ```ignore
//! let registry = ToolRegistry::new()
//!     .register(ToolKind::ReadFile, Arc::new(ReadFileTool::new(root)))
//!     .register(ToolKind::RunCommand, Arc::new(CommandTool::new(root)));
//!
//! let invocation = ToolInvocation::new(ToolKind::ReadFile).with_arg("path", "README.md");
//! let outcome = registry.dispatch(&invocation).await;
//! ```

use crate::ports::tool_executor::ToolExecutor;
use ratchet_domain::{DefaultToolValidator, ToolError, ToolInvocation, ToolKind, ToolOutcome, ToolValidator};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

#[derive(Clone, Default)]
pub struct ToolRegistry {
    handlers: HashMap<ToolKind, Arc<dyn ToolExecutor>>,
    validator: DefaultToolValidator,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the handler for `kind`, replacing any earlier one.
    pub fn register(mut self, kind: ToolKind, handler: Arc<dyn ToolExecutor>) -> Self {
        self.handlers.insert(kind, handler);
        self
    }

    pub fn has(&self, kind: &ToolKind) -> bool {
        self.handlers.contains_key(kind)
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Registered kinds: built-ins in their canonical order, then custom
    /// tools by name.
    pub fn kinds(&self) -> Vec<ToolKind> {
        let mut kinds: Vec<ToolKind> = ToolKind::BUILTIN
            .iter()
            .filter(|k| self.has(k))
            .cloned()
            .collect();
        let mut custom: Vec<ToolKind> = self
            .handlers
            .keys()
            .filter(|k| matches!(k, ToolKind::Custom(_)))
            .cloned()
            .collect();
        custom.sort_by(|a, b| a.name().cmp(b.name()));
        kinds.extend(custom);
        kinds
    }

    /// Validate and execute an invocation.
    ///
    /// Unknown tools and invalid arguments come back as failed outcomes, so
    /// the model sees them as observations.
    pub async fn dispatch(&self, invocation: &ToolInvocation) -> ToolOutcome {
        let Some(handler) = self.handlers.get(&invocation.kind) else {
            let available = self
                .kinds()
                .iter()
                .map(|k| k.name().to_string())
                .collect::<Vec<_>>()
                .join(", ");
            return ToolOutcome::failure(ToolError::not_found(format!(
                "tool '{}' (available: {})",
                invocation.kind, available
            )));
        };
        if let Err(message) = self.validator.validate(invocation) {
            return ToolOutcome::failure(ToolError::invalid_argument(message));
        }
        debug!(tool = %invocation.kind, "Dispatching tool");
        handler.execute(invocation).await
    }
}
