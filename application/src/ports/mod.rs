//! Port definitions (interfaces for external adapters)
//!
//! Ports define the contracts that infrastructure adapters must implement.

pub mod agent_events;
pub mod model_gateway;
pub mod persistence;
pub mod syntax;
pub mod tool_executor;
pub mod toolchain;
pub mod workspace;
