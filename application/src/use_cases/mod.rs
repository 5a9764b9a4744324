//! Use cases
//!
//! Application-level operations that orchestrate domain logic through the
//! ports.

pub mod build_incrementally;
pub mod checkpoints;
pub mod manage_context;
pub mod plan_task;
pub mod run_agent;
pub(crate) mod shared;
pub mod validate_code;
pub mod verify_changes;
