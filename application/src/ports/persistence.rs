//! Port for recording what the agent did.
//!
//! Separate from `tracing` diagnostics: tracing carries human-readable
//! operation logs, while this port receives action records, loop signals and
//! approved plan steps as structured data.
//!
//! Failures are returned so the caller can log them; the controller never
//! aborts a task because a record could not be stored.

use ratchet_domain::{ActionRecord, LoopSignal, PlanId, PlanStep};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub trait PersistenceStore: Send + Sync {
    fn append_action_record(&self, record: &ActionRecord) -> Result<(), PersistenceError>;

    fn append_error_pattern(&self, signal: &LoopSignal) -> Result<(), PersistenceError>;

    fn append_plan_step(&self, plan: &PlanId, step: &PlanStep) -> Result<(), PersistenceError>;
}

/// No-op implementation for tests and when persistence is disabled.
pub struct NoPersistence;

impl PersistenceStore for NoPersistence {
    fn append_action_record(&self, _record: &ActionRecord) -> Result<(), PersistenceError> {
        Ok(())
    }

    fn append_error_pattern(&self, _signal: &LoopSignal) -> Result<(), PersistenceError> {
        Ok(())
    }

    fn append_plan_step(&self, _plan: &PlanId, _step: &PlanStep) -> Result<(), PersistenceError> {
        Ok(())
    }
}
