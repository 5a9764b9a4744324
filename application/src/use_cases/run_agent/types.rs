//! Type definitions for the AgentController.

use crate::use_cases::plan_task::PlanningError;
use ratchet_domain::{CheckResult, DomainError, ParserEvent, PlanStep};
use thiserror::Error;

/// Errors that end `run` without an [`AgentOutcome`](ratchet_domain::AgentOutcome).
///
/// Environmental failures (gateway, workspace, context budget) and
/// cancellation are not errors: they produce an ABORTED outcome.
#[derive(Error, Debug)]
pub enum RunAgentError {
    #[error("Planning failed: {0}")]
    Planning(#[from] PlanningError),

    #[error(transparent)]
    Domain(#[from] DomainError),
}

/// Result of one streamed model turn.
#[derive(Debug, Default)]
pub(super) struct Turn {
    /// Everything the model wrote, including action blocks.
    pub text: String,
    /// Text outside action blocks.
    pub thoughts: String,
    /// Parsed actions and parse errors in stream order.
    pub events: Vec<ParserEvent>,
}

impl Turn {
    pub fn is_final(&self) -> bool {
        self.events.is_empty()
    }
}

pub(super) enum TurnResult {
    Finished(Turn),
    /// Cancelled mid-stream; holds what arrived before.
    Cancelled(Turn),
}

/// What happened to a single dispatched action.
pub(super) struct Dispatched {
    pub record: ratchet_domain::ActionRecord,
    /// Unit-test failures from post-write verification.
    pub deferred: Vec<CheckResult>,
}

/// A plan decision that stopped the run before any iteration.
#[derive(Debug, Clone, PartialEq)]
pub enum PlanOutcome {
    Rejected,
    /// The caller supplied replacement steps.
    Modified(Vec<PlanStep>),
}
