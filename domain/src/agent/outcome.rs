//! Terminal result of a task.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AgentStatus {
    Complete,
    Aborted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum AbortReason {
    /// The iteration ceiling was reached.
    MaxIterations { limit: usize },
    /// A loop detector escalated to ABORT.
    LoopDetected { kind: String, message: String },
    /// Context could not be brought under the model's limit.
    ContextExhausted { diagnostic: String },
    /// The model gateway failed; not retried.
    Gateway { message: String },
    /// The workspace could not be read or written.
    Workspace { message: String },
    /// The plan was rejected or replaced before execution.
    PlanRejected,
    Cancelled,
}

impl std::fmt::Display for AbortReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AbortReason::MaxIterations { limit } => {
                write!(f, "iteration ceiling reached ({} iterations)", limit)
            }
            AbortReason::LoopDetected { kind, message } => write!(f, "{}: {}", kind, message),
            AbortReason::ContextExhausted { diagnostic } => {
                write!(f, "context budget exhausted: {}", diagnostic)
            }
            AbortReason::Gateway { message } => write!(f, "model gateway error: {}", message),
            AbortReason::Workspace { message } => write!(f, "workspace error: {}", message),
            AbortReason::PlanRejected => write!(f, "plan rejected"),
            AbortReason::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentOutcome {
    pub status: AgentStatus,
    pub iterations_taken: usize,
    pub files_touched: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub abort_reason: Option<AbortReason>,
}

impl AgentOutcome {
    pub fn complete(iterations_taken: usize, files_touched: Vec<String>) -> Self {
        Self {
            status: AgentStatus::Complete,
            iterations_taken,
            files_touched,
            abort_reason: None,
        }
    }

    pub fn aborted(
        iterations_taken: usize,
        files_touched: Vec<String>,
        reason: AbortReason,
    ) -> Self {
        Self {
            status: AgentStatus::Aborted,
            iterations_taken,
            files_touched,
            abort_reason: Some(reason),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.status == AgentStatus::Complete
    }
}
