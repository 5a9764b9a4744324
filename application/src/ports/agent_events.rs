//! Agent event port.
//!
//! [`AgentEventSink`] is an **output port**: the controller emits an
//! [`AgentEvent`] at every step of the loop and the presentation layer (or
//! an embedding application) decides what to show. Emission is synchronous
//! and infallible; a sink that cannot deliver drops the event.

use ratchet_domain::{
    ActionRecord, AgentOutcome, AgentPhase, ContextWindowState, ExecutionPlan, LoopSignal,
    ToolInvocation,
};
use tokio::sync::mpsc;

#[derive(Debug, Clone)]
pub enum AgentEvent {
    PhaseChanged {
        iteration: usize,
        phase: AgentPhase,
    },
    /// Model text of the current turn, streamed as it arrives.
    Thought {
        iteration: usize,
        text: String,
    },
    Action {
        iteration: usize,
        invocation: ToolInvocation,
    },
    Observation {
        iteration: usize,
        record: ActionRecord,
    },
    Reflection {
        iteration: usize,
        summary: String,
    },
    LoopWarning(LoopSignal),
    PlanApprovalRequest(ExecutionPlan),
    CompressionApplied(ContextWindowState),
    IterationCeilingWarning {
        iteration: usize,
        max_iterations: usize,
    },
    Completed(AgentOutcome),
}

impl AgentEvent {
    /// Event name as used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            AgentEvent::PhaseChanged { .. } => "phase_changed",
            AgentEvent::Thought { .. } => "thought",
            AgentEvent::Action { .. } => "action",
            AgentEvent::Observation { .. } => "observation",
            AgentEvent::Reflection { .. } => "reflection",
            AgentEvent::LoopWarning(_) => "loop_warning",
            AgentEvent::PlanApprovalRequest(_) => "plan_approval_request",
            AgentEvent::CompressionApplied(_) => "compression_applied",
            AgentEvent::IterationCeilingWarning { .. } => "iteration_ceiling_warning",
            AgentEvent::Completed(_) => "completed",
        }
    }
}

pub trait AgentEventSink: Send + Sync {
    fn emit(&self, event: AgentEvent);
}

/// Sink that discards every event.
pub struct NoEvents;

impl AgentEventSink for NoEvents {
    fn emit(&self, _event: AgentEvent) {}
}

impl AgentEventSink for mpsc::UnboundedSender<AgentEvent> {
    fn emit(&self, event: AgentEvent) {
        // receiver gone: nobody is listening any more
        let _ = self.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unbounded_sender_sink() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        tx.emit(AgentEvent::IterationCeilingWarning {
            iteration: 45,
            max_iterations: 50,
        });
        let event = rx.try_recv().unwrap();
        assert_eq!(event.name(), "iteration_ceiling_warning");
        drop(rx);
        tx.emit(AgentEvent::Reflection {
            iteration: 0,
            summary: String::new(),
        });
    }
}
