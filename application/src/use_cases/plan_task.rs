//! Plan Task use case (TaskPlanner)
//!
//! Classifies a task, drafts an [`ExecutionPlan`] and resolves its approval:
//!
//! | Complexity | Initial state | Resolution |
//! |------------|---------------|------------|
//! | Simple | `Auto` | proceed immediately |
//! | Moderate | `Pending` | approved after a short wait unless a decision or cancellation arrives |
//! | Complex | `Pending` | waits for an explicit decision |
//!
//! Decisions arrive through a cloneable [`PlanApprovals`] handle. Rejecting or
//! modifying a plan hands control back to the caller; the planner never
//! escalates on its own.

use crate::ports::agent_events::{AgentEvent, AgentEventSink, NoEvents};
use crate::ports::persistence::{NoPersistence, PersistenceStore};
use crate::use_cases::shared::cancelled;
use ratchet_domain::{
    Classification, Complexity, DomainError, ExecutionPlan, PlanId, PlanStep, PlannerConfig, Task,
    TaskClassifier, TaskSignals,
};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanningError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Unknown plan: {0}")]
    UnknownPlan(PlanId),

    #[error("Plan already decided: {0}")]
    AlreadyDecided(PlanId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanDecision {
    Approve,
    Reject,
    Modify(Vec<PlanStep>),
}

/// How an approval request ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanResolution {
    /// Approved (or auto-approved): the loop may run.
    Proceed(ExecutionPlan),
    /// Rejected by a decision or by cancellation.
    Rejected(ExecutionPlan),
    /// The plan was discarded in favour of caller-supplied steps.
    Modified {
        plan: ExecutionPlan,
        steps: Vec<PlanStep>,
    },
}

impl PlanResolution {
    pub fn plan(&self) -> &ExecutionPlan {
        match self {
            PlanResolution::Proceed(plan)
            | PlanResolution::Rejected(plan)
            | PlanResolution::Modified { plan, .. } => plan,
        }
    }

    pub fn proceeds(&self) -> bool {
        matches!(self, PlanResolution::Proceed(_))
    }
}

#[derive(Default)]
struct ApprovalBook {
    pending: HashMap<PlanId, oneshot::Sender<PlanDecision>>,
    decided: HashSet<PlanId>,
}

/// Handle for deciding pending plans from outside the planner.
#[derive(Clone, Default)]
pub struct PlanApprovals {
    book: Arc<Mutex<ApprovalBook>>,
}

impl PlanApprovals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn approve_plan(&self, id: &PlanId) -> Result<(), PlanningError> {
        self.decide(id, PlanDecision::Approve)
    }

    pub fn reject_plan(&self, id: &PlanId) -> Result<(), PlanningError> {
        self.decide(id, PlanDecision::Reject)
    }

    pub fn modify_plan(&self, id: &PlanId, steps: Vec<PlanStep>) -> Result<(), PlanningError> {
        self.decide(id, PlanDecision::Modify(steps))
    }

    /// Ids of plans waiting for a decision.
    pub fn pending(&self) -> Vec<PlanId> {
        let mut ids: Vec<PlanId> = self.lock().pending.keys().cloned().collect();
        ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        ids
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ApprovalBook> {
        self.book.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn register(&self, id: &PlanId) -> oneshot::Receiver<PlanDecision> {
        let (tx, rx) = oneshot::channel();
        self.lock().pending.insert(id.clone(), tx);
        rx
    }

    /// Close a request that ended without an external decision.
    fn close(&self, id: &PlanId) {
        let mut book = self.lock();
        book.pending.remove(id);
        book.decided.insert(id.clone());
    }

    fn decide(&self, id: &PlanId, decision: PlanDecision) -> Result<(), PlanningError> {
        let mut book = self.lock();
        let Some(tx) = book.pending.remove(id) else {
            return Err(if book.decided.contains(id) {
                PlanningError::AlreadyDecided(id.clone())
            } else {
                PlanningError::UnknownPlan(id.clone())
            });
        };
        book.decided.insert(id.clone());
        tx.send(decision)
            .map_err(|_| PlanningError::AlreadyDecided(id.clone()))
    }
}

/// Use case for planning a task before the agent loop runs.
pub struct TaskPlanner {
    classifier: TaskClassifier,
    approvals: PlanApprovals,
    approval_timeout: Duration,
    persistence: Arc<dyn PersistenceStore>,
    events: Arc<dyn AgentEventSink>,
}

impl TaskPlanner {
    pub fn new(config: PlannerConfig) -> Self {
        Self {
            classifier: TaskClassifier::new(config),
            approvals: PlanApprovals::new(),
            approval_timeout: Duration::from_secs(2),
            persistence: Arc::new(NoPersistence),
            events: Arc::new(NoEvents),
        }
    }

    pub fn with_approval_timeout(mut self, timeout: Duration) -> Self {
        self.approval_timeout = timeout;
        self
    }

    pub fn with_approvals(mut self, approvals: PlanApprovals) -> Self {
        self.approvals = approvals;
        self
    }

    pub fn with_persistence(mut self, persistence: Arc<dyn PersistenceStore>) -> Self {
        self.persistence = persistence;
        self
    }

    pub fn with_events(mut self, events: Arc<dyn AgentEventSink>) -> Self {
        self.events = events;
        self
    }

    /// Handle for approving, rejecting or modifying pending plans.
    pub fn approvals(&self) -> PlanApprovals {
        self.approvals.clone()
    }

    /// Classify `task` and draft its plan without waiting for approval.
    ///
    /// Signals are estimated from the description when not supplied.
    pub fn draft(&self, task: Task, signals: Option<TaskSignals>) -> (ExecutionPlan, Classification) {
        let signals = signals.unwrap_or_else(|| self.classifier.estimate_signals(task.description()));
        let classification = self.classifier.classify(task.description(), signals);
        let steps = self
            .classifier
            .draft_steps(task.description(), classification.complexity);
        let plan = ExecutionPlan::new(task, classification.complexity, steps);
        info!(
            plan = %plan.id(),
            complexity = %classification.complexity,
            files = signals.estimated_files,
            lines = signals.estimated_lines,
            steps = plan.steps().len(),
            "Drafted plan"
        );
        (plan, classification)
    }

    /// Draft a plan and resolve its approval.
    pub async fn plan(
        &self,
        task: Task,
        signals: Option<TaskSignals>,
        cancellation: &Option<CancellationToken>,
    ) -> Result<PlanResolution, PlanningError> {
        let (plan, _) = self.draft(task, signals);
        self.resolve(plan, cancellation).await
    }

    /// Wait for the plan's approval according to its complexity.
    pub async fn resolve(
        &self,
        mut plan: ExecutionPlan,
        cancellation: &Option<CancellationToken>,
    ) -> Result<PlanResolution, PlanningError> {
        if plan.approval().allows_execution() {
            self.persist_steps(&plan);
            return Ok(PlanResolution::Proceed(plan));
        }

        let id = plan.id().clone();
        let rx = self.approvals.register(&id);
        self.events.emit(AgentEvent::PlanApprovalRequest(plan.clone()));
        info!(plan = %id, complexity = %plan.complexity(), "Waiting for plan approval");

        let decision = if plan.complexity() == Complexity::Moderate {
            tokio::select! {
                biased;
                _ = cancelled(cancellation) => PlanDecision::Reject,
                decision = rx => decision.unwrap_or(PlanDecision::Reject),
                _ = tokio::time::sleep(self.approval_timeout) => {
                    info!(plan = %id, "No decision within the approval window, auto-approving");
                    PlanDecision::Approve
                }
            }
        } else {
            tokio::select! {
                biased;
                _ = cancelled(cancellation) => PlanDecision::Reject,
                decision = rx => decision.unwrap_or(PlanDecision::Reject),
            }
        };
        self.approvals.close(&id);

        match decision {
            PlanDecision::Approve => {
                plan.approve()?;
                self.persist_steps(&plan);
                Ok(PlanResolution::Proceed(plan))
            }
            PlanDecision::Reject => {
                plan.reject()?;
                info!(plan = %id, "Plan rejected");
                Ok(PlanResolution::Rejected(plan))
            }
            PlanDecision::Modify(steps) => {
                plan.reject()?;
                info!(plan = %id, steps = steps.len(), "Plan replaced by caller");
                Ok(PlanResolution::Modified { plan, steps })
            }
        }
    }

    fn persist_steps(&self, plan: &ExecutionPlan) {
        for step in plan.steps() {
            if let Err(e) = self.persistence.append_plan_step(plan.id(), step) {
                warn!(plan = %plan.id(), step = step.index, error = %e, "Failed to persist plan step");
            }
        }
    }
}
