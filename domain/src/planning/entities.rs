//! Planning entities: tasks, complexity, plans and their approval state.
//!
//! # Approval State Machine
//!
//! ```text
//!            SIMPLE                MODERATE / COMPLEX
//!              │                          │
//!              ▼                          ▼
//!            AUTO                      PENDING ──approve / wait elapsed──▶ APPROVED
//!                                         │
//!                                         └──reject / modify──▶ REJECTED
//! ```
//!
//! `AUTO`, `APPROVED` and `REJECTED` are terminal. Only `PENDING` accepts a
//! decision; anything else is an [`InvalidPlanTransition`](DomainError::InvalidPlanTransition).

use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// A unit of work requested by the user. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    description: String,
    workspace: String,
}

impl Task {
    pub fn new(
        description: impl Into<String>,
        workspace: impl Into<String>,
    ) -> Result<Self, DomainError> {
        let description = description.into();
        if description.trim().is_empty() {
            return Err(DomainError::InvalidTask(
                "task description must not be empty".to_string(),
            ));
        }
        Ok(Self {
            description,
            workspace: workspace.into(),
        })
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn workspace(&self) -> &str {
        &self.workspace
    }
}

/// How much coordination a task needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Complexity {
    Simple,
    Moderate,
    Complex,
}

impl Complexity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Complexity::Simple => "simple",
            Complexity::Moderate => "moderate",
            Complexity::Complex => "complex",
        }
    }

    /// Approval state a freshly drafted plan of this complexity starts in.
    pub fn initial_approval(&self) -> ApprovalState {
        match self {
            Complexity::Simple => ApprovalState::Auto,
            Complexity::Moderate | Complexity::Complex => ApprovalState::Pending,
        }
    }
}

impl fmt::Display for Complexity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApprovalState {
    Auto,
    Pending,
    Approved,
    Rejected,
}

impl ApprovalState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalState::Auto => "auto",
            ApprovalState::Pending => "pending",
            ApprovalState::Approved => "approved",
            ApprovalState::Rejected => "rejected",
        }
    }

    /// Whether execution may proceed.
    pub fn allows_execution(&self) -> bool {
        matches!(self, ApprovalState::Auto | ApprovalState::Approved)
    }
}

impl fmt::Display for ApprovalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepRisk {
    Low,
    Medium,
    High,
}

impl StepRisk {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepRisk::Low => "low",
            StepRisk::Medium => "medium",
            StepRisk::High => "high",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanStep {
    pub index: usize,
    pub description: String,
    pub risk: StepRisk,
}

impl PlanStep {
    pub fn new(index: usize, description: impl Into<String>, risk: StepRisk) -> Self {
        Self {
            index,
            description: description.into(),
            risk,
        }
    }
}

/// Identifier of a plan awaiting (or past) approval.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlanId(String);

static PLAN_COUNTER: AtomicU64 = AtomicU64::new(1);

impl PlanId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Allocate a process-unique id.
    pub fn generate() -> Self {
        let n = PLAN_COUNTER.fetch_add(1, Ordering::Relaxed);
        Self(format!(
            "plan-{}-{}",
            chrono::Utc::now().format("%Y%m%d%H%M%S"),
            n
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ordered steps for a task plus its approval state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionPlan {
    id: PlanId,
    task: Task,
    complexity: Complexity,
    steps: Vec<PlanStep>,
    approval: ApprovalState,
}

impl ExecutionPlan {
    pub fn new(task: Task, complexity: Complexity, steps: Vec<PlanStep>) -> Self {
        Self {
            id: PlanId::generate(),
            task,
            complexity,
            steps: reindex(steps),
            approval: complexity.initial_approval(),
        }
    }

    pub fn id(&self) -> &PlanId {
        &self.id
    }

    pub fn task(&self) -> &Task {
        &self.task
    }

    pub fn complexity(&self) -> Complexity {
        self.complexity
    }

    pub fn steps(&self) -> &[PlanStep] {
        &self.steps
    }

    pub fn approval(&self) -> ApprovalState {
        self.approval
    }

    pub fn highest_risk(&self) -> Option<StepRisk> {
        self.steps.iter().map(|s| s.risk).max()
    }

    fn transition(&mut self, to: ApprovalState) -> Result<(), DomainError> {
        if self.approval != ApprovalState::Pending {
            return Err(DomainError::InvalidPlanTransition {
                from: self.approval.to_string(),
                to: to.to_string(),
            });
        }
        self.approval = to;
        Ok(())
    }

    pub fn approve(&mut self) -> Result<(), DomainError> {
        self.transition(ApprovalState::Approved)
    }

    pub fn reject(&mut self) -> Result<(), DomainError> {
        self.transition(ApprovalState::Rejected)
    }
}

/// Renumber steps so indices are 0-based and contiguous.
fn reindex(steps: Vec<PlanStep>) -> Vec<PlanStep> {
    steps
        .into_iter()
        .enumerate()
        .map(|(index, step)| PlanStep { index, ..step })
        .collect()
}
