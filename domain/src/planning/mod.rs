//! Task planning domain module
//!
//! Classifies a task by complexity and drafts an [`ExecutionPlan`] whose
//! approval state depends on that complexity (see [`entities`]).

pub mod classifier;
pub mod entities;

pub use classifier::{Classification, PlannerConfig, TaskClassifier, TaskSignals};
pub use entities::{
    ApprovalState, Complexity, ExecutionPlan, PlanId, PlanStep, StepRisk, Task,
};
