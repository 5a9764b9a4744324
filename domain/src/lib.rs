//! Domain layer for ratchet
//!
//! This crate contains the control plane's business logic: entities, value
//! objects, state machines and detectors. It performs no I/O; the
//! application layer wires it to model gateways, tools and the file system.
//!
//! # Core Concepts
//!
//! ## The ReAct loop
//!
//! The agent alternates `Thinking → Acting → Observing → Reflecting` until it
//! completes or aborts ([`AgentPhase`]). Each pass is an [`Iteration`] whose
//! [`ActionRecord`]s feed the [`SelfCorrector`].
//!
//! ## Safety nets
//!
//! - **Planning**: tasks are classified by complexity; larger plans wait for approval
//! - **Validation**: every written file is parsed and, where possible, repaired
//! - **Checkpoints**: every mutation is preceded by a snapshot that can be restored
//! - **Context budget**: old history is summarised before the window overflows

pub mod agent;
pub mod build;
pub mod checkpoint;
pub mod config;
pub mod context;
pub mod core;
pub mod correction;
pub mod planning;
pub mod prompt;
pub mod session;
pub mod tool;
pub mod validation;
pub mod verification;

// Re-export commonly used types
pub use agent::{
    AbortReason, ActionErrorKind, ActionParseError, ActionParser, ActionRecord, AgentOutcome,
    AgentPhase, AgentStatus, Iteration, IterationLog, ParsedAction, ParserEvent,
};
pub use build::{BuildReport, CodeSection, FailureKind, SectionFailure, SectionKind};
pub use checkpoint::{Checkpoint, CheckpointId, DiffHunk, DiffLine, DiffLineKind, DiffPreview};
pub use config::{ConfigIssue, ConfigIssueCode, OutputFormat, Severity};
pub use context::{CompressionPolicy, CompressionTier, ContextWindowState};
pub use core::{error::DomainError, model::ModelId};
pub use correction::{LoopKind, LoopSignal, LoopThresholds, SelfCorrector, SignalSeverity};
pub use planning::{
    ApprovalState, Classification, Complexity, ExecutionPlan, PlanId, PlanStep, PlannerConfig,
    StepRisk, Task, TaskClassifier, TaskSignals,
};
pub use prompt::AgentPromptTemplate;
pub use session::{
    entities::{Message, Role},
    stream::StreamEvent,
};
pub use tool::{
    entities::{ToolCategory, ToolInvocation, ToolKind},
    traits::{DefaultToolValidator, ToolValidator},
    value_objects::{ToolError, ToolOutcome},
};
pub use validation::{FixHint, Language, SyntaxDiagnostic, ValidationIssue, ValidationResult, ValidationStage};
pub use verification::{CheckKind, CheckResult, CheckStatus, VerificationLevel, VerificationSummary};
