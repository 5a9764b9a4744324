//! Self-correction domain module
//!
//! Detects unproductive loops in the agent's recent actions and turns them
//! into [`LoopSignal`]s: a WARN injects corrective guidance, an ABORT ends
//! the task.

pub mod detector;
pub mod signal;

pub use detector::SelfCorrector;
pub use signal::{LoopKind, LoopSignal, LoopThresholds, SignalSeverity};
