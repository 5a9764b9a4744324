//! Agent domain module
//!
//! The ReAct loop's vocabulary: phases, iterations and their action records,
//! the incremental action parser, and the terminal outcome.

pub mod action_parser;
pub mod iteration;
pub mod outcome;
pub mod phase;

pub use action_parser::{ActionParseError, ActionParser, ParsedAction, ParserEvent};
pub use iteration::{ActionErrorKind, ActionRecord, Iteration, IterationLog};
pub use outcome::{AbortReason, AgentOutcome, AgentStatus};
pub use phase::AgentPhase;
