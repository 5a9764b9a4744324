//! Prompt domain
//!
//! Templates for the system prompt, corrective notes, plan context and
//! summarisation requests.

pub mod agent;

pub use agent::AgentPromptTemplate;
