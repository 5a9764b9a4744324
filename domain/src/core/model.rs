//! Model identifier.
//!
//! The control plane never interprets model names; they are handed to the
//! gateway verbatim. Context limits are looked up through the gateway, with
//! [`FALLBACK_CONTEXT_TOKENS`] used for unknown models.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Conservative context size used when the gateway does not know a model.
pub const FALLBACK_CONTEXT_TOKENS: usize = 8_192;

/// Opaque model identifier (e.g. "claude-sonnet-4.5", "gpt-5-mini").
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelId(String);

impl ModelId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ModelId {
    fn default() -> Self {
        Self::new("default")
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ModelId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ModelId {
    fn from(s: String) -> Self {
        Self(s)
    }
}
