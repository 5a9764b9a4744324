//! Streaming events for a model turn.
//!
//! [`StreamEvent`] represents individual events in a streamed model turn.
//! The controller consumes them one at a time (each `recv` is a suspension
//! point where cancellation is honoured) and feeds text into the incremental
//! action parser.
//!
//! Providers with native tool calling deliver calls as
//! [`ToolCallDelta`](StreamEvent::ToolCallDelta) fragments; providers without
//! it embed calls in prose, which the action parser extracts.

/// An event in a streamed model turn.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// A text chunk from the model.
    Delta(String),

    /// Incremental structured tool call data.
    ///
    /// The first delta for an `index` usually carries `id` and `name`;
    /// later deltas carry `arguments_delta` fragments to be concatenated.
    ToolCallDelta {
        index: usize,
        id: Option<String>,
        name: Option<String>,
        arguments_delta: Option<String>,
    },

    /// End of the turn. Carries the full text when the provider sends it
    /// in one piece instead of deltas.
    Completed(Option<String>),

    /// An error that occurred during streaming.
    Error(String),
}

impl StreamEvent {
    /// Returns the text content if this is a Delta event.
    pub fn text(&self) -> Option<&str> {
        match self {
            StreamEvent::Delta(s) => Some(s),
            _ => None,
        }
    }

    /// Returns true if this event signals the end of the stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Completed(_) | StreamEvent::Error(_))
    }
}
