//! Model gateway port
//!
//! Defines how the control plane talks to a language model: one streamed
//! turn at a time, plus token accounting for the context budget.

use async_trait::async_trait;
use ratchet_domain::{Message, ModelId, StreamEvent};
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors that can occur during gateway operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Timeout")]
    Timeout,

    #[error("Stream closed before completion")]
    StreamClosed,
}

/// Handle for receiving streaming events of one model turn.
///
/// Wraps an `mpsc::Receiver<StreamEvent>` and provides convenience methods
/// for consuming the stream.
pub struct StreamHandle {
    pub receiver: mpsc::Receiver<StreamEvent>,
}

impl StreamHandle {
    pub fn new(receiver: mpsc::Receiver<StreamEvent>) -> Self {
        Self { receiver }
    }

    /// A handle that yields a single completed text.
    pub fn completed(text: impl Into<String>) -> Self {
        let (tx, rx) = mpsc::channel(1);
        // capacity 1 and a fresh channel: this cannot fail
        let _ = tx.try_send(StreamEvent::Completed(Some(text.into())));
        Self::new(rx)
    }

    /// Consume the stream and collect all text into a single string.
    pub async fn collect_text(mut self) -> Result<String, GatewayError> {
        let mut full_text = String::new();
        while let Some(event) = self.receiver.recv().await {
            match event {
                StreamEvent::Delta(chunk) => full_text.push_str(&chunk),
                StreamEvent::Completed(text) => {
                    return Ok(match text {
                        Some(text) if full_text.is_empty() => text,
                        _ => full_text,
                    });
                }
                StreamEvent::Error(e) => return Err(GatewayError::RequestFailed(e)),
                StreamEvent::ToolCallDelta { .. } => {}
            }
        }
        Err(GatewayError::StreamClosed)
    }
}

/// Gateway to a language model.
///
/// Implementations (adapters) live outside the control plane; the
/// application layer only depends on this trait.
#[async_trait]
pub trait ModelGateway: Send + Sync {
    /// Start one streamed turn over the given history.
    async fn stream_turn(
        &self,
        messages: &[Message],
        model: &ModelId,
    ) -> Result<StreamHandle, GatewayError>;

    /// Tokens `text` occupies for `model`.
    ///
    /// The default is a four-characters-per-token estimate.
    fn token_count(&self, text: &str, _model: &ModelId) -> usize {
        text.chars().count().div_ceil(4)
    }

    /// Context window of `model`, if known.
    fn max_context_tokens(&self, _model: &ModelId) -> Option<usize> {
        None
    }

    /// Run a turn and return its text. Used for summarisation requests.
    async fn complete(&self, messages: &[Message], model: &ModelId) -> Result<String, GatewayError> {
        self.stream_turn(messages, model).await?.collect_text().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_collect_text_prefers_deltas() {
        let (tx, rx) = mpsc::channel(4);
        tx.send(StreamEvent::Delta("Hel".into())).await.unwrap();
        tx.send(StreamEvent::Delta("lo".into())).await.unwrap();
        tx.send(StreamEvent::Completed(Some("ignored".into())))
            .await
            .unwrap();
        assert_eq!(StreamHandle::new(rx).collect_text().await.unwrap(), "Hello");
    }

    #[tokio::test]
    async fn test_completed_handle() {
        let text = StreamHandle::completed("done").collect_text().await.unwrap();
        assert_eq!(text, "done");
    }

    #[tokio::test]
    async fn test_stream_error() {
        let (tx, rx) = mpsc::channel(1);
        tx.send(StreamEvent::Error("boom".into())).await.unwrap();
        let err = StreamHandle::new(rx).collect_text().await.unwrap_err();
        assert_eq!(err, GatewayError::RequestFailed("boom".into()));
    }

    #[tokio::test]
    async fn test_stream_closed_before_completion() {
        let (tx, rx) = mpsc::channel(1);
        tx.send(StreamEvent::Delta("partial".into())).await.unwrap();
        drop(tx);
        let err = StreamHandle::new(rx).collect_text().await.unwrap_err();
        assert_eq!(err, GatewayError::StreamClosed);
    }
}
