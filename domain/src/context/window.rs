//! Context window state and compression range selection.

use crate::session::entities::Message;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Token usage of the message list after a budget pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextWindowState {
    pub current_tokens: usize,
    pub max_tokens: usize,
    pub usage_ratio: f64,
    pub compressed: bool,
    pub tokens_saved: usize,
}

impl ContextWindowState {
    pub fn measure(current_tokens: usize, max_tokens: usize) -> Self {
        Self {
            current_tokens,
            max_tokens,
            usage_ratio: usage_ratio(current_tokens, max_tokens),
            compressed: false,
            tokens_saved: 0,
        }
    }

    /// State after compression from `pre_tokens` down to `current_tokens`.
    pub fn after_compression(pre_tokens: usize, current_tokens: usize, max_tokens: usize) -> Self {
        Self {
            compressed: true,
            tokens_saved: pre_tokens.saturating_sub(current_tokens),
            ..Self::measure(current_tokens, max_tokens)
        }
    }

    /// `tokens_saved / pre_tokens`; 0 when nothing was compressed.
    pub fn compression_ratio(&self) -> f64 {
        let pre = self.current_tokens + self.tokens_saved;
        if pre == 0 {
            0.0
        } else {
            self.tokens_saved as f64 / pre as f64
        }
    }

    pub fn is_over_budget(&self) -> bool {
        self.usage_ratio > 1.0
    }
}

pub fn usage_ratio(current_tokens: usize, max_tokens: usize) -> f64 {
    if max_tokens == 0 {
        f64::INFINITY
    } else {
        current_tokens as f64 / max_tokens as f64
    }
}

/// Messages eligible for compression: everything after a leading system
/// message and before the last `keep_recent`.
pub fn compressible_span(messages: &[Message], keep_recent: usize) -> Range<usize> {
    let start = usize::from(messages.first().is_some_and(Message::is_system));
    let end = messages.len().saturating_sub(keep_recent).max(start);
    start..end
}

/// The oldest batch of up to `max_messages` in `span` that is not already a
/// summary. Leading summaries are skipped so a range of summaries alone is
/// never re-compressed.
pub fn next_batch(messages: &[Message], span: Range<usize>, max_messages: usize) -> Option<Range<usize>> {
    if max_messages == 0 {
        return None;
    }
    let first = span.clone().find(|&i| !messages[i].summary)?;
    let end = (first + max_messages).min(span.end);
    Some(first..end)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conversation(n: usize) -> Vec<Message> {
        let mut messages = vec![Message::system("sys")];
        for i in 0..n {
            messages.push(Message::user(format!("m{}", i)));
        }
        messages
    }

    #[test]
    fn test_span_preserves_system_and_recent() {
        let messages = conversation(10);
        assert_eq!(compressible_span(&messages, 3), 1..8);
        let without_system = vec![Message::user("a"), Message::user("b")];
        assert_eq!(compressible_span(&without_system, 3), 0..0);
    }

    #[test]
    fn test_next_batch_skips_summaries() {
        let mut messages = conversation(10);
        messages[1] = Message::summary("earlier");
        let span = compressible_span(&messages, 3);
        assert_eq!(next_batch(&messages, span.clone(), 4), Some(2..6));
        assert_eq!(next_batch(&messages, span, 100), Some(2..8));
    }

    #[test]
    fn test_summary_only_range_is_not_compressed() {
        let mut messages = conversation(5);
        messages[1] = Message::summary("a");
        messages[2] = Message::summary("b");
        let span = compressible_span(&messages, 3);
        assert_eq!(span, 1..3);
        assert_eq!(next_batch(&messages, span, 8), None);
    }

    #[test]
    fn test_state_ratios() {
        let state = ContextWindowState::after_compression(9_000, 6_000, 10_000);
        assert!(state.compressed);
        assert_eq!(state.tokens_saved, 3_000);
        assert!((state.usage_ratio - 0.6).abs() < 1e-9);
        assert!((state.compression_ratio() - 3_000.0 / 9_000.0).abs() < 1e-9);
        assert!(!state.is_over_budget());
        assert!(ContextWindowState::measure(11, 10).is_over_budget());
    }
}
