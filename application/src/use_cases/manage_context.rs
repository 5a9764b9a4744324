//! Manage Context use case (ContextManager)
//!
//! Keeps a conversation inside the model's context window by replacing the
//! oldest messages with model-written summaries. The thresholds live in the
//! domain's [`CompressionPolicy`]; this use case measures, asks the gateway
//! for summaries, and splices them into the history.

use crate::ports::model_gateway::{GatewayError, ModelGateway};
use ratchet_domain::context::{compressible_span, next_batch, usage_ratio};
use ratchet_domain::core::string::truncate;
use ratchet_domain::{
    AgentPromptTemplate, CompressionPolicy, CompressionTier, ContextWindowState, Message, ModelId,
};
use std::ops::Range;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Per-message framing overhead (role markers and separators).
const MESSAGE_OVERHEAD_TOKENS: usize = 4;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContextError {
    #[error("Context budget exceeded: {current} tokens for a {max}-token window after compression")]
    BudgetExceeded { current: usize, max: usize },

    #[error("Summarization failed: {0}")]
    Gateway(#[from] GatewayError),
}

pub struct ContextManager {
    gateway: Arc<dyn ModelGateway>,
    policy: CompressionPolicy,
}

impl ContextManager {
    pub fn new(gateway: Arc<dyn ModelGateway>, policy: CompressionPolicy) -> Self {
        Self { gateway, policy }
    }

    pub fn policy(&self) -> &CompressionPolicy {
        &self.policy
    }

    /// Context window of `model` (fallback for unknown models).
    pub fn context_limit(&self, model: &ModelId) -> usize {
        self.gateway
            .max_context_tokens(model)
            .unwrap_or(self.policy.fallback_context_tokens())
    }

    pub fn count_tokens(&self, messages: &[Message], model: &ModelId) -> usize {
        messages
            .iter()
            .map(|m| self.gateway.token_count(&m.content, model) + MESSAGE_OVERHEAD_TOKENS)
            .sum()
    }

    /// Compress `messages` in place if usage crosses the policy thresholds.
    ///
    /// Returns the resulting window state; fails with
    /// [`ContextError::BudgetExceeded`] if usage is still above 100 %.
    pub async fn ensure_within_budget(
        &self,
        messages: &mut Vec<Message>,
        model: &ModelId,
    ) -> Result<ContextWindowState, ContextError> {
        let max_tokens = self.context_limit(model);
        let pre_tokens = self.count_tokens(messages, model);
        let tier = self.policy.tier(usage_ratio(pre_tokens, max_tokens));
        if tier == CompressionTier::None {
            return Ok(ContextWindowState::measure(pre_tokens, max_tokens));
        }

        let target = self.policy.target_tokens(max_tokens);
        let batch_size = self.policy.batch_size(tier);
        let budget = self.policy.summarization_budget(max_tokens);
        info!(
            tier = tier.as_str(),
            tokens = pre_tokens,
            max_tokens,
            target,
            "Compressing conversation history"
        );

        let mut current = pre_tokens;
        let mut batches = 0;
        while current > target {
            let span = compressible_span(messages, self.policy.keep_recent());
            let Some(batch) = next_batch(messages, span, batch_size) else {
                debug!("Nothing left to compress");
                break;
            };
            let batch = self.fit_to_budget(messages, batch, budget, model);
            let summary = self.summarize(&messages[batch.clone()], budget, model).await?;
            let _ = messages.splice(batch, [Message::summary(summary)]);
            current = self.count_tokens(messages, model);
            batches += 1;
        }

        if batches == 0 {
            let state = ContextWindowState::measure(current, max_tokens);
            return if state.is_over_budget() {
                Err(ContextError::BudgetExceeded {
                    current,
                    max: max_tokens,
                })
            } else {
                Ok(state)
            };
        }

        let state = ContextWindowState::after_compression(pre_tokens, current, max_tokens);
        info!(
            batches,
            tokens = current,
            saved = state.tokens_saved,
            "Compression finished"
        );
        if state.is_over_budget() {
            return Err(ContextError::BudgetExceeded {
                current,
                max: max_tokens,
            });
        }
        Ok(state)
    }

    /// Shrink a batch from its end until it fits one summarisation request.
    fn fit_to_budget(
        &self,
        messages: &[Message],
        mut batch: Range<usize>,
        budget: usize,
        model: &ModelId,
    ) -> Range<usize> {
        while batch.len() > 1 && self.count_tokens(&messages[batch.clone()], model) > budget {
            batch.end -= 1;
        }
        batch
    }

    async fn summarize(
        &self,
        batch: &[Message],
        budget: usize,
        model: &ModelId,
    ) -> Result<String, ContextError> {
        // a single message can still exceed the budget; clip it
        let clipped: Vec<Message>;
        let batch = if self.count_tokens(batch, model) > budget {
            let max_chars = budget.saturating_mul(4) / batch.len().max(1);
            clipped = batch
                .iter()
                .map(|m| Message {
                    content: truncate(&m.content, max_chars),
                    ..m.clone()
                })
                .collect();
            &clipped[..]
        } else {
            batch
        };
        let request = vec![Message::user(AgentPromptTemplate::summarization(batch))];
        let text = self.gateway.complete(&request, model).await?;
        Ok(format!("[Summary of {} earlier messages]\n{}", batch.len(), text.trim()))
    }
}
