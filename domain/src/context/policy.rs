//! Compression policy for the conversation context window.
//!
//! | Usage ratio | Tier | Action |
//! |-------------|------|--------|
//! | < 0.80 | `None` | nothing |
//! | 0.80 – 0.95 | `Standard` | summarise small batches down to 70 % |
//! | ≥ 0.95 | `Aggressive` | summarise large batches down to 70 % |
//!
//! The leading system message and the last `keep_recent` messages are never
//! compressed.

use crate::core::model::FALLBACK_CONTEXT_TOKENS;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionTier {
    None,
    Standard,
    Aggressive,
}

impl CompressionTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompressionTier::None => "none",
            CompressionTier::Standard => "standard",
            CompressionTier::Aggressive => "aggressive",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressionPolicy {
    warn_ratio: f64,
    aggressive_ratio: f64,
    target_ratio: f64,
    keep_recent: usize,
    standard_batch: usize,
    aggressive_batch: usize,
    summary_reserve_tokens: usize,
    fallback_context_tokens: usize,
}

impl Default for CompressionPolicy {
    fn default() -> Self {
        Self {
            warn_ratio: 0.80,
            aggressive_ratio: 0.95,
            target_ratio: 0.70,
            keep_recent: 3,
            standard_batch: 8,
            aggressive_batch: 24,
            summary_reserve_tokens: 1024,
            fallback_context_tokens: FALLBACK_CONTEXT_TOKENS,
        }
    }
}

impl CompressionPolicy {
    pub fn tier(&self, usage_ratio: f64) -> CompressionTier {
        if usage_ratio >= self.aggressive_ratio {
            CompressionTier::Aggressive
        } else if usage_ratio >= self.warn_ratio {
            CompressionTier::Standard
        } else {
            CompressionTier::None
        }
    }

    /// Messages summarised per batch for a tier.
    pub fn batch_size(&self, tier: CompressionTier) -> usize {
        match tier {
            CompressionTier::None => 0,
            CompressionTier::Standard => self.standard_batch,
            CompressionTier::Aggressive => self.aggressive_batch,
        }
    }

    /// Token count to compress down to.
    pub fn target_tokens(&self, max_tokens: usize) -> usize {
        (max_tokens as f64 * self.target_ratio).floor() as usize
    }

    /// Tokens a single summarisation request may carry.
    pub fn summarization_budget(&self, max_tokens: usize) -> usize {
        max_tokens.saturating_sub(self.summary_reserve_tokens).max(1)
    }

    // ==================== Accessors ====================

    pub fn warn_ratio(&self) -> f64 {
        self.warn_ratio
    }

    pub fn aggressive_ratio(&self) -> f64 {
        self.aggressive_ratio
    }

    pub fn target_ratio(&self) -> f64 {
        self.target_ratio
    }

    pub fn keep_recent(&self) -> usize {
        self.keep_recent
    }

    pub fn summary_reserve_tokens(&self) -> usize {
        self.summary_reserve_tokens
    }

    pub fn fallback_context_tokens(&self) -> usize {
        self.fallback_context_tokens
    }

    // ==================== Builder Methods ====================

    pub fn with_thresholds(mut self, warn: f64, aggressive: f64, target: f64) -> Self {
        self.warn_ratio = warn;
        self.aggressive_ratio = aggressive;
        self.target_ratio = target;
        self
    }

    pub fn with_keep_recent(mut self, count: usize) -> Self {
        self.keep_recent = count;
        self
    }

    pub fn with_batch_sizes(mut self, standard: usize, aggressive: usize) -> Self {
        self.standard_batch = standard.max(1);
        self.aggressive_batch = aggressive.max(1);
        self
    }

    pub fn with_summary_reserve_tokens(mut self, tokens: usize) -> Self {
        self.summary_reserve_tokens = tokens;
        self
    }

    pub fn with_fallback_context_tokens(mut self, tokens: usize) -> Self {
        self.fallback_context_tokens = tokens.max(1);
        self
    }

    /// Check ordering constraints: `0 < target < warn <= aggressive <= 1`.
    pub fn validate(&self) -> Result<(), String> {
        let ordered = 0.0 < self.target_ratio
            && self.target_ratio < self.warn_ratio
            && self.warn_ratio <= self.aggressive_ratio
            && self.aggressive_ratio <= 1.0;
        if ordered {
            Ok(())
        } else {
            Err(format!(
                "expected 0 < target ({}) < warn ({}) <= aggressive ({}) <= 1",
                self.target_ratio, self.warn_ratio, self.aggressive_ratio
            ))
        }
    }
}
