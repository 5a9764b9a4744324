//! Context window domain module
//!
//! Budget arithmetic for keeping a conversation inside the model's context
//! window: [`CompressionPolicy`] decides when and how hard to compress,
//! [`window`] picks which messages may be summarised.

pub mod policy;
pub mod window;

pub use policy::{CompressionPolicy, CompressionTier};
pub use window::{ContextWindowState, compressible_span, next_batch, usage_ratio};
