//! Conversation domain.
//!
//! - [`entities::Message`]: a single message of the caller-owned history
//! - [`stream::StreamEvent`]: one event of a streamed model turn

pub mod entities;
pub mod stream;
