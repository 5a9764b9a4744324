//! THINKING: one streamed model turn fed through the action parser.

use super::AgentController;
use super::types::{Turn, TurnResult};
use crate::ports::model_gateway::GatewayError;
use crate::use_cases::shared::cancelled;
use ratchet_domain::{ActionParser, Message, StreamEvent};
use tracing::warn;

impl AgentController {
    /// Request a turn and read it to the end, or until cancellation.
    ///
    /// Cancellation is checked before every stream event; what was parsed
    /// until then comes back as [`TurnResult::Cancelled`] and is never
    /// dispatched.
    pub(super) async fn stream_turn(&self, history: &[Message]) -> Result<TurnResult, GatewayError> {
        let handle = tokio::select! {
            biased;
            _ = cancelled(&self.cancellation) => return Ok(TurnResult::Cancelled(Turn::default())),
            handle = self.gateway.stream_turn(history, &self.config.model) => handle?,
        };
        let mut receiver = handle.receiver;

        let mut parser = ActionParser::new();
        let mut turn = Turn::default();
        loop {
            let event = tokio::select! {
                biased;
                _ = cancelled(&self.cancellation) => {
                    turn.thoughts = parser.prose().trim().to_string();
                    return Ok(TurnResult::Cancelled(turn));
                }
                event = receiver.recv() => event,
            };

            match event {
                Some(StreamEvent::Delta(chunk)) => {
                    turn.text.push_str(&chunk);
                    turn.events.extend(parser.feed(&chunk));
                }
                Some(StreamEvent::ToolCallDelta {
                    index,
                    name,
                    arguments_delta,
                    ..
                }) => {
                    parser.feed_tool_call_delta(
                        index,
                        name.as_deref(),
                        arguments_delta.as_deref().unwrap_or_default(),
                    );
                }
                Some(StreamEvent::Completed(full)) => {
                    if turn.text.is_empty()
                        && let Some(full) = full
                    {
                        turn.events.extend(parser.feed(&full));
                        turn.text = full;
                    }
                    break;
                }
                Some(StreamEvent::Error(e)) => return Err(GatewayError::RequestFailed(e)),
                None => {
                    // a turn cut short is never dispatched
                    warn!(received = turn.text.len(), "Stream closed without completion event");
                    return Err(GatewayError::StreamClosed);
                }
            }
        }

        turn.events.extend(parser.finish());
        turn.thoughts = parser.prose().trim().to_string();
        Ok(TurnResult::Finished(turn))
    }
}
