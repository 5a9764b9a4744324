//! ACTING: dispatch of parsed actions through the tool registry.
//!
//! Writes are checkpointed before they run and validated after; a write
//! that leaves the file unparseable is recorded as a VALIDATION failure even
//! though the tool itself succeeded.

use super::AgentController;
use super::types::Dispatched;
use crate::use_cases::shared::is_cancelled;
use futures::future::join_all;
use ratchet_domain::{
    ActionRecord, Language, ParserEvent, ToolError, ToolInvocation, ToolKind, ToolOutcome,
};
use tracing::{debug, info, warn};

impl AgentController {
    /// Dispatch every action of a turn. Records come back in request order,
    /// parse errors included.
    pub(super) async fn act(&self, events: &[ParserEvent], iteration: usize) -> Vec<Dispatched> {
        if self.runs_concurrently(events) {
            debug!(iteration, actions = events.len(), "Dispatching independent actions concurrently");
            let calls = events.iter().filter_map(|event| match event {
                ParserEvent::Action(action) => Some(self.dispatch(&action.invocation, iteration)),
                ParserEvent::Error(_) => None,
            });
            return join_all(calls).await;
        }

        let mut dispatched = Vec::with_capacity(events.len());
        for event in events {
            let record = match event {
                ParserEvent::Error(error) => {
                    debug!(iteration, error = %error, "Unparseable action");
                    Dispatched {
                        record: ActionRecord::parse_error(error.raw_name.as_deref(), &error.message),
                        deferred: Vec::new(),
                    }
                }
                ParserEvent::Action(action) if is_cancelled(&self.cancellation) => Dispatched {
                    record: ActionRecord::cancelled(&action.invocation),
                    deferred: Vec::new(),
                },
                ParserEvent::Action(action) => self.dispatch(&action.invocation, iteration).await,
            };
            dispatched.push(record);
        }
        dispatched
    }

    fn runs_concurrently(&self, events: &[ParserEvent]) -> bool {
        self.config.allow_parallel_independent
            && events.len() > 1
            && !is_cancelled(&self.cancellation)
            && events
                .iter()
                .all(|e| matches!(e, ParserEvent::Action(a) if a.independent))
    }

    async fn dispatch(&self, invocation: &ToolInvocation, iteration: usize) -> Dispatched {
        self.emit_action(invocation, iteration);

        let target = invocation.target_path().map(str::to_string);
        if invocation.kind.is_write()
            && let Some(path) = &target
        {
            let description = format!("before {} {}", invocation.kind, path);
            if let Err(e) = self.checkpoints.snapshot(std::slice::from_ref(path), &description).await {
                warn!(path = %path, error = %e, "Checkpoint failed, write not dispatched");
                let outcome = ToolOutcome::failure(ToolError::execution_failed(format!(
                    "checkpoint failed: {}",
                    e
                )));
                return Dispatched {
                    record: ActionRecord::from_outcome(invocation, &outcome),
                    deferred: Vec::new(),
                };
            }
        }

        let outcome = self.tools.dispatch(invocation).await;
        let mut dispatched = Dispatched {
            record: ActionRecord::from_outcome(invocation, &outcome),
            deferred: Vec::new(),
        };

        if outcome.success
            && invocation.kind.is_write()
            && invocation.kind != ToolKind::DeleteFile
            && let Some(path) = &target
        {
            self.check_written(invocation, path, &mut dispatched).await;
        }
        dispatched
    }

    /// Validate a file after a successful write, replacing the record with a
    /// VALIDATION failure when a blocking check fails.
    async fn check_written(&self, invocation: &ToolInvocation, path: &str, dispatched: &mut Dispatched) {
        let language = Language::from_path(path);
        let content = match self.workspace.read_text(path).await {
            Ok(Some(content)) => content,
            Ok(None) => return,
            Err(e) => {
                warn!(path, error = %e, "Could not read back written file");
                return;
            }
        };

        let syntax = self.validator.check_syntax(&content, language);
        if !syntax.passed {
            let message = syntax
                .first_error()
                .unwrap_or_else(|| "syntax check failed".to_string());
            info!(path, "Write left the file unparseable");
            dispatched.record = ActionRecord::validation_failure(invocation, message);
            return;
        }
        if let Some(fixed) = &syntax.fixed_content {
            match self.workspace.write(path, fixed.as_bytes()).await {
                Ok(()) => {
                    debug!(path, "Applied automatic syntax repair");
                    dispatched
                        .record
                        .result_summary
                        .push_str("\n(syntax repaired automatically)");
                }
                Err(e) => {
                    warn!(path, error = %e, "Could not write repaired file");
                    dispatched.record =
                        ActionRecord::validation_failure(invocation, format!("unrepaired syntax error: {}", e));
                    return;
                }
            }
        }

        let (Some(level), Some(verifier)) = (self.config.verification_level, &self.verifier) else {
            return;
        };
        let (results, summary) = verifier.verify_and_summarize(&[path.to_string()], level).await;
        if !summary.can_continue {
            let message = summary
                .blocking_failures
                .first()
                .map(|r| format!("{} check failed: {}", r.kind, r.message))
                .unwrap_or_else(|| "blocking verification failure".to_string());
            dispatched.record = ActionRecord::validation_failure(invocation, message);
            return;
        }
        for warning in &summary.warnings {
            dispatched
                .record
                .result_summary
                .push_str(&format!("\n{} warning: {}", warning.kind, warning.message));
        }
        debug!(path, checks = results.len(), warnings = summary.warnings.len(), "Verified write");
        dispatched.deferred = summary.deferred;
    }
}
