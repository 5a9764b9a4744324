//! Agent controller (ReAct loop)
//!
//! Drives one task through repeated iterations:
//!
//! | Phase      | Work |
//! |------------|------|
//! | THINKING   | bring history under budget, stream one model turn |
//! | ACTING     | dispatch parsed actions through the tool registry |
//! | OBSERVING  | record, persist and feed back one record per action |
//! | REFLECTING | run loop detection; continue, complete or abort |
//!
//! A turn without actions completes the task. Gateway, workspace and budget
//! failures abort immediately; loop signals abort once they escalate.

mod dispatch;
mod turn;
mod types;

pub use types::{PlanOutcome, RunAgentError};

use types::{Dispatched, TurnResult};

use crate::config::AgentConfig;
use crate::ports::agent_events::{AgentEvent, AgentEventSink, NoEvents};
use crate::ports::model_gateway::ModelGateway;
use crate::ports::persistence::{NoPersistence, PersistenceStore};
use crate::ports::workspace::WorkspacePort;
use crate::tool_registry::ToolRegistry;
use crate::use_cases::checkpoints::CheckpointStore;
use crate::use_cases::manage_context::{ContextError, ContextManager};
use crate::use_cases::plan_task::{PlanApprovals, PlanResolution, TaskPlanner};
use crate::use_cases::shared::is_cancelled;
use crate::use_cases::validate_code::CodeValidator;
use crate::use_cases::verify_changes::VerificationLoop;
use ratchet_domain::{
    AbortReason, ActionRecord, AgentOutcome, AgentPhase, AgentPromptTemplate, CheckResult,
    Iteration, IterationLog, LoopSignal, Message, SelfCorrector, Task, ToolInvocation,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Runs tasks for one conversation.
///
/// `run` takes `&mut self`, so a controller drives at most one iteration at
/// a time. Loop-detection counters and the iteration log are per task.
pub struct AgentController {
    config: AgentConfig,
    gateway: Arc<dyn ModelGateway>,
    tools: ToolRegistry,
    workspace: Arc<dyn WorkspacePort>,
    context: ContextManager,
    validator: Arc<CodeValidator>,
    verifier: Option<Arc<VerificationLoop>>,
    checkpoints: Arc<CheckpointStore>,
    planner: TaskPlanner,
    persistence: Arc<dyn PersistenceStore>,
    events: Arc<dyn AgentEventSink>,
    cancellation: Option<CancellationToken>,
    // per-task state
    phase: AgentPhase,
    corrector: SelfCorrector,
    log: IterationLog,
    deferred: Vec<CheckResult>,
    plan_outcome: Option<PlanOutcome>,
}

impl AgentController {
    pub fn new(
        config: AgentConfig,
        gateway: Arc<dyn ModelGateway>,
        tools: ToolRegistry,
        workspace: Arc<dyn WorkspacePort>,
    ) -> Self {
        let validator = Arc::new(CodeValidator::default());
        let verifier = config
            .verification_level
            .map(|_| Arc::new(VerificationLoop::new(validator.clone(), workspace.clone())));
        Self {
            context: ContextManager::new(gateway.clone(), config.compression.clone()),
            checkpoints: Arc::new(CheckpointStore::new(workspace.clone())),
            planner: TaskPlanner::new(config.planner.clone())
                .with_approval_timeout(config.plan_approval_timeout),
            corrector: SelfCorrector::new(config.loop_thresholds.clone()),
            config,
            gateway,
            tools,
            workspace,
            validator,
            verifier,
            persistence: Arc::new(NoPersistence),
            events: Arc::new(NoEvents),
            cancellation: None,
            phase: AgentPhase::Thinking,
            log: IterationLog::new(),
            deferred: Vec::new(),
            plan_outcome: None,
        }
    }

    // ==================== Builder Methods ====================

    /// Replace the code validator. Also used by the verification loop built
    /// for `verification_level`.
    pub fn with_validator(mut self, validator: Arc<CodeValidator>) -> Self {
        if self.verifier.is_some() {
            self.verifier = Some(Arc::new(VerificationLoop::new(
                validator.clone(),
                self.workspace.clone(),
            )));
        }
        self.validator = validator;
        self
    }

    /// Verification loop run after writes when `verification_level` is set.
    pub fn with_verifier(mut self, verifier: Arc<VerificationLoop>) -> Self {
        self.verifier = Some(verifier);
        self
    }

    pub fn with_checkpoints(mut self, checkpoints: Arc<CheckpointStore>) -> Self {
        self.checkpoints = checkpoints;
        self
    }

    pub fn with_persistence(mut self, persistence: Arc<dyn PersistenceStore>) -> Self {
        self.planner = self.planner.with_persistence(persistence.clone());
        self.persistence = persistence;
        self
    }

    pub fn with_events(mut self, events: Arc<dyn AgentEventSink>) -> Self {
        self.planner = self.planner.with_events(events.clone());
        self.events = events;
        self
    }

    pub fn with_plan_approvals(mut self, approvals: PlanApprovals) -> Self {
        self.planner = self.planner.with_approvals(approvals);
        self
    }

    /// Set a cancellation token for graceful interruption
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    // ==================== Accessors ====================

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Handle for deciding plans that wait for approval.
    pub fn plan_approvals(&self) -> PlanApprovals {
        self.planner.approvals()
    }

    pub fn checkpoints(&self) -> &Arc<CheckpointStore> {
        &self.checkpoints
    }

    /// Iterations of the current (or last) task.
    pub fn iterations(&self) -> &IterationLog {
        &self.log
    }

    pub fn phase(&self) -> AgentPhase {
        self.phase
    }

    /// Unit-test failures collected by post-write verification, reported
    /// once the task ends.
    pub fn deferred_failures(&self) -> &[CheckResult] {
        &self.deferred
    }

    /// Set when planning stopped the last task before its first iteration.
    pub fn plan_outcome(&self) -> Option<&PlanOutcome> {
        self.plan_outcome.as_ref()
    }

    // ==================== Loop ====================

    /// Run `task` to completion against the caller-owned `history`.
    ///
    /// The task description is appended as a user message; assistant turns,
    /// observations and corrective notes follow it. History may be
    /// compressed in place between iterations.
    pub async fn run(
        &mut self,
        task: Task,
        history: &mut Vec<Message>,
    ) -> Result<AgentOutcome, RunAgentError> {
        self.reset();
        info!(model = %self.config.model, task = task.description(), "Agent task started");

        if self.config.enable_prompt_builder && !history.first().is_some_and(Message::is_system) {
            let prompt = AgentPromptTemplate::agent_system(&self.tools.kinds());
            history.insert(0, Message::system(prompt));
        }

        let description = task.description().to_string();
        if self.config.enable_task_planning {
            match self.planner.plan(task, None, &self.cancellation).await? {
                PlanResolution::Proceed(plan) => {
                    history.push(Message::user(AgentPromptTemplate::plan_context(&plan)));
                }
                PlanResolution::Rejected(_) if is_cancelled(&self.cancellation) => {
                    return self.abort(AbortReason::Cancelled);
                }
                PlanResolution::Rejected(_) => {
                    self.plan_outcome = Some(PlanOutcome::Rejected);
                    return self.abort(AbortReason::PlanRejected);
                }
                PlanResolution::Modified { steps, .. } => {
                    self.plan_outcome = Some(PlanOutcome::Modified(steps));
                    return self.abort(AbortReason::PlanRejected);
                }
            }
        }
        history.push(Message::user(description));

        loop {
            let index = self.log.next_index();
            if index >= self.config.max_iterations {
                return self.abort(AbortReason::MaxIterations {
                    limit: self.config.max_iterations,
                });
            }
            if is_cancelled(&self.cancellation) {
                return self.abort(AbortReason::Cancelled);
            }
            if index > 0 {
                self.enter(AgentPhase::Thinking, index)?;
            }
            if index == self.config.ceiling_warning_at() && index > 0 {
                self.warn_ceiling(index, history);
            }

            // THINKING
            match self.context.ensure_within_budget(history, &self.config.model).await {
                Ok(state) if state.compressed => {
                    self.events.emit(AgentEvent::CompressionApplied(state));
                }
                Ok(_) => {}
                Err(e @ ContextError::BudgetExceeded { .. }) => {
                    return self.abort(AbortReason::ContextExhausted {
                        diagnostic: e.to_string(),
                    });
                }
                Err(ContextError::Gateway(e)) => {
                    return self.abort(AbortReason::Gateway {
                        message: e.to_string(),
                    });
                }
            }

            let turn = match self.stream_turn(history).await {
                Ok(TurnResult::Finished(turn)) => turn,
                Ok(TurnResult::Cancelled(partial)) => {
                    let mut iteration = Iteration::new(index);
                    iteration.thoughts = partial.thoughts;
                    self.log.push(iteration)?;
                    return self.abort(AbortReason::Cancelled);
                }
                Err(e) => {
                    return self.abort(AbortReason::Gateway {
                        message: e.to_string(),
                    });
                }
            };

            let mut iteration = Iteration::new(index);
            iteration.thoughts = turn.thoughts.clone();
            if !turn.thoughts.is_empty() {
                self.events.emit(AgentEvent::Thought {
                    iteration: index,
                    text: turn.thoughts.clone(),
                });
            }
            if !turn.text.is_empty() {
                history.push(Message::assistant(turn.text.clone()));
            }

            // ACTING
            self.enter(AgentPhase::Acting, index)?;
            let dispatched = self.act(&turn.events, index).await;

            // OBSERVING
            self.enter(AgentPhase::Observing, index)?;
            let records = self.observe(dispatched, index, history);
            iteration.actions = records;

            if is_cancelled(&self.cancellation) {
                self.log.push(iteration)?;
                return self.abort(AbortReason::Cancelled);
            }

            // REFLECTING
            self.enter(AgentPhase::Reflecting, index)?;
            self.corrector.record(&iteration.actions);
            let signal = self.corrector.detect();
            if let Some(signal) = &signal {
                self.persist_signal(signal);
            }

            match signal {
                Some(signal) if signal.is_abort() => {
                    iteration.reflection = Some(format!("aborting: {}", signal.suggestion));
                    self.log.push(iteration)?;
                    return self.abort(AbortReason::LoopDetected {
                        kind: signal.kind.to_string(),
                        message: signal.suggestion,
                    });
                }
                Some(signal) => {
                    let note = AgentPromptTemplate::corrective_note(&signal);
                    warn!(kind = %signal.kind, count = signal.count, path = ?signal.path, "Loop warning");
                    history.push(Message::system(note.clone()));
                    self.events.emit(AgentEvent::LoopWarning(signal));
                    iteration.reflection = Some(note);
                }
                None => {}
            }

            let done = turn.is_final();
            let reflection = iteration.reflection.clone().unwrap_or_else(|| {
                if done {
                    "no further actions".to_string()
                } else {
                    format!(
                        "{} action(s), {} failed",
                        iteration.actions.len(),
                        iteration.failed_actions()
                    )
                }
            });
            self.events.emit(AgentEvent::Reflection {
                iteration: index,
                summary: reflection.clone(),
            });
            iteration.reflection = Some(reflection);
            self.log.push(iteration)?;

            if done {
                return self.complete();
            }
        }
    }

    fn reset(&mut self) {
        self.phase = AgentPhase::Thinking;
        self.corrector = SelfCorrector::new(self.config.loop_thresholds.clone());
        self.log = IterationLog::new();
        self.deferred.clear();
        self.plan_outcome = None;
    }

    fn enter(&mut self, next: AgentPhase, iteration: usize) -> Result<(), RunAgentError> {
        self.phase = self.phase.transition(next)?;
        debug!(iteration, phase = %next, "Phase changed");
        self.events.emit(AgentEvent::PhaseChanged {
            iteration,
            phase: next,
        });
        Ok(())
    }

    fn warn_ceiling(&self, index: usize, history: &mut Vec<Message>) {
        let max = self.config.max_iterations;
        warn!(iteration = index, max_iterations = max, "Approaching iteration ceiling");
        history.push(Message::system(format!(
            "[iteration {} of {}] Few iterations remain. Finish the task or state what is left.",
            index + 1,
            max
        )));
        self.events.emit(AgentEvent::IterationCeilingWarning {
            iteration: index,
            max_iterations: max,
        });
    }

    /// Persist and emit the records of one iteration and append them to
    /// history as a single observation.
    fn observe(
        &mut self,
        dispatched: Vec<Dispatched>,
        index: usize,
        history: &mut Vec<Message>,
    ) -> Vec<ActionRecord> {
        let mut records = Vec::with_capacity(dispatched.len());
        for Dispatched { record, deferred } in dispatched {
            if let Err(e) = self.persistence.append_action_record(&record) {
                warn!(tool = %record.tool, error = %e, "Failed to persist action record");
            }
            self.events.emit(AgentEvent::Observation {
                iteration: index,
                record: record.clone(),
            });
            self.deferred.extend(deferred);
            records.push(record);
        }
        if !records.is_empty() {
            history.push(Message::tool(AgentPromptTemplate::observations(&records)));
        }
        records
    }

    fn persist_signal(&self, signal: &LoopSignal) {
        if let Err(e) = self.persistence.append_error_pattern(signal) {
            warn!(kind = %signal.kind, error = %e, "Failed to persist error pattern");
        }
    }

    fn emit_action(&self, invocation: &ToolInvocation, iteration: usize) {
        debug!(iteration, tool = %invocation.kind, path = ?invocation.target_path(), "Dispatching action");
        self.events.emit(AgentEvent::Action {
            iteration,
            invocation: invocation.clone(),
        });
    }

    fn complete(&mut self) -> Result<AgentOutcome, RunAgentError> {
        self.phase = self.phase.transition(AgentPhase::Complete)?;
        let outcome = AgentOutcome::complete(self.log.len(), self.log.files_touched());
        info!(
            iterations = outcome.iterations_taken,
            files = outcome.files_touched.len(),
            deferred_failures = self.deferred.len(),
            "Agent task complete"
        );
        self.finish(outcome)
    }

    fn abort(&mut self, reason: AbortReason) -> Result<AgentOutcome, RunAgentError> {
        self.phase = self.phase.transition(AgentPhase::Aborted)?;
        warn!(iterations = self.log.len(), reason = %reason, "Agent task aborted");
        let outcome = AgentOutcome::aborted(self.log.len(), self.log.files_touched(), reason);
        self.finish(outcome)
    }

    fn finish(&mut self, outcome: AgentOutcome) -> Result<AgentOutcome, RunAgentError> {
        self.events.emit(AgentEvent::PhaseChanged {
            iteration: self.log.len(),
            phase: self.phase,
        });
        self.events.emit(AgentEvent::Completed(outcome.clone()));
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::model_gateway::GatewayError;
    use crate::test_support::{
        MemoryTools, MemoryWorkspace, RecordingEvents, RecordingStore, ScriptedGateway,
    };
    use ratchet_domain::{ActionErrorKind, AgentStatus, Role, StepRisk, StreamEvent};
    use std::time::Duration;

    struct Harness {
        workspace: Arc<MemoryWorkspace>,
        tools: Arc<MemoryTools>,
        store: Arc<RecordingStore>,
        events: Arc<RecordingEvents>,
    }

    impl Harness {
        fn new() -> Self {
            let workspace = Arc::new(MemoryWorkspace::new());
            Self {
                tools: Arc::new(MemoryTools::new(workspace.clone())),
                workspace,
                store: Arc::new(RecordingStore::default()),
                events: Arc::new(RecordingEvents::default()),
            }
        }

        fn controller(&self, config: AgentConfig, gateway: ScriptedGateway) -> AgentController {
            AgentController::new(
                config,
                Arc::new(gateway),
                self.tools.registry(),
                self.workspace.clone(),
            )
            .with_persistence(self.store.clone())
            .with_events(self.events.clone())
        }
    }

    fn task(description: &str) -> Task {
        Task::new(description, "/work").unwrap()
    }

    fn action(tool: &str, args: &str) -> String {
        format!("```action\n{{\"tool\": \"{}\", \"args\": {}}}\n```\n", tool, args)
    }

    fn abort_reason(outcome: &AgentOutcome) -> &AbortReason {
        outcome.abort_reason.as_ref().unwrap()
    }

    #[tokio::test]
    async fn test_turn_without_actions_completes() {
        let h = Harness::new();
        let mut controller = h.controller(AgentConfig::default(), ScriptedGateway::new());
        let mut history = Vec::new();
        let outcome = controller.run(task("say hello"), &mut history).await.unwrap();

        assert_eq!(outcome.status, AgentStatus::Complete);
        assert_eq!(outcome.iterations_taken, 1);
        assert_eq!(controller.phase(), AgentPhase::Complete);
        assert_eq!(history[0], Message::user("say hello"));
        assert_eq!(history[1], Message::assistant("Done."));
        assert_eq!(h.events.names().last(), Some(&"completed"));
    }

    #[tokio::test]
    async fn test_write_is_checkpointed_recorded_and_observed() {
        let h = Harness::new();
        h.workspace.insert("app.py", "x = 0\n");
        let gateway = ScriptedGateway::new().with_turn(format!(
            "Updating the value.\n{}",
            action("write_file", r#"{"path": "app.py", "content": "x = 1\n"}"#)
        ));
        let mut controller = h.controller(AgentConfig::default(), gateway);
        let mut history = Vec::new();
        let outcome = controller.run(task("set x to 1"), &mut history).await.unwrap();

        assert!(outcome.is_complete());
        assert_eq!(outcome.iterations_taken, 2);
        assert_eq!(outcome.files_touched, vec!["app.py"]);
        assert_eq!(h.workspace.text("app.py").unwrap(), "x = 1\n");

        let checkpoint = controller.checkpoints().latest().unwrap();
        assert_eq!(checkpoint.files().next(), Some(("app.py", Some(&b"x = 0\n"[..]))));

        let records = h.store.action_records();
        assert_eq!(records.len(), 1);
        assert!(records[0].success);
        assert!(history.iter().any(|m| m.role == Role::Tool && m.content.contains("app.py")));
        assert_eq!(h.events.count("action"), 1);
        assert_eq!(h.events.count("observation"), 1);
        assert_eq!(h.events.count("thought"), 2);

        let first = controller.iterations().iter().next().unwrap();
        assert_eq!(first.thoughts, "Updating the value.");
    }

    #[tokio::test]
    async fn test_unparseable_write_recorded_as_validation_failure() {
        let h = Harness::new();
        let gateway = ScriptedGateway::new().with_turn(action(
            "write_file",
            r#"{"path": "main.rs", "content": "fn main() { let x = (1]; }\n"}"#,
        ));
        let mut controller = h.controller(AgentConfig::default(), gateway);
        let outcome = controller.run(task("write main"), &mut Vec::new()).await.unwrap();

        assert!(outcome.is_complete());
        assert_eq!(outcome.files_touched, vec!["main.rs"]);
        let record = &h.store.action_records()[0];
        assert!(!record.success);
        assert_eq!(record.error_kind, Some(ActionErrorKind::Validation));
    }

    #[tokio::test]
    async fn test_parse_error_becomes_observation() {
        let h = Harness::new();
        let gateway = ScriptedGateway::new().with_turn("```action\n{\"args\": {}}\n```\n");
        let mut controller = h.controller(AgentConfig::default(), gateway);
        let outcome = controller.run(task("anything"), &mut Vec::new()).await.unwrap();

        assert!(outcome.is_complete());
        assert_eq!(outcome.iterations_taken, 2);
        let record = &h.store.action_records()[0];
        assert_eq!(record.error_kind, Some(ActionErrorKind::Parse));
        assert!(h.tools.calls().is_empty());
    }

    #[tokio::test]
    async fn test_repeated_reads_abort_with_read_loop() {
        let h = Harness::new();
        h.workspace.insert("lib.rs", "fn a() {}\n");
        let gateway = ScriptedGateway::new()
            .with_default_reply(action("read_file", r#"{"path": "lib.rs"}"#));
        let mut controller = h.controller(AgentConfig::default(), gateway);
        let mut history = Vec::new();
        let outcome = controller.run(task("inspect lib.rs"), &mut history).await.unwrap();

        assert_eq!(outcome.status, AgentStatus::Aborted);
        assert!(matches!(
            abort_reason(&outcome),
            AbortReason::LoopDetected { kind, .. } if kind == "read_loop"
        ));
        assert!(outcome.iterations_taken < 50);
        assert!(h.events.count("loop_warning") >= 1);
        assert!(!h.store.error_patterns().is_empty());
        assert!(history.iter().any(|m| m.role == Role::System && m.content.contains("[self-correction]")));
    }

    #[tokio::test]
    async fn test_iteration_ceiling() {
        let h = Harness::new();
        let gateway = ScriptedGateway::new()
            .with_default_reply(action("run_command", r#"{"command": "cargo build"}"#));
        let config = AgentConfig::default()
            .with_max_iterations(4)
            .with_ceiling_lookahead(1);
        let mut controller = h.controller(config, gateway);
        let outcome = controller.run(task("build forever"), &mut Vec::new()).await.unwrap();

        assert_eq!(outcome.iterations_taken, 4);
        assert_eq!(abort_reason(&outcome), &AbortReason::MaxIterations { limit: 4 });
        assert_eq!(h.events.count("iteration_ceiling_warning"), 1);
        let indices: Vec<_> = controller.iterations().iter().map(|i| i.index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3]);
    }

    #[tokio::test]
    async fn test_gateway_failure_aborts_without_retry() {
        let h = Harness::new();
        let gateway = ScriptedGateway::new()
            .with_failure(GatewayError::ConnectionError("refused".into()));
        let mut controller = h.controller(AgentConfig::default(), gateway);
        let outcome = controller.run(task("anything"), &mut Vec::new()).await.unwrap();

        assert_eq!(outcome.iterations_taken, 0);
        assert!(matches!(abort_reason(&outcome), AbortReason::Gateway { .. }));
    }

    #[tokio::test]
    async fn test_cancellation_during_stream() {
        let h = Harness::new();
        let token = CancellationToken::new();
        let mut controller = h
            .controller(AgentConfig::default(), ScriptedGateway::new().with_stalled_turn())
            .with_cancellation(token.clone());
        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            token.cancel();
        });
        let outcome = controller.run(task("anything"), &mut Vec::new()).await.unwrap();
        canceller.await.unwrap();

        assert_eq!(abort_reason(&outcome), &AbortReason::Cancelled);
        assert_eq!(outcome.iterations_taken, 1);
        assert_eq!(controller.phase(), AgentPhase::Aborted);
    }

    #[tokio::test]
    async fn test_stream_closed_early_aborts_without_dispatch() {
        let h = Harness::new();
        h.workspace.insert("app.py", "x = 0\n");
        let gateway = ScriptedGateway::new().with_events(vec![StreamEvent::Delta(
            "```action\n{\"tool\": \"write_file\", \"args\": {\"path\": \"app.py\", \"content\": \"x = 1\\ny = ".to_string(),
        )]);
        let mut controller = h.controller(AgentConfig::default(), gateway);
        let outcome = controller.run(task("set x"), &mut Vec::new()).await.unwrap();

        assert_eq!(outcome.status, AgentStatus::Aborted);
        assert_eq!(
            abort_reason(&outcome),
            &AbortReason::Gateway {
                message: GatewayError::StreamClosed.to_string()
            }
        );
        assert!(h.tools.calls().is_empty());
        assert_eq!(h.workspace.text("app.py").unwrap(), "x = 0\n");
    }

    #[tokio::test]
    async fn test_cancellation_during_tool_call() {
        let token = CancellationToken::new();
        let workspace = Arc::new(MemoryWorkspace::new());
        workspace.insert("a.rs", "fn a() {}\n");
        workspace.insert("b.rs", "fn b() {}\n");
        let h = Harness {
            tools: Arc::new(MemoryTools::new(workspace.clone()).cancelling(token.clone())),
            workspace,
            store: Arc::new(RecordingStore::default()),
            events: Arc::new(RecordingEvents::default()),
        };
        let gateway = ScriptedGateway::new().with_turn(format!(
            "{}{}",
            action("read_file", r#"{"path": "a.rs"}"#),
            action("read_file", r#"{"path": "b.rs"}"#)
        ));
        let mut controller = h
            .controller(AgentConfig::default(), gateway)
            .with_cancellation(token);
        let outcome = controller.run(task("read both"), &mut Vec::new()).await.unwrap();

        assert_eq!(outcome.status, AgentStatus::Aborted);
        assert_eq!(abort_reason(&outcome), &AbortReason::Cancelled);
        assert_eq!(controller.phase(), AgentPhase::Aborted);
        assert_eq!(h.tools.calls().len(), 1);

        let iterations: Vec<_> = controller.iterations().iter().collect();
        assert_eq!(iterations.len(), 1);
        let actions = &iterations[0].actions;
        assert_eq!(actions.len(), 2);
        assert!(actions[0].success);
        assert_eq!(actions[0].path(), Some("a.rs"));
        assert_eq!(actions[1].error_kind, Some(ActionErrorKind::Cancelled));
        assert_eq!(actions[1].path(), Some("b.rs"));
    }

    #[tokio::test]
    async fn test_independent_actions_keep_request_order() {
        let h = Harness::new();
        h.workspace.insert("a.rs", "a");
        h.workspace.insert("b.rs", "b");
        let turn = format!(
            "{}{}",
            action("read_file", r#"{"path": "a.rs"}, "independent": true"#),
            action("read_file", r#"{"path": "b.rs"}, "independent": true"#)
        );
        let gateway = ScriptedGateway::new().with_turn(turn);
        let config = AgentConfig::default().with_parallel_independent(true);
        let mut controller = h.controller(config, gateway);
        controller.run(task("read both"), &mut Vec::new()).await.unwrap();

        let paths: Vec<_> = h
            .store
            .action_records()
            .iter()
            .map(|r| r.path().unwrap().to_string())
            .collect();
        assert_eq!(paths, vec!["a.rs", "b.rs"]);
    }

    #[tokio::test]
    async fn test_prompt_builder_prepends_system_prompt() {
        let h = Harness::new();
        let config = AgentConfig::default().with_prompt_builder(true);
        let mut controller = h.controller(config, ScriptedGateway::new());
        let mut history = Vec::new();
        controller.run(task("hello"), &mut history).await.unwrap();
        assert!(history[0].is_system());
        assert!(history[0].content.contains("read_file"));

        let mut existing = vec![Message::system("custom")];
        controller.run(task("again"), &mut existing).await.unwrap();
        assert_eq!(existing[0].content, "custom");
    }

    #[tokio::test]
    async fn test_rejected_plan_runs_no_iterations() {
        let h = Harness::new();
        let gateway = Arc::new(ScriptedGateway::new());
        let config = AgentConfig::default().with_task_planning(true);
        let mut controller = AgentController::new(
            config,
            gateway.clone(),
            h.tools.registry(),
            h.workspace.clone(),
        )
        .with_events(h.events.clone());
        let approvals = controller.plan_approvals();
        let decider = tokio::spawn(async move {
            loop {
                if let Some(id) = approvals.pending().first() {
                    approvals.reject_plan(id).unwrap();
                    break;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        });
        let outcome = controller
            .run(task("refactor the storage architecture"), &mut Vec::new())
            .await
            .unwrap();
        decider.await.unwrap();

        assert_eq!(abort_reason(&outcome), &AbortReason::PlanRejected);
        assert_eq!(outcome.iterations_taken, 0);
        assert_eq!(controller.plan_outcome(), Some(&PlanOutcome::Rejected));
        assert_eq!(gateway.requests(), 0);
        assert_eq!(h.events.count("plan_approval_request"), 1);
    }

    #[tokio::test]
    async fn test_simple_plan_proceeds_and_is_persisted() {
        let h = Harness::new();
        let config = AgentConfig::default().with_task_planning(true);
        let mut controller = h.controller(config, ScriptedGateway::new());
        let mut history = Vec::new();
        let outcome = controller.run(task("fix typo in README.md"), &mut history).await.unwrap();

        assert!(outcome.is_complete());
        let steps = h.store.plan_steps();
        assert_eq!(steps.len(), 1);
        assert!(steps[0].1.risk <= StepRisk::Medium);
        assert!(history.iter().any(|m| m.content.contains("fix typo")));
    }

    #[tokio::test]
    async fn test_persistence_failures_do_not_abort() {
        let h = Harness::new();
        h.workspace.insert("a.rs", "a");
        let gateway = ScriptedGateway::new().with_turn(action("read_file", r#"{"path": "a.rs"}"#));
        let mut controller = AgentController::new(
            AgentConfig::default(),
            Arc::new(gateway),
            h.tools.registry(),
            h.workspace.clone(),
        )
        .with_persistence(Arc::new(RecordingStore::failing()));
        let outcome = controller.run(task("read"), &mut Vec::new()).await.unwrap();
        assert!(outcome.is_complete());
    }

    #[tokio::test]
    async fn test_compression_event_when_history_is_large() {
        let h = Harness::new();
        let gateway = ScriptedGateway::new()
            .with_context_limit(2_000)
            .with_default_reply("Done.");
        let mut controller = h.controller(AgentConfig::default(), gateway);
        let mut history: Vec<Message> = (0..20)
            .map(|i| Message::user(format!("{:0400}", i)))
            .collect();
        let outcome = controller.run(task("continue"), &mut history).await.unwrap();

        assert!(outcome.is_complete());
        assert_eq!(h.events.count("compression_applied"), 1);
        assert!(history.iter().any(|m| m.summary));
    }
}
