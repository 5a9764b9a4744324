//! In-memory fakes of the ports, shared by the use case tests.

use crate::ports::agent_events::{AgentEvent, AgentEventSink};
use crate::ports::model_gateway::{GatewayError, ModelGateway, StreamHandle};
use crate::ports::persistence::{PersistenceError, PersistenceStore};
use crate::ports::tool_executor::ToolExecutor;
use crate::ports::workspace::{WorkspaceError, WorkspacePort};
use crate::tool_registry::ToolRegistry;
use async_trait::async_trait;
use ratchet_domain::{
    ActionRecord, LoopSignal, Message, ModelId, PlanId, PlanStep, StreamEvent, ToolError,
    ToolInvocation, ToolKind, ToolOutcome,
};
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

// ==================== Persistence ====================

#[derive(Default)]
pub struct RecordingStore {
    actions: Mutex<Vec<ActionRecord>>,
    patterns: Mutex<Vec<LoopSignal>>,
    steps: Mutex<Vec<(PlanId, PlanStep)>>,
    fail: bool,
}

impl RecordingStore {
    /// A store whose every append fails.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn action_records(&self) -> Vec<ActionRecord> {
        self.actions.lock().unwrap().clone()
    }

    pub fn error_patterns(&self) -> Vec<LoopSignal> {
        self.patterns.lock().unwrap().clone()
    }

    pub fn plan_steps(&self) -> Vec<(PlanId, PlanStep)> {
        self.steps.lock().unwrap().clone()
    }

    fn check(&self) -> Result<(), PersistenceError> {
        if self.fail {
            return Err(std::io::Error::other("disk full").into());
        }
        Ok(())
    }
}

impl PersistenceStore for RecordingStore {
    fn append_action_record(&self, record: &ActionRecord) -> Result<(), PersistenceError> {
        self.check()?;
        self.actions.lock().unwrap().push(record.clone());
        Ok(())
    }

    fn append_error_pattern(&self, signal: &LoopSignal) -> Result<(), PersistenceError> {
        self.check()?;
        self.patterns.lock().unwrap().push(signal.clone());
        Ok(())
    }

    fn append_plan_step(&self, plan: &PlanId, step: &PlanStep) -> Result<(), PersistenceError> {
        self.check()?;
        self.steps.lock().unwrap().push((plan.clone(), step.clone()));
        Ok(())
    }
}

// ==================== Events ====================

#[derive(Default)]
pub struct RecordingEvents {
    events: Mutex<Vec<AgentEvent>>,
}

impl RecordingEvents {
    pub fn events(&self) -> Vec<AgentEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.events.lock().unwrap().iter().map(AgentEvent::name).collect()
    }

    pub fn count(&self, name: &str) -> usize {
        self.names().into_iter().filter(|n| *n == name).count()
    }
}

impl AgentEventSink for RecordingEvents {
    fn emit(&self, event: AgentEvent) {
        self.events.lock().unwrap().push(event);
    }
}

// ==================== Model gateway ====================

enum Turn {
    Events(Vec<StreamEvent>),
    Fail(GatewayError),
    /// Never completes; the sender is kept open.
    Stall,
}

/// Gateway that replays scripted turns, then a default reply.
pub struct ScriptedGateway {
    turns: Mutex<VecDeque<Turn>>,
    default_reply: String,
    context_limit: Option<usize>,
    seen: Mutex<Vec<Vec<Message>>>,
    stalled: Mutex<Vec<mpsc::Sender<StreamEvent>>>,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self {
            turns: Mutex::new(VecDeque::new()),
            default_reply: "Done.".to_string(),
            context_limit: None,
            seen: Mutex::new(Vec::new()),
            stalled: Mutex::new(Vec::new()),
        }
    }

    pub fn with_context_limit(mut self, tokens: usize) -> Self {
        self.context_limit = Some(tokens);
        self
    }

    pub fn with_default_reply(mut self, reply: impl Into<String>) -> Self {
        self.default_reply = reply.into();
        self
    }

    /// Queue a turn streamed as a single text delta.
    pub fn with_turn(self, text: impl Into<String>) -> Self {
        self.with_events(vec![
            StreamEvent::Delta(text.into()),
            StreamEvent::Completed(None),
        ])
    }

    pub fn with_events(self, events: Vec<StreamEvent>) -> Self {
        self.turns.lock().unwrap().push_back(Turn::Events(events));
        self
    }

    pub fn with_failure(self, error: GatewayError) -> Self {
        self.turns.lock().unwrap().push_back(Turn::Fail(error));
        self
    }

    pub fn with_stalled_turn(self) -> Self {
        self.turns.lock().unwrap().push_back(Turn::Stall);
        self
    }

    /// Number of turns requested so far.
    pub fn requests(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    /// Histories the gateway was called with.
    pub fn seen(&self) -> Vec<Vec<Message>> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelGateway for ScriptedGateway {
    async fn stream_turn(
        &self,
        messages: &[Message],
        _model: &ModelId,
    ) -> Result<StreamHandle, GatewayError> {
        self.seen.lock().unwrap().push(messages.to_vec());
        let turn = self.turns.lock().unwrap().pop_front();
        match turn {
            Some(Turn::Events(events)) => {
                let (tx, rx) = mpsc::channel(events.len().max(1));
                for event in events {
                    tx.try_send(event).unwrap();
                }
                Ok(StreamHandle::new(rx))
            }
            Some(Turn::Fail(error)) => Err(error),
            Some(Turn::Stall) => {
                let (tx, rx) = mpsc::channel(1);
                self.stalled.lock().unwrap().push(tx);
                Ok(StreamHandle::new(rx))
            }
            None => Ok(StreamHandle::completed(self.default_reply.clone())),
        }
    }

    fn max_context_tokens(&self, _model: &ModelId) -> Option<usize> {
        self.context_limit
    }
}

// ==================== Workspace ====================

#[derive(Default)]
pub struct MemoryWorkspace {
    files: Mutex<BTreeMap<String, Vec<u8>>>,
    denied: Mutex<HashSet<String>>,
    failing: Mutex<HashSet<String>>,
}

impl MemoryWorkspace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, path: &str, contents: &str) {
        self.files
            .lock()
            .unwrap()
            .insert(path.to_string(), contents.as_bytes().to_vec());
    }

    pub fn remove_now(&self, path: &str) {
        self.files.lock().unwrap().remove(path);
    }

    pub fn text(&self, path: &str) -> Option<String> {
        self.files
            .lock()
            .unwrap()
            .get(path)
            .map(|b| String::from_utf8_lossy(b).into_owned())
    }

    /// `check_writable` and writes fail for `path`.
    pub fn deny_writes(&self, path: &str) {
        self.denied.lock().unwrap().insert(path.to_string());
    }

    /// `check_writable` passes but writes fail for `path`.
    pub fn fail_writes(&self, path: &str) {
        self.failing.lock().unwrap().insert(path.to_string());
    }

    fn writable(&self, path: &str) -> Result<(), WorkspaceError> {
        if self.denied.lock().unwrap().contains(path) {
            return Err(WorkspaceError::NotWritable {
                path: path.to_string(),
                reason: "read-only".to_string(),
            });
        }
        Ok(())
    }

    fn writes_allowed(&self, path: &str) -> Result<(), WorkspaceError> {
        self.writable(path)?;
        if self.failing.lock().unwrap().contains(path) {
            return Err(WorkspaceError::io(path, "device error"));
        }
        Ok(())
    }
}

#[async_trait]
impl WorkspacePort for MemoryWorkspace {
    async fn read(&self, path: &str) -> Result<Option<Vec<u8>>, WorkspaceError> {
        Ok(self.files.lock().unwrap().get(path).cloned())
    }

    async fn write(&self, path: &str, contents: &[u8]) -> Result<(), WorkspaceError> {
        self.writes_allowed(path)?;
        self.files
            .lock()
            .unwrap()
            .insert(path.to_string(), contents.to_vec());
        Ok(())
    }

    async fn remove(&self, path: &str) -> Result<(), WorkspaceError> {
        self.writes_allowed(path)?;
        self.files.lock().unwrap().remove(path);
        Ok(())
    }

    async fn exists(&self, path: &str) -> bool {
        self.files.lock().unwrap().contains_key(path)
    }

    async fn check_writable(&self, path: &str) -> Result<(), WorkspaceError> {
        self.writable(path)
    }
}

// ==================== Tools ====================

/// File tools backed by a [`MemoryWorkspace`].
pub struct MemoryTools {
    workspace: Arc<MemoryWorkspace>,
    calls: Mutex<Vec<ToolInvocation>>,
    cancel_on_call: Mutex<Option<CancellationToken>>,
}

impl MemoryTools {
    pub fn new(workspace: Arc<MemoryWorkspace>) -> Self {
        Self {
            workspace,
            calls: Mutex::new(Vec::new()),
            cancel_on_call: Mutex::new(None),
        }
    }

    /// Cancel `token` from inside the next call, before it completes.
    pub fn cancelling(self, token: CancellationToken) -> Self {
        *self.cancel_on_call.lock().unwrap() = Some(token);
        self
    }

    pub fn calls(&self) -> Vec<ToolInvocation> {
        self.calls.lock().unwrap().clone()
    }

    /// Registry with this executor behind every file tool and `run_command`.
    pub fn registry(self: &Arc<Self>) -> ToolRegistry {
        [
            ToolKind::ReadFile,
            ToolKind::WriteFile,
            ToolKind::DeleteFile,
            ToolKind::ListDirectory,
            ToolKind::RunCommand,
        ]
        .into_iter()
        .fold(ToolRegistry::new(), |registry, kind| {
            registry.register(kind, self.clone())
        })
    }
}

#[async_trait]
impl ToolExecutor for MemoryTools {
    async fn execute(&self, invocation: &ToolInvocation) -> ToolOutcome {
        self.calls.lock().unwrap().push(invocation.clone());
        let cancel = self.cancel_on_call.lock().unwrap().take();
        if let Some(token) = cancel {
            token.cancel();
            tokio::task::yield_now().await;
        }
        let path = invocation.target_path().unwrap_or_default();
        match invocation.kind {
            ToolKind::ReadFile => match self.workspace.text(path) {
                Some(text) => ToolOutcome::success(text),
                None => ToolOutcome::failure(ToolError::not_found(path)),
            },
            ToolKind::WriteFile => {
                let content = invocation.get_string("content").unwrap_or_default();
                match self.workspace.write(path, content.as_bytes()).await {
                    Ok(()) => ToolOutcome::success(format!("wrote {} bytes", content.len())),
                    Err(e) => ToolOutcome::failure(ToolError::permission_denied(e.to_string())),
                }
            }
            ToolKind::DeleteFile => {
                self.workspace.remove_now(path);
                ToolOutcome::success("deleted")
            }
            ToolKind::RunCommand => {
                let command = invocation.get_string("command").unwrap_or_default();
                if command.starts_with("false") {
                    ToolOutcome::failure(ToolError::execution_failed("exit status 1"))
                } else {
                    ToolOutcome::success(format!("$ {}", command))
                }
            }
            _ => ToolOutcome::success(""),
        }
    }
}
