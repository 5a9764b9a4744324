//! Console rendering of the agent event stream

use crate::output::console::ConsoleFormatter;
use colored::Colorize;
use ratchet_application::AgentEvent;
use ratchet_domain::core::string::one_line;
use ratchet_domain::{ActionRecord, SignalSeverity, ToolInvocation};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

const PREVIEW_CHARS: usize = 100;

/// Turns [`AgentEvent`]s into console lines.
///
/// Phase changes, streamed thoughts and reflections only show in verbose
/// mode; actions, observations, warnings and the outcome always show.
#[derive(Debug, Clone, Copy, Default)]
pub struct EventRenderer {
    verbose: bool,
}

impl EventRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn verbose() -> Self {
        Self { verbose: true }
    }

    /// The console text for `event`, or `None` if it is not shown.
    pub fn render(&self, event: &AgentEvent) -> Option<String> {
        match event {
            AgentEvent::PhaseChanged { iteration, phase } if self.verbose => Some(format!(
                "{} {}",
                format!("[{}]", iteration).dimmed(),
                phase.as_str().dimmed()
            )),
            AgentEvent::Thought { text, .. } if self.verbose && !text.trim().is_empty() => {
                Some(format!("    {}", one_line(text, PREVIEW_CHARS).dimmed()))
            }
            AgentEvent::Reflection { summary, .. } if self.verbose => {
                Some(format!("    {} {}", "↺".dimmed(), summary.dimmed()))
            }
            AgentEvent::PhaseChanged { .. }
            | AgentEvent::Thought { .. }
            | AgentEvent::Reflection { .. } => None,
            AgentEvent::Action {
                iteration,
                invocation,
            } => Some(format!(
                "{} {} {}",
                format!("[{}]", iteration).dimmed(),
                "→".cyan(),
                describe_action(invocation)
            )),
            AgentEvent::Observation { record, .. } => Some(describe_observation(record)),
            AgentEvent::LoopWarning(signal) => {
                let label = format!("{} ({}x)", signal.kind, signal.count);
                let line = match signal.severity {
                    SignalSeverity::Warn => format!("{} {}", "⚠".yellow(), label.yellow().bold()),
                    SignalSeverity::Abort => format!("{} {}", "✗".red(), label.red().bold()),
                };
                Some(format!("{}: {}", line, signal.suggestion))
            }
            AgentEvent::PlanApprovalRequest(plan) => {
                let mut text = format!(
                    "{} plan {} ({}, {} steps) awaits approval",
                    "?".yellow().bold(),
                    plan.id(),
                    plan.complexity().as_str(),
                    plan.steps().len()
                );
                for step in plan.steps() {
                    text.push_str(&format!(
                        "\n    {}. [{}] {}",
                        step.index + 1,
                        step.risk.as_str(),
                        step.description
                    ));
                }
                Some(text)
            }
            AgentEvent::CompressionApplied(state) => Some(format!(
                "{} context compressed: {} tokens saved, now {}/{} ({:.0}%)",
                "⇣".cyan(),
                state.tokens_saved,
                state.current_tokens,
                state.max_tokens,
                state.usage_ratio * 100.0
            )),
            AgentEvent::IterationCeilingWarning {
                iteration,
                max_iterations,
            } => Some(format!(
                "{} iteration {} of {}: wrap up soon",
                "⚠".yellow(),
                iteration,
                max_iterations
            )),
            AgentEvent::Completed(outcome) => {
                Some(ConsoleFormatter::format_outcome(outcome).trim_end().to_string())
            }
        }
    }

    /// Print every event from `rx` to stderr until the channel closes.
    pub fn spawn(self, mut rx: mpsc::UnboundedReceiver<AgentEvent>) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                if let Some(line) = self.render(&event) {
                    eprintln!("{}", line);
                }
            }
        })
    }
}

fn describe_action(invocation: &ToolInvocation) -> String {
    let name = invocation.kind.name().bold();
    if let Some(command) = invocation.get_string("command") {
        return format!("{} {}", name, one_line(command, PREVIEW_CHARS));
    }
    if let Some(path) = invocation.target_path() {
        return format!("{} {}", name, path);
    }
    if let Some(pattern) = invocation.get_string("pattern") {
        return format!("{} /{}/", name, pattern);
    }
    name.to_string()
}

fn describe_observation(record: &ActionRecord) -> String {
    if record.success {
        format!(
            "    {} {}",
            "✓".green(),
            one_line(&record.result_summary, PREVIEW_CHARS)
        )
    } else {
        format!(
            "    {} {}",
            "✗".red(),
            one_line(
                record.error.as_deref().unwrap_or(&record.result_summary),
                PREVIEW_CHARS
            )
            .red()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratchet_domain::{
        AgentOutcome, AgentPhase, LoopKind, LoopSignal, ToolError, ToolKind, ToolOutcome,
    };

    fn plain() {
        ConsoleFormatter::use_color(false);
    }

    #[test]
    fn test_quiet_mode_hides_thoughts() {
        plain();
        let renderer = EventRenderer::new();
        let thought = AgentEvent::Thought {
            iteration: 1,
            text: "let me look".to_string(),
        };
        let phase = AgentEvent::PhaseChanged {
            iteration: 1,
            phase: AgentPhase::Thinking,
        };
        assert!(renderer.render(&thought).is_none());
        assert!(renderer.render(&phase).is_none());
        assert_eq!(
            EventRenderer::verbose().render(&thought).unwrap(),
            "    let me look"
        );
    }

    #[test]
    fn test_actions_and_observations() {
        plain();
        let renderer = EventRenderer::new();
        let invocation = ToolInvocation::new(ToolKind::ReadFile).with_arg("path", "src/lib.rs");
        assert_eq!(
            renderer
                .render(&AgentEvent::Action {
                    iteration: 2,
                    invocation: invocation.clone(),
                })
                .unwrap(),
            "[2] → read_file src/lib.rs"
        );

        let failed = ActionRecord::from_outcome(
            &invocation,
            &ToolOutcome::failure(ToolError::not_found("src/lib.rs")),
        );
        let line = renderer
            .render(&AgentEvent::Observation {
                iteration: 2,
                record: failed,
            })
            .unwrap();
        assert!(line.starts_with("    ✗ "));
        assert!(line.contains("src/lib.rs"));
    }

    #[test]
    fn test_warnings_and_outcome() {
        plain();
        let renderer = EventRenderer::new();
        let signal = LoopSignal {
            kind: LoopKind::ReadLoop,
            count: 4,
            severity: SignalSeverity::Warn,
            suggestion: "write the change".to_string(),
            path: Some("a.rs".to_string()),
        };
        assert_eq!(
            renderer.render(&AgentEvent::LoopWarning(signal)).unwrap(),
            "⚠ read_loop (4x): write the change"
        );
        assert_eq!(
            renderer
                .render(&AgentEvent::Completed(AgentOutcome::complete(3, vec![])))
                .unwrap(),
            "COMPLETE after 3 iterations"
        );
    }

    #[tokio::test]
    async fn test_spawn_drains_until_closed() {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = EventRenderer::new().spawn(rx);
        tx.send(AgentEvent::IterationCeilingWarning {
            iteration: 45,
            max_iterations: 50,
        })
        .unwrap();
        drop(tx);
        handle.await.unwrap();
    }
}
