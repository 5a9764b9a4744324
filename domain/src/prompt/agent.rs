//! Prompt templates for the agent loop

use crate::agent::iteration::ActionRecord;
use crate::correction::signal::LoopSignal;
use crate::planning::entities::ExecutionPlan;
use crate::session::entities::{Message, Role};
use crate::tool::entities::ToolKind;

/// Templates for generating agent prompts
pub struct AgentPromptTemplate;

impl AgentPromptTemplate {
    /// System prompt describing the available tools and the action format.
    pub fn agent_system(tools: &[ToolKind]) -> String {
        let tool_descriptions = tools
            .iter()
            .map(|tool| {
                let args = tool.required_args();
                let args = if args.is_empty() {
                    String::new()
                } else {
                    format!(" (args: {})", args.join(", "))
                };
                format!("- **{}**: {}{}", tool.name(), describe(tool), args)
            })
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            r#"You are an autonomous coding agent working inside a project workspace.

## Available Tools

{tool_descriptions}

## How to Use Tools

Think briefly, then request each tool call as a fenced block:

```action
{{"tool": "read_file", "args": {{"path": "src/main.rs"}}}}
```

Several blocks may follow each other. Mark a call with `"independent": true`
only when it neither depends on nor affects the other calls of the turn.

## Guidelines

1. Read a file once and keep what you learned; do not re-read it without a change in between
2. Write whole, syntactically complete files; every write is checked and rolled back on failure
3. After a failure, change your approach instead of repeating the same call
4. When the task is done, answer without any action block
"#
        )
    }

    /// System note injected after a loop warning.
    pub fn corrective_note(signal: &LoopSignal) -> String {
        let target = signal
            .path
            .as_deref()
            .map(|p| format!(" on `{}`", p))
            .unwrap_or_default();
        format!(
            "[self-correction] {} detected{} ({} occurrences). {}",
            signal.kind, target, signal.count, signal.suggestion
        )
    }

    /// Observation message for one turn's actions.
    pub fn observations(records: &[ActionRecord]) -> String {
        records
            .iter()
            .map(ActionRecord::observation)
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Approved plan steps, added to the conversation before the first turn.
    pub fn plan_context(plan: &ExecutionPlan) -> String {
        let steps = plan
            .steps()
            .iter()
            .map(|s| format!("{}. {}", s.index + 1, s.description))
            .collect::<Vec<_>>()
            .join("\n");
        format!(
            "## Approved plan ({} task)\n\n{}\n\nFollow these steps in order.",
            plan.complexity(),
            steps
        )
    }

    /// Request to condense a batch of older messages into one summary.
    pub fn summarization(messages: &[Message]) -> String {
        let transcript = messages
            .iter()
            .map(|m| format!("[{}] {}", label(m.role, m.summary), m.content))
            .collect::<Vec<_>>()
            .join("\n\n");
        format!(
            r#"Summarize the following part of a coding session so the work can continue without it.

Keep file paths, decisions, errors and their fixes, and what remains to be done.
Drop tool output that is no longer relevant. Answer with the summary only.

---

{transcript}"#
        )
    }
}

fn describe(tool: &ToolKind) -> &str {
    match tool {
        ToolKind::ReadFile => "Read a file's contents",
        ToolKind::WriteFile => "Create or overwrite a file",
        ToolKind::EditFile => "Replace an exact text fragment in a file",
        ToolKind::DeleteFile => "Delete a file",
        ToolKind::ListDirectory => "List the entries of a directory",
        ToolKind::SearchFiles => "Search file contents with a regular expression",
        ToolKind::RunCommand => "Run a shell command in the workspace",
        ToolKind::RunTests => "Run the project's test suite",
        ToolKind::Custom(_) => "Project-specific tool",
    }
}

fn label(role: Role, summary: bool) -> &'static str {
    if summary {
        "summary"
    } else {
        role.as_str()
    }
}
