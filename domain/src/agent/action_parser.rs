//! Incremental action parser.
//!
//! Consumes a model turn chunk by chunk and emits a [`ParserEvent`] as soon
//! as a syntactically complete action is recognised, without waiting for the
//! turn to finish.
//!
//! # Grammar
//!
//! ````text
//! prose   := any text outside an action block
//! action  := "```action" NL body "```"
//!          | "```tool_call" NL body "```"
//!          | "<tool_call>" body "</tool_call>"
//! body    := JSON object {"tool": str, "args": object, "independent"?: bool}
//!            ("name" / "arguments" accepted as synonyms)
//! ````
//!
//! Structured tool calls streamed as `ToolCallDelta` events are assembled
//! per index and emitted by [`ActionParser::finish`].
//!
//! # States
//!
//! ```text
//! Prose ──opener──▶ Body ──closer──▶ Prose
//! ```
//!
//! A closer only ends a body outside a JSON string, so file contents that
//! contain fences or tags survive intact. A body that is not valid JSON gets
//! one repair pass ([`repair_json`](crate::validation::repair::repair_json)),
//! which never closes an unterminated string; if that fails, or the turn
//! ends inside a body, the parser emits an [`ActionParseError`] instead.

use crate::tool::entities::{ToolInvocation, ToolKind};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

const FENCE_OPENERS: [&str; 2] = ["```action", "```tool_call"];
const TAG_OPENER: &str = "<tool_call>";
const FENCE_CLOSER: &str = "```";
const TAG_CLOSER: &str = "</tool_call>";

/// An action recognised in model output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedAction {
    pub invocation: ToolInvocation,
    /// Tool name exactly as the model wrote it.
    pub raw_name: String,
    /// The model marked this action as safe to run concurrently.
    pub independent: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionParseError {
    pub raw_name: Option<String>,
    pub message: String,
}

impl std::fmt::Display for ActionParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.raw_name {
            Some(name) => write!(f, "could not parse call to '{}': {}", name, self.message),
            None => write!(f, "could not parse action: {}", self.message),
        }
    }
}

impl std::error::Error for ActionParseError {}

#[derive(Debug, Clone, PartialEq)]
pub enum ParserEvent {
    Action(ParsedAction),
    Error(ActionParseError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Prose,
    Body { closer: &'static str },
}

/// Position of the body scanner relative to JSON string literals.
#[derive(Debug, Clone, Copy, Default)]
struct BodyScan {
    in_string: bool,
    escaped: bool,
}

impl BodyScan {
    fn advance(&mut self, c: char) {
        if !self.in_string {
            self.in_string = c == '"';
        } else if self.escaped {
            self.escaped = false;
        } else if c == '\\' {
            self.escaped = true;
        } else if c == '"' {
            self.in_string = false;
        }
    }
}

#[derive(Debug, Default)]
struct ToolCallBuffer {
    name: String,
    arguments: String,
}

#[derive(Debug)]
pub struct ActionParser {
    mode: Mode,
    pending: String,
    body: String,
    scan: BodyScan,
    prose: String,
    tool_calls: BTreeMap<usize, ToolCallBuffer>,
}

impl Default for ActionParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ActionParser {
    pub fn new() -> Self {
        Self {
            mode: Mode::Prose,
            pending: String::new(),
            body: String::new(),
            scan: BodyScan::default(),
            prose: String::new(),
            tool_calls: BTreeMap::new(),
        }
    }

    /// Text outside action blocks seen so far.
    pub fn prose(&self) -> &str {
        &self.prose
    }

    /// Feed the next text chunk.
    pub fn feed(&mut self, chunk: &str) -> Vec<ParserEvent> {
        self.pending.push_str(chunk);
        let mut events = Vec::new();
        while self.step(&mut events) {}
        events
    }

    /// Accumulate a structured tool-call fragment.
    pub fn feed_tool_call_delta(
        &mut self,
        index: usize,
        name: Option<&str>,
        arguments_delta: &str,
    ) {
        let buffer = self.tool_calls.entry(index).or_default();
        if let Some(name) = name {
            buffer.name.push_str(name);
        }
        buffer.arguments.push_str(arguments_delta);
    }

    /// End of turn: flush held-back text and the assembled structured tool
    /// calls. A block still open is reported as an error, never parsed.
    pub fn finish(&mut self) -> Vec<ParserEvent> {
        let mut events = Vec::new();
        let rest = std::mem::take(&mut self.pending);
        match self.mode {
            Mode::Prose => self.prose.push_str(&rest),
            Mode::Body { closer } => {
                self.body.push_str(&rest);
                let body = std::mem::take(&mut self.body);
                events.push(ParserEvent::Error(ActionParseError {
                    raw_name: None,
                    message: format!(
                        "action block not terminated with '{}' ({} bytes discarded)",
                        closer,
                        body.len()
                    ),
                }));
                self.mode = Mode::Prose;
            }
        }
        for (_, call) in std::mem::take(&mut self.tool_calls) {
            events.push(to_event(assemble_tool_call(&call.name, &call.arguments)));
        }
        events
    }

    /// Make one unit of progress; `false` when more input is needed.
    fn step(&mut self, events: &mut Vec<ParserEvent>) -> bool {
        match self.mode {
            Mode::Prose => self.step_prose(),
            Mode::Body { closer } => self.step_body(closer, events),
        }
    }

    fn step_prose(&mut self) -> bool {
        let Some((pos, opener)) = find_opener(&self.pending) else {
            let keep = held_back(&self.pending, &[FENCE_OPENERS[0], FENCE_OPENERS[1], TAG_OPENER]);
            let flush = self.pending.len() - keep;
            self.prose.push_str(&self.pending[..flush]);
            self.pending.drain(..flush);
            return false;
        };

        if opener == TAG_OPENER {
            self.prose.push_str(&self.pending[..pos]);
            self.pending.drain(..pos + opener.len());
            self.enter_body(TAG_CLOSER);
            return true;
        }

        // A fence opener must be followed by the end of its line.
        let after = pos + opener.len();
        let Some(newline) = self.pending[after..].find('\n') else {
            self.prose.push_str(&self.pending[..pos]);
            self.pending.drain(..pos);
            return false;
        };
        if !self.pending[after..after + newline].trim().is_empty() {
            // e.g. "```actionscript": ordinary prose
            self.prose.push_str(&self.pending[..after]);
            self.pending.drain(..after);
            return true;
        }
        self.prose.push_str(&self.pending[..pos]);
        self.pending.drain(..after + newline + 1);
        self.enter_body(FENCE_CLOSER);
        true
    }

    fn enter_body(&mut self, closer: &'static str) {
        self.mode = Mode::Body { closer };
        self.scan = BodyScan::default();
    }

    fn step_body(&mut self, closer: &'static str, events: &mut Vec<ParserEvent>) -> bool {
        let mut consumed = 0;
        let mut found = None;
        for (i, c) in self.pending.char_indices() {
            if !self.scan.in_string {
                let rest = &self.pending[i..];
                if rest.starts_with(closer) {
                    found = Some(i);
                    break;
                }
                if closer.starts_with(rest) {
                    // possibly a closer split across chunks
                    break;
                }
            }
            self.scan.advance(c);
            consumed = i + c.len_utf8();
        }

        match found {
            Some(pos) => {
                self.body.push_str(&self.pending[..pos]);
                self.pending.drain(..pos + closer.len());
                let body = std::mem::take(&mut self.body);
                events.push(to_event(parse_action_body(&body)));
                self.mode = Mode::Prose;
                true
            }
            None => {
                self.body.push_str(&self.pending[..consumed]);
                self.pending.drain(..consumed);
                false
            }
        }
    }
}

fn to_event(result: Result<ParsedAction, ActionParseError>) -> ParserEvent {
    match result {
        Ok(action) => ParserEvent::Action(action),
        Err(error) => ParserEvent::Error(error),
    }
}

fn find_opener(text: &str) -> Option<(usize, &'static str)> {
    FENCE_OPENERS
        .iter()
        .chain(std::iter::once(&TAG_OPENER))
        .filter_map(|opener| text.find(opener).map(|pos| (pos, *opener)))
        // earliest match; the longer opener wins a tie
        .min_by_key(|(pos, opener)| (*pos, usize::MAX - opener.len()))
}

/// Length of the longest suffix of `text` that could start one of `markers`.
fn held_back(text: &str, markers: &[&str]) -> usize {
    markers
        .iter()
        .flat_map(|marker| (1..marker.len()).map(move |k| &marker[..k]))
        .filter(|prefix| text.ends_with(prefix))
        .map(str::len)
        .max()
        .unwrap_or(0)
}

fn parse_json_once_repaired(text: &str) -> Result<Value, String> {
    match serde_json::from_str::<Value>(text.trim()) {
        Ok(value) => Ok(value),
        Err(first) => crate::validation::repair::repair_json(text)
            .and_then(|fixed| serde_json::from_str::<Value>(&fixed).ok())
            .ok_or_else(|| first.to_string()),
    }
}

/// Parse one action body.
pub fn parse_action_body(body: &str) -> Result<ParsedAction, ActionParseError> {
    let value = parse_json_once_repaired(body).map_err(|message| ActionParseError {
        raw_name: None,
        message: format!("invalid action JSON: {}", message),
    })?;
    let Value::Object(object) = value else {
        return Err(ActionParseError {
            raw_name: None,
            message: "action must be a JSON object".to_string(),
        });
    };

    let raw_name = object
        .get("tool")
        .or_else(|| object.get("name"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ActionParseError {
            raw_name: None,
            message: "missing 'tool' field".to_string(),
        })?;

    let args = match object.get("args").or_else(|| object.get("arguments")) {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(map)) => map.clone(),
        Some(Value::String(encoded)) => decode_arguments(&raw_name, encoded)?,
        Some(_) => {
            return Err(ActionParseError {
                raw_name: Some(raw_name),
                message: "'args' must be an object".to_string(),
            });
        }
    };

    let independent = object
        .get("independent")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    Ok(ParsedAction {
        invocation: ToolInvocation {
            kind: ToolKind::parse(&raw_name),
            args,
        },
        raw_name,
        independent,
    })
}

fn decode_arguments(raw_name: &str, encoded: &str) -> Result<Map<String, Value>, ActionParseError> {
    if encoded.trim().is_empty() {
        return Ok(Map::new());
    }
    match parse_json_once_repaired(encoded) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(ActionParseError {
            raw_name: Some(raw_name.to_string()),
            message: "arguments must be a JSON object".to_string(),
        }),
        Err(message) => Err(ActionParseError {
            raw_name: Some(raw_name.to_string()),
            message: format!("invalid arguments JSON: {}", message),
        }),
    }
}

fn assemble_tool_call(name: &str, arguments: &str) -> Result<ParsedAction, ActionParseError> {
    if name.trim().is_empty() {
        return Err(ActionParseError {
            raw_name: None,
            message: "tool call without a name".to_string(),
        });
    }
    let args = decode_arguments(name, arguments)?;
    Ok(ParsedAction {
        invocation: ToolInvocation {
            kind: ToolKind::parse(name),
            args,
        },
        raw_name: name.to_string(),
        independent: false,
    })
}
