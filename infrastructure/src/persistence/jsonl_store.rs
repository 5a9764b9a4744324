//! JSONL file writer for agent records.
//!
//! Each record is serialized as a single JSON line with a `type` field and
//! a `timestamp`, appended to the file via a buffered writer.

use ratchet_application::{PersistenceError, PersistenceStore};
use ratchet_domain::{ActionRecord, LoopSignal, PlanId, PlanStep};
use serde::Serialize;
use serde_json::Value;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

/// Append-only JSONL store that writes one JSON object per line.
///
/// Thread-safe via `Mutex<BufWriter<File>>`. Every append is flushed, so a
/// crash loses at most the line being written.
pub struct JsonlPersistenceStore {
    writer: Mutex<BufWriter<File>>,
    path: PathBuf,
}

impl JsonlPersistenceStore {
    /// Open (or create) the store at `path`, creating parent directories.
    /// Existing records are kept.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        debug!(path = %path.display(), "Opened record store");
        Ok(Self {
            writer: Mutex::new(BufWriter::new(file)),
            path: path.to_path_buf(),
        })
    }

    /// Get the path to the record file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> MutexGuard<'_, BufWriter<File>> {
        self.writer.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn append(&self, record_type: &str, payload: &impl Serialize) -> Result<(), PersistenceError> {
        let mut record = match serde_json::to_value(payload)? {
            Value::Object(map) => map,
            other => {
                let mut map = serde_json::Map::new();
                map.insert("data".to_string(), other);
                map
            }
        };
        record.insert("type".to_string(), Value::String(record_type.to_string()));
        if !record.contains_key("timestamp") {
            let now = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
            record.insert("timestamp".to_string(), Value::String(now));
        }

        let line = serde_json::to_string(&Value::Object(record))?;
        let mut writer = self.lock();
        writeln!(writer, "{}", line)?;
        writer.flush()?;
        Ok(())
    }
}

#[derive(Serialize)]
struct PlanStepRecord<'a> {
    plan_id: &'a PlanId,
    #[serde(flatten)]
    step: &'a PlanStep,
}

impl PersistenceStore for JsonlPersistenceStore {
    fn append_action_record(&self, record: &ActionRecord) -> Result<(), PersistenceError> {
        self.append("action_record", record)
    }

    fn append_error_pattern(&self, signal: &LoopSignal) -> Result<(), PersistenceError> {
        self.append("error_pattern", signal)
    }

    fn append_plan_step(&self, plan: &PlanId, step: &PlanStep) -> Result<(), PersistenceError> {
        self.append("plan_step", &PlanStepRecord { plan_id: plan, step })
    }
}

impl Drop for JsonlPersistenceStore {
    fn drop(&mut self) {
        let _ = self.lock().flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratchet_domain::{
        LoopKind, SignalSeverity, StepRisk, ToolInvocation, ToolKind, ToolOutcome,
    };

    fn lines(path: &Path) -> Vec<Value> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn test_store_writes_one_typed_line_per_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("records.jsonl");
        let store = JsonlPersistenceStore::open(&path).unwrap();

        let invocation = ToolInvocation::new(ToolKind::ReadFile).with_arg("path", "src/lib.rs");
        let record = ActionRecord::from_outcome(&invocation, &ToolOutcome::success("ok"));
        store.append_action_record(&record).unwrap();
        store
            .append_plan_step(
                &PlanId::new("plan-1"),
                &PlanStep::new(0, "inspect the parser", StepRisk::Low),
            )
            .unwrap();
        drop(store);

        let values = lines(&path);
        assert_eq!(values.len(), 2);
        assert!(values.iter().all(|v| v.get("timestamp").is_some()));

        assert_eq!(values[0]["type"], "action_record");
        assert_eq!(values[0]["success"], true);
        assert_eq!(values[0]["args"]["path"], "src/lib.rs");

        assert_eq!(values[1]["type"], "plan_step");
        assert_eq!(values[1]["plan_id"], "plan-1");
        assert_eq!(values[1]["description"], "inspect the parser");
    }

    #[test]
    fn test_reopen_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.jsonl");
        let signal = LoopSignal {
            kind: LoopKind::ReadLoop,
            count: 5,
            severity: SignalSeverity::Warn,
            suggestion: "edit the file or move on".to_string(),
            path: Some("a.rs".to_string()),
        };

        JsonlPersistenceStore::open(&path)
            .unwrap()
            .append_error_pattern(&signal)
            .unwrap();
        JsonlPersistenceStore::open(&path)
            .unwrap()
            .append_error_pattern(&signal)
            .unwrap();

        let values = lines(&path);
        assert_eq!(values.len(), 2);
        assert_eq!(values[1]["type"], "error_pattern");
        assert_eq!(values[1]["kind"], "READ_LOOP");
    }

    #[test]
    fn test_open_fails_when_parent_is_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "").unwrap();
        assert!(JsonlPersistenceStore::open(blocker.join("records.jsonl")).is_err());
    }
}
