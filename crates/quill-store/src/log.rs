use std::path::PathBuf;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;

use quill_core::log::{LifecycleEntry, LogError, SessionLog, ToolExecutionEntry};

use crate::paths::SessionPaths;

/// Append-only JSONL event log under `.quill/logs/events.jsonl`. One JSON
/// object per line; a corrupt tail never invalidates earlier lines.
pub struct JsonlSessionLog {
    path: PathBuf,
    // Serializes appends from concurrent tasks onto one file handle path.
    write_lock: Mutex<()>,
}

#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum EventLine<'a> {
    ToolExecution(&'a ToolExecutionEntry),
    Lifecycle(&'a LifecycleEntry),
}

impl JsonlSessionLog {
    pub fn new(paths: &SessionPaths) -> Self {
        Self {
            path: paths.logs_dir().join("events.jsonl"),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn append(&self, line: String) -> Result<(), LogError> {
        use std::io::Write;

        let _guard = self.write_lock.lock();
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| LogError::Io(e.to_string()))?;
        }
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| LogError::Io(e.to_string()))?;
        writeln!(file, "{line}").map_err(|e| LogError::Io(e.to_string()))
    }
}

#[async_trait]
impl SessionLog for JsonlSessionLog {
    async fn record_tool_execution(&self, entry: ToolExecutionEntry) -> Result<(), LogError> {
        let line = serde_json::to_string(&EventLine::ToolExecution(&entry))
            .map_err(|e| LogError::Serialization(e.to_string()))?;
        self.append(line)
    }

    async fn record_lifecycle_event(&self, entry: LifecycleEntry) -> Result<(), LogError> {
        let line = serde_json::to_string(&EventLine::Lifecycle(&entry))
            .map_err(|e| LogError::Serialization(e.to_string()))?;
        self.append(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_core::log::LifecycleEventType;

    fn temp_paths() -> (PathBuf, SessionPaths) {
        let dir = std::env::temp_dir().join(format!("quill_log_test_{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        let paths = SessionPaths::new(&dir);
        (dir, paths)
    }

    #[tokio::test]
    async fn appends_one_json_object_per_line() {
        let (dir, paths) = temp_paths();
        let log = JsonlSessionLog::new(&paths);

        log.record_tool_execution(ToolExecutionEntry::now("readFile", true, 12))
            .await
            .unwrap();
        log.record_lifecycle_event(LifecycleEntry::now(
            LifecycleEventType::PlanCompleted,
            "all steps done",
        ))
        .await
        .unwrap();

        let raw = std::fs::read_to_string(log.path()).unwrap();
        let lines: Vec<&str> = raw.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["kind"], "tool_execution");
        assert_eq!(first["tool_name"], "readFile");

        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["kind"], "lifecycle");
        assert_eq!(second["event_type"], "plan_completed");

        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn creates_log_directory_on_first_write() {
        let (dir, paths) = temp_paths();
        let log = JsonlSessionLog::new(&paths);
        assert!(!paths.logs_dir().exists());

        log.record_tool_execution(ToolExecutionEntry::now("writeFile", false, 3).with_error("boom"))
            .await
            .unwrap();
        assert!(log.path().exists());

        std::fs::remove_dir_all(&dir).ok();
    }
}
