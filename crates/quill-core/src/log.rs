use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::PlanId;

/// One recorded tool/specialist execution.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolExecutionEntry {
    pub timestamp: DateTime<Utc>,
    pub tool_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub specialist: Option<String>,
    pub success: bool,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleEventType {
    SpecialistCompleted,
    StepFailed,
    PlanFailed,
    PlanCompleted,
}

/// One recorded lifecycle event (plan/specialist level).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LifecycleEntry {
    pub timestamp: DateTime<Utc>,
    pub event_type: LifecycleEventType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan_id: Option<PlanId>,
    pub detail: String,
}

impl ToolExecutionEntry {
    pub fn now(tool_name: impl Into<String>, success: bool, duration_ms: u64) -> Self {
        Self {
            timestamp: Utc::now(),
            tool_name: tool_name.into(),
            specialist: None,
            success,
            duration_ms,
            error: None,
        }
    }

    pub fn with_specialist(mut self, specialist: impl Into<String>) -> Self {
        self.specialist = Some(specialist.into());
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

impl LifecycleEntry {
    pub fn now(event_type: LifecycleEventType, detail: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            event_type,
            plan_id: None,
            detail: detail.into(),
        }
    }

    pub fn with_plan(mut self, plan_id: PlanId) -> Self {
        self.plan_id = Some(plan_id);
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Best-effort recording boundary. Engine call sites swallow failures with a
/// warning; recording must never fail a task.
#[async_trait]
pub trait SessionLog: Send + Sync {
    async fn record_tool_execution(&self, entry: ToolExecutionEntry) -> Result<(), LogError>;
    async fn record_lifecycle_event(&self, entry: LifecycleEntry) -> Result<(), LogError>;
}

/// Discards everything. For tests and callers that don't keep a log.
pub struct NullSessionLog;

#[async_trait]
impl SessionLog for NullSessionLog {
    async fn record_tool_execution(&self, _entry: ToolExecutionEntry) -> Result<(), LogError> {
        Ok(())
    }

    async fn record_lifecycle_event(&self, _entry: LifecycleEntry) -> Result<(), LogError> {
        Ok(())
    }
}
