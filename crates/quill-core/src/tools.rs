use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Boundary to the external tool registry. Implementations may reject with
/// any error; the engine wraps every call and never lets one propagate.
#[async_trait]
pub trait ToolRegistry: Send + Sync {
    async fn execute_tool(
        &self,
        name: &str,
        args: serde_json::Value,
    ) -> Result<serde_json::Value, ToolError>;

    /// Names of the tools this registry can execute, for error guidance.
    fn available_tools(&self) -> Vec<String>;
}

/// Structured per-call result. A failed call carries an enhanced error
/// message instead of aborting its sibling calls.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolCallOutcome {
    pub tool_name: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolCallOutcome {
    pub fn ok(tool_name: impl Into<String>, output: serde_json::Value) -> Self {
        Self {
            tool_name: tool_name.into(),
            success: true,
            output: Some(output),
            error: None,
        }
    }

    pub fn failed(tool_name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            success: false,
            output: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Tool implementation not found: {0}")]
    NotFound(String),
    #[error("Missing required parameter: {0}")]
    MissingParameter(String),
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
    #[error("execution failed: {0}")]
    ExecutionFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_constructors() {
        let ok = ToolCallOutcome::ok("readMarkdownFile", serde_json::json!({"lines": 10}));
        assert!(ok.success);
        assert!(ok.error.is_none());

        let failed = ToolCallOutcome::failed("writeFile", "disk full");
        assert!(!failed.success);
        assert_eq!(failed.error.as_deref(), Some("disk full"));
        assert!(failed.output.is_none());
    }

    #[test]
    fn error_display_matches_classifier_inputs() {
        // The classifier matches on these renderings.
        let e = ToolError::NotFound("ghostTool".into());
        assert!(e.to_string().contains("Tool implementation not found"));
        let e = ToolError::MissingParameter("targetFile".into());
        assert!(e.to_string().contains("Missing required parameter"));
    }
}
