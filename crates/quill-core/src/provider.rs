use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::ids::ToolCallId;

/// One message in the conversation history handed to the model.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "role")]
pub enum ModelMessage {
    #[serde(rename = "user")]
    User { content: String },
    #[serde(rename = "assistant")]
    Assistant { content: String },
    #[serde(rename = "tool_result")]
    ToolResult {
        tool_call_id: ToolCallId,
        content: String,
        is_error: bool,
    },
}

impl ModelMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self::User { content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::Assistant { content: content.into() }
    }

    pub fn tool_result(tool_call_id: ToolCallId, content: impl Into<String>, is_error: bool) -> Self {
        Self::ToolResult {
            tool_call_id,
            content: content.into(),
            is_error,
        }
    }
}

/// A tool invocation requested by the model.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: ToolCallId,
    pub name: String,
    pub arguments: serde_json::Value,
}

/// What the model came back with for one round-trip.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ModelTurn {
    /// Task is done; `content` is the specialist's final output.
    Completed {
        content: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        context_for_next: Option<serde_json::Value>,
    },
    /// The model wants these tools executed before it can continue.
    ToolCalls(Vec<ToolCall>),
    /// The model needs a human decision before it can continue.
    AskUser { question: String },
}

#[derive(Clone, Debug, thiserror::Error)]
pub enum ModelError {
    // Fatal — don't retry
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    // Retryable
    #[error("rate limited")]
    RateLimited,
    #[error("server error {status}: {body}")]
    ServerError { status: u16, body: String },
    #[error("network error: {0}")]
    NetworkError(String),

    // Operational
    #[error("timeout")]
    Timeout,
}

impl ModelError {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited | Self::ServerError { .. } | Self::NetworkError(_)
        )
    }

    /// Short classification string for logging.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::AuthenticationFailed(_) => "authentication_failed",
            Self::InvalidRequest(_) => "invalid_request",
            Self::RateLimited => "rate_limited",
            Self::ServerError { .. } => "server_error",
            Self::NetworkError(_) => "network_error",
            Self::Timeout => "timeout",
        }
    }
}

/// The opaque model handle passed through from the caller. The engine only
/// forwards prompts and history; it never inspects provider internals.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn complete(
        &self,
        prompt: &str,
        history: &[ModelMessage],
    ) -> Result<ModelTurn, ModelError>;
}
