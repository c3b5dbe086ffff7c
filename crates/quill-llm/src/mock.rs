use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use quill_core::ids::ToolCallId;
use quill_core::provider::{ModelError, ModelMessage, ModelProvider, ModelTurn, ToolCall};

/// Pre-programmed responses for deterministic testing without API calls.
pub enum MockTurn {
    /// Return this turn.
    Turn(ModelTurn),
    /// Return an error from the complete() call itself.
    Error(ModelError),
    /// Wait a duration, then yield the inner response.
    Delay(Duration, Box<MockTurn>),
}

impl MockTurn {
    /// Convenience: a completed turn with final content.
    pub fn completed(content: &str) -> Self {
        Self::Turn(ModelTurn::Completed {
            content: content.to_string(),
            context_for_next: None,
        })
    }

    /// Convenience: a single tool-call request.
    pub fn tool_call(name: &str, arguments: serde_json::Value) -> Self {
        Self::Turn(ModelTurn::ToolCalls(vec![ToolCall {
            id: ToolCallId::new(),
            name: name.to_string(),
            arguments,
        }]))
    }

    /// Convenience: ask the user a question.
    pub fn ask_user(question: &str) -> Self {
        Self::Turn(ModelTurn::AskUser {
            question: question.to_string(),
        })
    }

    /// Convenience: wrap any response with a delay.
    pub fn delayed(delay: Duration, inner: MockTurn) -> Self {
        Self::Delay(delay, Box::new(inner))
    }
}

/// Mock provider that returns pre-programmed responses in sequence.
pub struct MockModel {
    responses: Mutex<VecDeque<MockTurn>>,
    call_count: AtomicUsize,
}

impl MockModel {
    pub fn new(responses: Vec<MockTurn>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            call_count: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl ModelProvider for MockModel {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(
        &self,
        _prompt: &str,
        _history: &[ModelMessage],
    ) -> Result<ModelTurn, ModelError> {
        let idx = self.call_count.fetch_add(1, Ordering::Relaxed);

        let mut next = match self.responses.lock().pop_front() {
            Some(r) => r,
            None => {
                return Err(ModelError::InvalidRequest(format!(
                    "MockModel: no response configured for call {idx}"
                )))
            }
        };

        loop {
            match next {
                MockTurn::Turn(turn) => return Ok(turn),
                MockTurn::Error(e) => return Err(e),
                MockTurn::Delay(d, inner) => {
                    tokio::time::sleep(d).await;
                    next = *inner;
                }
            }
        }
    }
}
