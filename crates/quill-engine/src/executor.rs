use std::sync::Arc;
use std::time::Instant;

use quill_core::log::{LifecycleEntry, LifecycleEventType, SessionLog, ToolExecutionEntry};
use quill_core::plan::{OutputMetadata, SpecialistOutput};
use quill_core::provider::{ModelMessage, ModelProvider, ModelTurn, ToolCall};
use quill_core::tools::{ToolCallOutcome, ToolRegistry};
use tracing::{debug, instrument, warn};

use crate::assembler::{AssemblyContext, PromptAssembler};
use crate::classify::enhance;
use crate::error::EngineError;
use crate::policy::IterationPolicy;
use crate::registry::SpecialistRegistry;

/// Drives one specialist invocation: assemble a prompt, await the model,
/// execute any requested tool calls, loop until the model completes, asks
/// for the user, or the iteration cap trips.
pub struct SpecialistExecutor {
    registry: Arc<SpecialistRegistry>,
    policy: IterationPolicy,
    assembler: Arc<dyn PromptAssembler>,
    tools: Arc<dyn ToolRegistry>,
    log: Arc<dyn SessionLog>,
}

impl SpecialistExecutor {
    pub fn new(
        registry: Arc<SpecialistRegistry>,
        policy: IterationPolicy,
        assembler: Arc<dyn PromptAssembler>,
        tools: Arc<dyn ToolRegistry>,
        log: Arc<dyn SessionLog>,
    ) -> Self {
        Self {
            registry,
            policy,
            assembler,
            tools,
            log,
        }
    }

    pub fn registry(&self) -> &SpecialistRegistry {
        &self.registry
    }

    /// Run one specialist to completion. Failures come back as a structured
    /// output with `success: false`, never as a panic or a propagated error;
    /// the caller decides whether the plan survives.
    #[instrument(skip(self, model, ctx))]
    pub async fn execute(
        &self,
        model: &dyn ModelProvider,
        specialist: &str,
        ctx: &AssemblyContext,
    ) -> SpecialistOutput {
        let started = Instant::now();
        let decision = self.policy.resolve(specialist, self.registry.get(specialist));
        debug!(
            max_iterations = decision.max_iterations,
            source = %decision.source,
            "resolved iteration cap"
        );

        let prompt = match self.assembler.assemble(specialist, ctx).await {
            Ok(prompt) => prompt,
            Err(e) => {
                return SpecialistOutput::failed(
                    format!("prompt assembly failed: {e}"),
                    metadata(0, 0, started),
                )
            }
        };

        let mut history: Vec<ModelMessage> = Vec::new();
        let mut iterations = 0u32;
        let mut loop_iterations = 0u32;

        while iterations < decision.max_iterations {
            iterations += 1;
            match model.complete(&prompt, &history).await {
                Ok(ModelTurn::Completed { content, context_for_next }) => {
                    let mut output = SpecialistOutput::completed(
                        content,
                        metadata(iterations, loop_iterations, started),
                    );
                    if let Some(next) = context_for_next {
                        output = output.with_context_for_next(next);
                    }
                    self.record_completion(specialist, &output).await;
                    return output;
                }
                Ok(ModelTurn::AskUser { question }) => {
                    return SpecialistOutput::ask_user(
                        question,
                        metadata(iterations, loop_iterations, started),
                    );
                }
                Ok(ModelTurn::ToolCalls(calls)) => {
                    loop_iterations += 1;
                    history.push(ModelMessage::assistant(format!(
                        "Requested {} tool call(s)",
                        calls.len()
                    )));
                    let outcomes = self.execute_tool_calls(&calls, specialist).await;
                    for (call, outcome) in calls.iter().zip(&outcomes) {
                        let content = if outcome.success {
                            outcome
                                .output
                                .as_ref()
                                .map(|v| v.to_string())
                                .unwrap_or_default()
                        } else {
                            outcome.error.clone().unwrap_or_default()
                        };
                        history.push(ModelMessage::tool_result(
                            call.id.clone(),
                            content,
                            !outcome.success,
                        ));
                    }
                }
                Err(e) if e.is_retryable() => {
                    warn!(error = %e, kind = e.error_kind(), "retryable model error");
                }
                Err(e) => {
                    return SpecialistOutput::failed(
                        format!("model error: {e}"),
                        metadata(iterations, loop_iterations, started),
                    );
                }
            }
        }

        let error = EngineError::IterationLimitExceeded {
            specialist: specialist.to_string(),
            limit: decision.max_iterations,
        };
        SpecialistOutput::failed(
            error.to_string(),
            metadata(decision.max_iterations, loop_iterations, started),
        )
    }

    /// Execute a batch of tool calls. Every call is individually wrapped: a
    /// failure becomes a structured outcome with an enhanced message and the
    /// remaining siblings still run.
    pub async fn execute_tool_calls(
        &self,
        calls: &[ToolCall],
        specialist: &str,
    ) -> Vec<ToolCallOutcome> {
        let mut outcomes = Vec::with_capacity(calls.len());
        for call in calls {
            let started = Instant::now();
            let outcome = match self.tools.execute_tool(&call.name, call.arguments.clone()).await {
                Ok(value) => ToolCallOutcome::ok(&call.name, value),
                Err(e) => {
                    let raw = e.to_string();
                    warn!(tool = %call.name, error = %raw, "tool call failed");
                    ToolCallOutcome::failed(
                        &call.name,
                        enhance(&call.name, &raw, &self.tools.available_tools()),
                    )
                }
            };

            let mut entry = ToolExecutionEntry::now(
                &call.name,
                outcome.success,
                started.elapsed().as_millis() as u64,
            )
            .with_specialist(specialist);
            if let Some(error) = &outcome.error {
                entry = entry.with_error(error.clone());
            }
            if let Err(e) = self.log.record_tool_execution(entry).await {
                warn!(error = %e, "failed to record tool execution");
            }

            outcomes.push(outcome);
        }
        outcomes
    }

    async fn record_completion(&self, specialist: &str, output: &SpecialistOutput) {
        let label = match self.registry.get(specialist).map(|c| c.name.as_str()) {
            Some(name) if name != specialist => format!("{specialist} ({name})"),
            _ => specialist.to_string(),
        };
        let entry = LifecycleEntry::now(
            LifecycleEventType::SpecialistCompleted,
            format!(
                "{label} completed in {}ms after {} iteration(s)",
                output.metadata.execution_time_ms, output.metadata.iterations
            ),
        );
        if let Err(e) = self.log.record_lifecycle_event(entry).await {
            warn!(error = %e, "failed to record specialist completion");
        }
    }
}

fn metadata(iterations: u32, loop_iterations: u32, started: Instant) -> OutputMetadata {
    OutputMetadata {
        iterations,
        loop_iterations,
        execution_time_ms: started.elapsed().as_millis() as u64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use quill_core::ids::ToolCallId;
    use quill_core::log::{LogError, NullSessionLog};
    use quill_core::tools::ToolError;
    use quill_llm::{MockModel, MockTurn};
    use serde_json::json;

    use crate::assembler::BasicAssembler;
    use crate::registry::{IterationConfig, SpecialistCategory, SpecialistConfig};

    struct StubTools;

    #[async_trait]
    impl ToolRegistry for StubTools {
        async fn execute_tool(
            &self,
            name: &str,
            _args: serde_json::Value,
        ) -> Result<serde_json::Value, ToolError> {
            match name {
                "readMarkdownFile" => Ok(json!({"content": "# SRS"})),
                "ghostTool" => Err(ToolError::NotFound(name.to_string())),
                "writeChapter" => Err(ToolError::MissingParameter("content".to_string())),
                "openRestricted" => Err(ToolError::ExecutionFailed("Permission denied".to_string())),
                other => Err(ToolError::ExecutionFailed(format!("{other} blew up"))),
            }
        }

        fn available_tools(&self) -> Vec<String> {
            vec!["readMarkdownFile".to_string(), "writeChapter".to_string()]
        }
    }

    fn executor() -> SpecialistExecutor {
        executor_with_registry(SpecialistRegistry::new())
    }

    fn executor_with_registry(registry: SpecialistRegistry) -> SpecialistExecutor {
        SpecialistExecutor::new(
            Arc::new(registry),
            IterationPolicy::default(),
            Arc::new(BasicAssembler),
            Arc::new(StubTools),
            Arc::new(NullSessionLog),
        )
    }

    fn call(name: &str) -> ToolCall {
        ToolCall {
            id: ToolCallId::new(),
            name: name.to_string(),
            arguments: json!({}),
        }
    }

    #[tokio::test]
    async fn completes_on_first_turn() {
        let model = MockModel::new(vec![MockTurn::completed("chapter drafted")]);
        let output = executor()
            .execute(&model, "fr_writer", &AssemblyContext::new("write it"))
            .await;
        assert!(output.success);
        assert_eq!(output.content.as_deref(), Some("chapter drafted"));
        assert_eq!(output.metadata.iterations, 1);
        assert_eq!(output.metadata.loop_iterations, 0);
    }

    #[tokio::test]
    async fn tool_loop_feeds_results_back_to_model() {
        let model = MockModel::new(vec![
            MockTurn::tool_call("readMarkdownFile", json!({"path": "SRS.md"})),
            MockTurn::completed("done after reading"),
        ]);
        let output = executor()
            .execute(&model, "fr_writer", &AssemblyContext::new("write it"))
            .await;
        assert!(output.success);
        assert_eq!(output.metadata.iterations, 2);
        assert_eq!(output.metadata.loop_iterations, 1);
        assert_eq!(model.call_count(), 2);
    }

    #[tokio::test]
    async fn ask_user_suspends_with_question() {
        let model = MockModel::new(vec![MockTurn::ask_user("Which template?")]);
        let output = executor()
            .execute(&model, "fr_writer", &AssemblyContext::new("write it"))
            .await;
        assert!(output.needs_chat_interaction);
        assert_eq!(output.question.as_deref(), Some("Which template?"));
    }

    #[tokio::test]
    async fn iteration_limit_is_a_terminal_failure() {
        let mut registry = SpecialistRegistry::new();
        registry.register(SpecialistConfig {
            id: "looper".to_string(),
            name: "Looper".to_string(),
            category: SpecialistCategory::Content,
            enabled: true,
            version: None,
            capabilities: Vec::new(),
            tags: Vec::new(),
            iteration_config: Some(IterationConfig { max_iterations: Some(2) }),
        });
        let model = MockModel::new(vec![
            MockTurn::tool_call("readMarkdownFile", json!({})),
            MockTurn::tool_call("readMarkdownFile", json!({})),
            MockTurn::completed("never reached"),
        ]);
        let output = executor_with_registry(registry)
            .execute(&model, "looper", &AssemblyContext::new("loop"))
            .await;
        assert!(!output.success);
        assert!(output.error.as_deref().unwrap().contains("iteration limit"));
        assert_eq!(model.call_count(), 2, "cap bounds the model round-trips");
    }

    #[tokio::test]
    async fn fatal_model_error_fails_the_invocation() {
        use quill_core::provider::ModelError;
        let model = MockModel::new(vec![MockTurn::Error(ModelError::AuthenticationFailed(
            "bad key".to_string(),
        ))]);
        let output = executor()
            .execute(&model, "fr_writer", &AssemblyContext::new("x"))
            .await;
        assert!(!output.success);
        assert!(output.error.as_deref().unwrap().contains("model error"));
    }

    #[derive(Default)]
    struct RecordingLog {
        events: std::sync::Mutex<Vec<LifecycleEntry>>,
    }

    #[async_trait]
    impl SessionLog for RecordingLog {
        async fn record_tool_execution(&self, _entry: ToolExecutionEntry) -> Result<(), LogError> {
            Ok(())
        }

        async fn record_lifecycle_event(&self, entry: LifecycleEntry) -> Result<(), LogError> {
            self.events.lock().unwrap().push(entry);
            Ok(())
        }
    }

    #[tokio::test]
    async fn completion_event_names_specialist_id_and_display_name() {
        let mut registry = SpecialistRegistry::new();
        registry.register(SpecialistConfig {
            id: "fr_writer".to_string(),
            name: "FR Writer".to_string(),
            category: SpecialistCategory::Content,
            enabled: true,
            version: None,
            capabilities: Vec::new(),
            tags: Vec::new(),
            iteration_config: None,
        });
        let log = Arc::new(RecordingLog::default());
        let executor = SpecialistExecutor::new(
            Arc::new(registry),
            IterationPolicy::default(),
            Arc::new(BasicAssembler),
            Arc::new(StubTools),
            log.clone(),
        );

        let model = MockModel::new(vec![MockTurn::completed("done")]);
        let output = executor
            .execute(&model, "fr_writer", &AssemblyContext::new("x"))
            .await;
        assert!(output.success);

        let events = log.events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, LifecycleEventType::SpecialistCompleted);
        assert!(events[0].detail.contains("fr_writer"));
        assert!(events[0].detail.contains("(FR Writer)"));
    }

    #[tokio::test]
    async fn missing_tool_is_flagged_critical() {
        let outcomes = executor()
            .execute_tool_calls(&[call("ghostTool")], "fr_writer")
            .await;
        assert_eq!(outcomes.len(), 1);
        assert!(!outcomes[0].success);
        let error = outcomes[0].error.as_deref().unwrap();
        assert!(error.contains("CRITICAL ERROR"));
        assert!(error.contains("Stop retrying this tool immediately"));
    }

    #[tokio::test]
    async fn missing_parameter_allows_retry() {
        let outcomes = executor()
            .execute_tool_calls(&[call("writeChapter")], "fr_writer")
            .await;
        let error = outcomes[0].error.as_deref().unwrap();
        assert!(error.contains("PARAMETER ERROR"));
        assert!(!error.contains("Do NOT retry"));
    }

    #[tokio::test]
    async fn one_failure_never_aborts_siblings() {
        let outcomes = executor()
            .execute_tool_calls(
                &[call("ghostTool"), call("readMarkdownFile"), call("openRestricted")],
                "fr_writer",
            )
            .await;
        assert_eq!(outcomes.len(), 3);
        assert!(!outcomes[0].success);
        assert!(outcomes[1].success);
        assert!(!outcomes[2].success);
        assert!(outcomes[2].error.as_deref().unwrap().contains("PERMISSION ERROR"));
    }
}
