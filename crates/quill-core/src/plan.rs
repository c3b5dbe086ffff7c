use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ids::PlanId;

/// An ordered sequence of specialist-bound steps fulfilling one user request.
/// Immutable once execution begins; resumption replays from a copy.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Plan {
    pub id: PlanId,
    pub description: String,
    pub steps: Vec<PlanStep>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlanStep {
    /// 1-based sequence number. Steps execute in ascending order.
    pub step: u32,
    /// Specialist id resolved through the registry.
    pub specialist: String,
    pub description: String,
}

impl Plan {
    pub fn new(description: impl Into<String>, steps: Vec<PlanStep>) -> Self {
        Self {
            id: PlanId::new(),
            description: description.into(),
            steps,
        }
    }

    /// Steps sorted by ascending step number, without mutating the plan.
    pub fn ordered_steps(&self) -> Vec<&PlanStep> {
        let mut steps: Vec<&PlanStep> = self.steps.iter().collect();
        steps.sort_by_key(|s| s.step);
        steps
    }

    pub fn step(&self, number: u32) -> Option<&PlanStep> {
        self.steps.iter().find(|s| s.step == number)
    }
}

/// Result of one specialist invocation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SpecialistOutput {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Opaque payload consumed by later steps.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_for_next: Option<serde_json::Value>,
    #[serde(default)]
    pub needs_chat_interaction: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
    /// Present iff `success` is false.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub metadata: OutputMetadata,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct OutputMetadata {
    /// Model round-trips consumed by this invocation.
    pub iterations: u32,
    /// Tool-call loop iterations within those round-trips.
    pub loop_iterations: u32,
    pub execution_time_ms: u64,
}

impl SpecialistOutput {
    pub fn completed(content: impl Into<String>, metadata: OutputMetadata) -> Self {
        Self {
            success: true,
            content: Some(content.into()),
            context_for_next: None,
            needs_chat_interaction: false,
            question: None,
            error: None,
            metadata,
        }
    }

    pub fn failed(error: impl Into<String>, metadata: OutputMetadata) -> Self {
        Self {
            success: false,
            content: None,
            context_for_next: None,
            needs_chat_interaction: false,
            question: None,
            error: Some(error.into()),
            metadata,
        }
    }

    pub fn ask_user(question: impl Into<String>, metadata: OutputMetadata) -> Self {
        Self {
            success: true,
            content: None,
            context_for_next: None,
            needs_chat_interaction: true,
            question: Some(question.into()),
            error: None,
            metadata,
        }
    }

    pub fn with_context_for_next(mut self, ctx: serde_json::Value) -> Self {
        self.context_for_next = Some(ctx);
        self
    }
}

/// Append-only map from step number to that step's output.
/// Accumulates monotonically during a plan run; later steps read earlier
/// entries as dependent context.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StepResults(BTreeMap<u32, SpecialistOutput>);

impl StepResults {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a step's output. Returns false (and leaves the existing entry
    /// untouched) if the step was already recorded — entries are never
    /// overwritten.
    pub fn record(&mut self, step: u32, output: SpecialistOutput) -> bool {
        if self.0.contains_key(&step) {
            return false;
        }
        self.0.insert(step, output);
        true
    }

    pub fn get(&self, step: u32) -> Option<&SpecialistOutput> {
        self.0.get(&step)
    }

    pub fn contains(&self, step: u32) -> bool {
        self.0.contains_key(&step)
    }

    pub fn completed_steps(&self) -> Vec<u32> {
        self.0.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Deep copy for resumption. Resumed runs never alias the live map.
    pub fn snapshot(&self) -> Self {
        self.clone()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &SpecialistOutput)> {
        self.0.iter().map(|(k, v)| (*k, v))
    }
}

/// Terminal intent of a plan run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanIntent {
    PlanCompleted,
    PlanFailed,
    UserInteractionRequired,
}

/// Terminal result of a plan run (fields populated per intent).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PlanResult {
    pub completed_steps: Vec<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_step: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_specialist: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
    /// Step at which execution suspended awaiting user input.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_step: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resumed_from_step: Option<u32>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlanOutcome {
    pub intent: PlanIntent,
    pub result: PlanResult,
    /// Outputs for every step that ran (plus merged prior results on resume).
    pub step_results: StepResults,
}
