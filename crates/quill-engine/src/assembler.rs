use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quill_core::plan::{PlanStep, StepResults};
use quill_store::Session;

use crate::error::EngineError;

#[derive(Clone, Debug)]
pub struct ProjectMetadata {
    pub project_name: Option<String>,
    pub base_dir: Option<PathBuf>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Clone, Debug, Default)]
pub struct StructuredContext {
    pub current_step: Option<PlanStep>,
    /// Outputs of earlier plan steps, snapshot at assembly time.
    pub dependent_results: StepResults,
    pub internal_history: Vec<String>,
}

/// Everything the prompt assembler gets to work with for one invocation.
#[derive(Clone, Debug)]
pub struct AssemblyContext {
    pub user_requirements: String,
    pub language: String,
    pub project_metadata: ProjectMetadata,
    pub structured_context: StructuredContext,
    /// Keyed template texts. A template file that failed to load is present
    /// as an empty string, never an absent key.
    pub templates: BTreeMap<String, String>,
}

impl AssemblyContext {
    pub fn new(user_requirements: impl Into<String>) -> Self {
        Self {
            user_requirements: user_requirements.into(),
            language: "en".to_string(),
            project_metadata: ProjectMetadata {
                project_name: None,
                base_dir: None,
                timestamp: Utc::now(),
            },
            structured_context: StructuredContext::default(),
            templates: BTreeMap::new(),
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_session(mut self, session: &Session) -> Self {
        self.project_metadata.project_name = session.project_name.clone();
        self.project_metadata.base_dir = session.base_dir.clone();
        self
    }

    /// Load a template file under `key`. An unreadable file registers as an
    /// empty string so downstream substitution never sees a missing key.
    pub fn with_template_file(mut self, key: impl Into<String>, path: &Path) -> Self {
        let text = std::fs::read_to_string(path).unwrap_or_default();
        self.templates.insert(key.into(), text);
        self
    }
}

/// External prompt/context assembly boundary.
#[async_trait]
pub trait PromptAssembler: Send + Sync {
    async fn assemble(&self, specialist: &str, ctx: &AssemblyContext) -> Result<String, EngineError>;
}

/// Plain-text assembler: renders the context sections in a fixed order.
/// Hosts with richer prompt pipelines supply their own implementation.
pub struct BasicAssembler;

#[async_trait]
impl PromptAssembler for BasicAssembler {
    async fn assemble(&self, specialist: &str, ctx: &AssemblyContext) -> Result<String, EngineError> {
        let mut parts = Vec::new();
        parts.push(format!("You are the '{specialist}' specialist."));
        parts.push(format!("Language: {}", ctx.language));
        if let Some(name) = &ctx.project_metadata.project_name {
            parts.push(format!("Project: {name}"));
        }
        if let Some(step) = &ctx.structured_context.current_step {
            parts.push(format!("Current step {}: {}", step.step, step.description));
        }
        if !ctx.structured_context.dependent_results.is_empty() {
            let rendered = serde_json::to_string(&ctx.structured_context.dependent_results)
                .map_err(|e| EngineError::Assembly(e.to_string()))?;
            parts.push(format!("Results of earlier steps: {rendered}"));
        }
        for line in &ctx.structured_context.internal_history {
            parts.push(format!("Note: {line}"));
        }
        for (key, text) in &ctx.templates {
            if !text.is_empty() {
                parts.push(format!("Template {key}:\n{text}"));
            }
        }
        parts.push(format!("User requirements:\n{}", ctx.user_requirements));
        Ok(parts.join("\n\n"))
    }
}
