use std::sync::Arc;

use quill_core::log::{LifecycleEntry, LifecycleEventType, SessionLog, ToolExecutionEntry};
use quill_core::plan::{Plan, PlanIntent, PlanOutcome, PlanResult, StepResults};
use quill_core::provider::ModelProvider;
use quill_store::Session;
use tracing::{info, instrument, warn};

use crate::assembler::AssemblyContext;
use crate::executor::SpecialistExecutor;

/// Invoked at the start of every step with (step number, specialist id).
pub type ProgressCallback = Box<dyn Fn(u32, &str) + Send + Sync>;

/// Drives a plan's steps strictly in ascending order through the specialist
/// executor. A step failure or a user-interaction request short-circuits the
/// run; later steps are never invoked.
pub struct PlanExecutor {
    executor: SpecialistExecutor,
    log: Arc<dyn SessionLog>,
}

impl PlanExecutor {
    pub fn new(executor: SpecialistExecutor, log: Arc<dyn SessionLog>) -> Self {
        Self { executor, log }
    }

    pub async fn execute(
        &self,
        plan: &Plan,
        session: Option<&Session>,
        model: &dyn ModelProvider,
        user_input: &str,
        progress: Option<&ProgressCallback>,
    ) -> PlanOutcome {
        self.run(plan, 1, StepResults::new(), session, model, user_input, progress, None)
            .await
    }

    /// Replay a plan from `from_step`, carrying forward a snapshot of the
    /// already-completed results. Earlier steps are never re-invoked and the
    /// plan itself is never mutated.
    pub async fn resume_from_step(
        &self,
        plan: &Plan,
        from_step: u32,
        completed: &StepResults,
        session: Option<&Session>,
        model: &dyn ModelProvider,
        user_input: &str,
        progress: Option<&ProgressCallback>,
    ) -> PlanOutcome {
        self.run(
            plan,
            from_step,
            completed.snapshot(),
            session,
            model,
            user_input,
            progress,
            Some(from_step),
        )
        .await
    }

    #[allow(clippy::too_many_arguments)]
    #[instrument(skip_all, fields(plan_id = %plan.id, from_step))]
    async fn run(
        &self,
        plan: &Plan,
        from_step: u32,
        mut results: StepResults,
        session: Option<&Session>,
        model: &dyn ModelProvider,
        user_input: &str,
        progress: Option<&ProgressCallback>,
        resumed_from_step: Option<u32>,
    ) -> PlanOutcome {
        for step in plan.ordered_steps() {
            if step.step < from_step || results.contains(step.step) {
                continue;
            }
            if let Some(callback) = progress {
                callback(step.step, &step.specialist);
            }
            info!(step = step.step, specialist = %step.specialist, "executing plan step");

            let mut ctx = AssemblyContext::new(user_input);
            if let Some(session) = session {
                ctx = ctx.with_session(session);
            }
            ctx.structured_context.current_step = Some((*step).clone());
            ctx.structured_context.dependent_results = results.snapshot();

            let output = self.executor.execute(model, &step.specialist, &ctx).await;

            if output.needs_chat_interaction {
                let question = output.question.clone();
                let completed_steps = successful_steps(&results);
                results.record(step.step, output);
                info!(step = step.step, "plan suspended awaiting user input");
                return PlanOutcome {
                    intent: PlanIntent::UserInteractionRequired,
                    result: PlanResult {
                        completed_steps,
                        question,
                        pending_step: Some(step.step),
                        resumed_from_step,
                        ..Default::default()
                    },
                    step_results: results,
                };
            }

            if !output.success {
                let error = output.error.clone().unwrap_or_default();
                warn!(step = step.step, specialist = %step.specialist, error = %error, "plan step failed");
                self.record_failure(
                    plan,
                    step.step,
                    &step.specialist,
                    &error,
                    output.metadata.execution_time_ms,
                )
                .await;
                let completed_steps = successful_steps(&results);
                results.record(step.step, output);
                return PlanOutcome {
                    intent: PlanIntent::PlanFailed,
                    result: PlanResult {
                        completed_steps,
                        failed_step: Some(step.step),
                        failed_specialist: Some(step.specialist.clone()),
                        error: Some(error),
                        resumed_from_step,
                        ..Default::default()
                    },
                    step_results: results,
                };
            }

            results.record(step.step, output);
        }

        let entry = LifecycleEntry::now(
            LifecycleEventType::PlanCompleted,
            format!("plan completed: {}", plan.description),
        )
        .with_plan(plan.id.clone());
        if let Err(e) = self.log.record_lifecycle_event(entry).await {
            warn!(error = %e, "failed to record plan completion");
        }

        PlanOutcome {
            intent: PlanIntent::PlanCompleted,
            result: PlanResult {
                completed_steps: successful_steps(&results),
                resumed_from_step,
                ..Default::default()
            },
            step_results: results,
        }
    }

    async fn record_failure(
        &self,
        plan: &Plan,
        step: u32,
        specialist: &str,
        error: &str,
        duration_ms: u64,
    ) {
        let step_entry = ToolExecutionEntry::now(specialist, false, duration_ms)
            .with_specialist(specialist)
            .with_error(format!("step {step} failed: {error}"));
        if let Err(e) = self.log.record_tool_execution(step_entry).await {
            warn!(error = %e, "failed to record step failure");
        }
        let plan_entry = LifecycleEntry::now(
            LifecycleEventType::PlanFailed,
            format!("plan failed at step {step}: {}", plan.description),
        )
        .with_plan(plan.id.clone());
        if let Err(e) = self.log.record_lifecycle_event(plan_entry).await {
            warn!(error = %e, "failed to record plan failure");
        }
    }
}

fn successful_steps(results: &StepResults) -> Vec<u32> {
    results
        .iter()
        .filter(|(_, output)| output.success)
        .map(|(step, _)| step)
        .collect()
}
