//! Step executors.
//!
//! Each step reads the current state, checks its preconditions, builds a task
//! context from only the fields it needs, calls the generation service once
//! and returns a [`StateDelta`]. Steps never modify the state they are given
//! and never retry; every error goes straight back to the caller.

pub mod audience_insight;
pub mod creative_strategy;
pub mod evaluation;
pub mod refinement;
pub mod script_generation;
pub mod variation;

use crate::config::EvaluationSettings;
use crate::domain::{DraftSlot, HistoryLedger, StepKind, WorkflowError};
use crate::generation::{Generation, GenerationRequest, GenerationService};
use crate::state::{StateDelta, WorkflowState};
use crate::structured_logger::StructuredLogger;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{error, info};

/// Collaborators passed into every step.
pub struct PhaseContext<'a> {
    pub generator: &'a dyn GenerationService,
    pub logger: Arc<StructuredLogger>,
    pub evaluation: EvaluationSettings,
}

/// Runs one node of either graph against `state`.
pub async fn execute_step(
    step: StepKind,
    state: &WorkflowState,
    ctx: &PhaseContext<'_>,
) -> Result<StateDelta, WorkflowError> {
    match step {
        StepKind::AudienceInsight => audience_insight::run_audience_insight(state, ctx).await,
        StepKind::CreativeStrategy => creative_strategy::run_creative_strategy(state, ctx).await,
        StepKind::ScriptGeneration => script_generation::run_script_generation(state, ctx).await,
        StepKind::ScriptEvaluation => {
            evaluation::run_evaluation(DraftSlot::Primary, state, ctx).await
        }
        StepKind::ScriptRefinement => {
            refinement::run_refinement(DraftSlot::Primary, state, ctx).await
        }
        StepKind::VariationGeneration => variation::run_variation_generation(state, ctx).await,
        StepKind::VariationEvaluation => {
            evaluation::run_evaluation(DraftSlot::Variation, state, ctx).await
        }
        StepKind::VariationRefinement => {
            refinement::run_refinement(DraftSlot::Variation, state, ctx).await
        }
        StepKind::FinalizeVariation => variation::finalize_variation(state),
    }
}

/// Calls the generation service and logs the round trip.
async fn invoke(
    ctx: &PhaseContext<'_>,
    step: StepKind,
    request: GenerationRequest,
) -> Result<Generation, WorkflowError> {
    info!(step = %step, schema = %request.schema, role = %request.role, "Invoking generation service");
    ctx.logger.log_step_invocation(step, request.schema);

    match ctx.generator.invoke(request).await {
        Ok(generation) => {
            info!(step = %step, tokens = generation.token_cost, "Generation complete");
            ctx.logger
                .log_step_complete(step, true, generation.token_cost);
            Ok(generation)
        }
        Err(source) => {
            error!(step = %step, error = %source, "Generation failed");
            ctx.logger.log_step_complete(step, false, 0);
            Err(WorkflowError::Generation { step, source })
        }
    }
}

/// Serializes one state field for a task context.
fn encode<T: Serialize + ?Sized>(
    value: &T,
    step: StepKind,
    field: &'static str,
) -> Result<Value, WorkflowError> {
    serde_json::to_value(value).map_err(|e| WorkflowError::ContextEncoding {
        step,
        field,
        reason: e.to_string(),
    })
}

fn require<'a, T>(
    value: Option<&'a T>,
    step: StepKind,
    missing: &'static str,
) -> Result<&'a T, WorkflowError> {
    value.ok_or(WorkflowError::Precondition { step, missing })
}

/// The brief fields most steps share.
fn brief_context(state: &WorkflowState) -> Value {
    let brief = state.brief();
    json!({
        "campaign_goal": brief.campaign_goal,
        "ad_platform": brief.ad_platform,
        "product": brief.product,
        "product_feature_focus": brief.product_feature_focus,
        "audience_persona": brief.audience_persona,
        "creative_direction": brief.creative_direction,
        "script_tone": brief.script_tone,
    })
}

/// Summaries of earlier refinements, shown to the evaluator and refiner.
fn history_context(history: &HistoryLedger) -> Value {
    Value::Array(
        history
            .entries()
            .iter()
            .map(|entry| {
                json!({
                    "iteration": entry.iteration,
                    "previous_overall_score": entry.previous_overall_score,
                    "recommendations_given": entry.recommendations_given,
                    "key_takeaway": entry.output_snapshot.key_takeaway,
                    "call_to_action_text": entry.output_snapshot.call_to_action_text,
                })
            })
            .collect(),
    )
}

#[cfg(test)]
#[path = "tests/phase_tests.rs"]
mod tests;
