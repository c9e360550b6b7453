use super::{brief_context, encode, history_context, invoke, require, PhaseContext};
use crate::domain::{DraftSlot, HistoryAction, IterationLogEntry, StepKind, WorkflowError};
use crate::generation::schema::parse_script_draft;
use crate::generation::{GenerationRequest, ModelRole, OutputSchema};
use crate::state::{draft_field, evaluation_field, StateDelta, WorkflowState};
use serde_json::Value;
use tracing::info;

const REFINEMENT_SYSTEM_PROMPT: &str = r#"You are revising an ad script after a creative review.
Address every recommendation in the feedback while keeping what scored well. Keep the
same format as the current script: a video script stays a video script with scenes,
a static ad stays a static ad. Return the complete revised script.
"#;

pub async fn run_refinement(
    slot: DraftSlot,
    state: &WorkflowState,
    ctx: &PhaseContext<'_>,
) -> Result<StateDelta, WorkflowError> {
    let step = StepKind::refinement(slot);
    let view = state.slot(slot);
    let draft = require(view.draft, step, draft_field(slot))?;
    let evaluation = require(view.evaluation, step, evaluation_field(slot))?;
    let kind = state.brief().ad_platform.kind()?;
    let schema = OutputSchema::for_platform(kind);

    let mut task_context = brief_context(state);
    task_context["current_script"] = encode(draft, step, "current_script")?;
    task_context["evaluation_report"] = encode(evaluation, step, "evaluation_report")?;
    task_context["revision_feedback"] = view
        .revision_feedback
        .map(|feedback| Value::String(feedback.to_string()))
        .unwrap_or(Value::Null);
    task_context["prior_iterations"] = history_context(view.history);
    if slot == DraftSlot::Variation {
        task_context["variation_request"] =
            encode(&state.variation_request(), step, "variation_request")?;
    }

    let request = GenerationRequest {
        role: ModelRole::EvaluationAndRefinement,
        schema,
        system_prompt: REFINEMENT_SYSTEM_PROMPT.to_string(),
        task_context,
    };

    let generation = invoke(ctx, step, request).await?;
    let refined = parse_script_draft(&generation.output, schema)?;

    let action = match slot {
        DraftSlot::Primary => HistoryAction::ScriptRefined,
        DraftSlot::Variation => HistoryAction::VariationRefined,
    };
    let iteration = view.iteration_count + 1;
    let entry = IterationLogEntry::new(iteration, action, evaluation, &refined);
    info!(step = %step, iteration, "Draft refined");

    Ok(StateDelta::Refined {
        slot,
        draft: refined,
        entry,
        token_cost: generation.token_cost,
    })
}
