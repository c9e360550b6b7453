use super::{brief_context, encode, invoke, require, PhaseContext};
use crate::domain::{FinalizedVariation, StepKind, VariationRequest, WorkflowError};
use crate::generation::schema::parse_script_draft;
use crate::generation::{GenerationRequest, ModelRole, OutputSchema};
use crate::state::{StateDelta, WorkflowState};
use tracing::info;

const VARIATION_SYSTEM_PROMPT: &str = r#"You are writing an A/B test variant of an existing ad script.
Keep the product, feature focus and format of the base script, and apply every
requested change: a different opening hook built on another audience pain point or
aspiration, a more urgent call to action, and a shifted emotional tone.
"#;

pub async fn run_variation_generation(
    state: &WorkflowState,
    ctx: &PhaseContext<'_>,
) -> Result<StateDelta, WorkflowError> {
    let step = StepKind::VariationGeneration;
    let base = require(state.script_draft(), step, "script_draft")?;
    let base_evaluation = require(state.evaluation_report(), step, "evaluation_report")?;
    let kind = state.brief().ad_platform.kind()?;
    let schema = OutputSchema::for_platform(kind);
    let variation_request = VariationRequest::hook_cta_tone();

    let mut task_context = brief_context(state);
    task_context["base_script"] = encode(base, step, "base_script")?;
    task_context["base_evaluation"] = encode(base_evaluation, step, "base_evaluation")?;
    task_context["creative_strategy"] =
        encode(&state.creative_strategy(), step, "creative_strategy")?;
    task_context["variation_request"] = encode(&variation_request, step, "variation_request")?;

    let request = GenerationRequest {
        role: ModelRole::ScriptGeneration,
        schema,
        system_prompt: VARIATION_SYSTEM_PROMPT.to_string(),
        task_context,
    };

    let generation = invoke(ctx, step, request).await?;
    let draft = parse_script_draft(&generation.output, schema)?;
    Ok(StateDelta::VariationGenerated {
        request: variation_request,
        draft,
        token_cost: generation.token_cost,
    })
}

/// Packages the variation loop's last draft. Makes no generation call.
pub fn finalize_variation(state: &WorkflowState) -> Result<StateDelta, WorkflowError> {
    let step = StepKind::FinalizeVariation;
    let draft = require(state.variation_draft(), step, "variation_script_draft")?;
    let variation = FinalizedVariation::package(
        draft.clone(),
        state.variation_evaluation().cloned(),
        state.variation_iteration_count(),
    );
    info!(
        iterations = variation.iteration_count(),
        notes = variation.notes(),
        "Variation finalized"
    );
    Ok(StateDelta::VariationFinalized { variation })
}
