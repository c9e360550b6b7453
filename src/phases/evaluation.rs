use super::{brief_context, encode, history_context, invoke, require, PhaseContext};
use crate::domain::{DraftSlot, StepKind, WorkflowError};
use crate::generation::schema::parse_evaluation_report;
use crate::generation::{GenerationRequest, ModelRole, OutputSchema};
use crate::state::{draft_field, StateDelta, WorkflowState};
use tracing::{info, warn};

const EVALUATION_SYSTEM_PROMPT: &str = r#"You are a senior creative director reviewing ad scripts.
Score the script from 1 to 5 on every criterion: hook, clarity, conciseness,
emotional_appeal, call_to_action_strength, brand_voice_adherence, platform_compliance,
relevance_to_audience, feature_highlight_effectiveness, uniqueness_originality and
overall_impact. Give specific feedback per criterion, a summary, and actionable
recommendations. Approve only if the overall score is at least 4.5 and no criterion
scores below 4. Prior iterations are listed so you can check whether earlier
recommendations were addressed.
"#;

pub async fn run_evaluation(
    slot: DraftSlot,
    state: &WorkflowState,
    ctx: &PhaseContext<'_>,
) -> Result<StateDelta, WorkflowError> {
    let step = StepKind::evaluation(slot);
    let view = state.slot(slot);
    let draft = require(view.draft, step, draft_field(slot))?;

    let mut task_context = brief_context(state);
    task_context["script_to_evaluate"] = encode(draft, step, "script_to_evaluate")?;
    task_context["creative_strategy"] =
        encode(&state.creative_strategy(), step, "creative_strategy")?;
    task_context["prior_iterations"] = history_context(view.history);
    if slot == DraftSlot::Variation {
        task_context["variation_request"] =
            encode(&state.variation_request(), step, "variation_request")?;
    }

    let request = GenerationRequest {
        role: ModelRole::EvaluationAndRefinement,
        schema: OutputSchema::EvaluationReport,
        system_prompt: EVALUATION_SYSTEM_PROMPT.to_string(),
        task_context,
    };

    let generation = invoke(ctx, step, request).await?;
    let mut report = parse_evaluation_report(&generation.output)?;

    if report.normalize_approval() {
        warn!(
            step = %step,
            overall_score = report.overall_score,
            approved = report.is_approved_for_next_stage,
            "Reported approval flag disagreed with scores; using computed value"
        );
    }
    if ctx.evaluation.require_recommendations_on_rejection
        && !report.is_approved_for_next_stage
        && report.actionable_recommendations.is_empty()
    {
        return Err(WorkflowError::MalformedOutput {
            schema: OutputSchema::EvaluationReport,
            reason: "rejected evaluation carries no recommendations".to_string(),
        });
    }

    info!(
        step = %step,
        overall_score = report.overall_score,
        approved = report.is_approved_for_next_stage,
        "Evaluation recorded"
    );
    Ok(StateDelta::Evaluated {
        slot,
        report,
        token_cost: generation.token_cost,
    })
}
