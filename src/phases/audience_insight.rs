use super::{invoke, PhaseContext};
use crate::domain::{StepKind, WorkflowError};
use crate::generation::schema::parse_audience_insight;
use crate::generation::{GenerationRequest, ModelRole, OutputSchema};
use crate::state::{StateDelta, WorkflowState};
use serde_json::{json, Value};

const AUDIENCE_INSIGHT_SYSTEM_PROMPT: &str = r#"You are a consumer research strategist for mobile app advertising.
Expand the audience persona into concrete, specific insights: interests, media habits,
daily routines, values, decision factors, preferred content formats, pain points,
aspirations, brand perception and niche observations.
"#;

pub async fn run_audience_insight(
    state: &WorkflowState,
    ctx: &PhaseContext<'_>,
) -> Result<StateDelta, WorkflowError> {
    let step = StepKind::AudienceInsight;
    state.brief().ad_platform.kind()?;
    let request = GenerationRequest {
        role: ModelRole::AudienceInsight,
        schema: OutputSchema::AudienceInsight,
        system_prompt: AUDIENCE_INSIGHT_SYSTEM_PROMPT.to_string(),
        task_context: build_insight_context(state),
    };

    let generation = invoke(ctx, step, request).await?;
    let insight = parse_audience_insight(&generation.output)?;
    Ok(StateDelta::InsightGenerated {
        insight,
        token_cost: generation.token_cost,
    })
}

fn build_insight_context(state: &WorkflowState) -> Value {
    let brief = state.brief();
    json!({
        "campaign_goal": brief.campaign_goal,
        "product": brief.product,
        "product_feature_focus": brief.product_feature_focus,
        "audience_persona": brief.audience_persona,
    })
}
