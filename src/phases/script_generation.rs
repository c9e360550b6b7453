use super::{brief_context, encode, invoke, require, PhaseContext};
use crate::domain::{StepKind, WorkflowError};
use crate::generation::schema::parse_script_draft;
use crate::generation::{GenerationRequest, ModelRole, OutputSchema};
use crate::state::{StateDelta, WorkflowState};
use serde_json::Value;
use tracing::debug;

const SCRIPT_GENERATION_SYSTEM_PROMPT: &str = r#"You are a direct-response copywriter for social ads.
Write one ad for the target platform that follows the creative strategy: open with one
of the hooks, keep the tone and creative direction, highlight the focus feature, and
close with a clear call to action. Video ads are written as numbered scenes; static
ads as headline, body copy, image description and on-image text.
"#;

pub async fn run_script_generation(
    state: &WorkflowState,
    ctx: &PhaseContext<'_>,
) -> Result<StateDelta, WorkflowError> {
    let step = StepKind::ScriptGeneration;
    let kind = state.brief().ad_platform.kind()?;
    let insight = require(state.audience_insight(), step, "audience_insight")?;
    let strategy = require(state.creative_strategy(), step, "creative_strategy")?;
    let schema = OutputSchema::for_platform(kind);
    debug!(platform = %state.brief().ad_platform, script_type = %kind, "Selected draft schema");

    let mut task_context = brief_context(state);
    task_context["script_type"] = Value::String(kind.label().to_string());
    task_context["audience_insight"] = encode(insight, step, "audience_insight")?;
    task_context["creative_strategy"] = encode(strategy, step, "creative_strategy")?;

    let request = GenerationRequest {
        role: ModelRole::ScriptGeneration,
        schema,
        system_prompt: SCRIPT_GENERATION_SYSTEM_PROMPT.to_string(),
        task_context,
    };

    let generation = invoke(ctx, step, request).await?;
    let draft = parse_script_draft(&generation.output, schema)?;
    Ok(StateDelta::ScriptGenerated {
        draft,
        token_cost: generation.token_cost,
    })
}
