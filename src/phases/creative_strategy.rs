use super::{brief_context, encode, invoke, require, PhaseContext};
use crate::domain::{StepKind, WorkflowError};
use crate::generation::schema::parse_creative_strategy;
use crate::generation::{GenerationRequest, ModelRole, OutputSchema};
use crate::state::{StateDelta, WorkflowState};

const CREATIVE_STRATEGY_SYSTEM_PROMPT: &str = r#"You are a performance creative strategist.
Using the brief and audience insight, define the core message pillars, brainstorm
scroll-stopping hooks, write calls to action, pick emotional triggers, and describe
the primary visual concept and the audio strategy.
"#;

pub async fn run_creative_strategy(
    state: &WorkflowState,
    ctx: &PhaseContext<'_>,
) -> Result<StateDelta, WorkflowError> {
    let step = StepKind::CreativeStrategy;
    let insight = require(state.audience_insight(), step, "audience_insight")?;

    let mut task_context = brief_context(state);
    task_context["audience_insight"] = encode(insight, step, "audience_insight")?;

    let request = GenerationRequest {
        role: ModelRole::CreativeStrategy,
        schema: OutputSchema::CreativeStrategy,
        system_prompt: CREATIVE_STRATEGY_SYSTEM_PROMPT.to_string(),
        task_context,
    };

    let generation = invoke(ctx, step, request).await?;
    let strategy = parse_creative_strategy(&generation.output)?;
    Ok(StateDelta::StrategyGenerated {
        strategy,
        token_cost: generation.token_cost,
    })
}
