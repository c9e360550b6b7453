//! Black-box language model boundary.
//!
//! Steps never talk to a provider directly. They build a [`GenerationRequest`]
//! and hand it to whatever [`GenerationService`] the caller supplied. The
//! service returns raw JSON plus the token cost of the call; parsing that
//! JSON into domain types happens in [`schema`].

pub mod openai;
pub mod schema;

pub use crate::domain::errors::GenerationError;
pub use schema::OutputSchema;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Which model configuration a request should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelRole {
    AudienceInsight,
    CreativeStrategy,
    ScriptGeneration,
    EvaluationAndRefinement,
}

impl fmt::Display for ModelRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ModelRole::AudienceInsight => "audience_insight",
            ModelRole::CreativeStrategy => "creative_strategy",
            ModelRole::ScriptGeneration => "script_generation",
            ModelRole::EvaluationAndRefinement => "evaluation_and_refinement",
        };
        write!(f, "{}", name)
    }
}

/// One structured generation call.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub role: ModelRole,
    pub schema: OutputSchema,
    pub system_prompt: String,
    /// Only the fields the step needs, bundled as JSON.
    pub task_context: Value,
}

/// Raw structured output and what it cost.
#[derive(Debug, Clone, PartialEq)]
pub struct Generation {
    pub output: Value,
    pub token_cost: u64,
}

#[async_trait]
pub trait GenerationService: Send + Sync {
    async fn invoke(&self, request: GenerationRequest) -> Result<Generation, GenerationError>;
}
