//! Outputs of the first two primary steps.

use serde::{Deserialize, Serialize};

/// Enriched audience profile produced by the audience-insight step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AudienceInsight {
    pub common_interests: Vec<String>,
    pub media_consumption_habits: Vec<String>,
    pub typical_daily_routine_snippets: Vec<String>,
    pub core_values_and_beliefs: Vec<String>,
    pub decision_making_factors: Vec<String>,
    pub preferred_content_formats_and_tone: Vec<String>,
    pub elaborated_pain_points: Vec<String>,
    pub elaborated_aspiration_outcomes: Vec<String>,
    pub how_they_perceive_brands_like_yours: Vec<String>,
    pub unique_or_niche_insights: Vec<String>,
}

/// Creative direction produced by the creative-strategy step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreativeStrategy {
    pub core_message_pillars: Vec<String>,
    pub brainstormed_hooks: Vec<String>,
    pub generated_ctas: Vec<String>,
    pub emotional_triggers: Vec<String>,
    pub primary_visual_concept: String,
    pub audio_strategy: String,
}
