//! Output schemas and the parse-and-validate functions for each of them.
//!
//! Every model answer goes through one of these functions before it can
//! become part of a state delta. Unknown fields, missing fields and the
//! wrong draft variant are all rejected here.

use crate::domain::campaign::PlatformKind;
use crate::domain::{
    AudienceInsight, CreativeStrategy, EvaluationReport, ScriptDraft, WorkflowError,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputSchema {
    AudienceInsight,
    CreativeStrategy,
    VideoScript,
    StaticScript,
    EvaluationReport,
}

impl OutputSchema {
    /// The draft schema for a platform bucket.
    pub fn for_platform(kind: PlatformKind) -> Self {
        match kind {
            PlatformKind::Video => OutputSchema::VideoScript,
            PlatformKind::Static => OutputSchema::StaticScript,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            OutputSchema::AudienceInsight => "AudienceInsight",
            OutputSchema::CreativeStrategy => "CreativeStrategy",
            OutputSchema::VideoScript => "VideoScriptDraft",
            OutputSchema::StaticScript => "StaticAdDraft",
            OutputSchema::EvaluationReport => "EvaluationReport",
        }
    }

    /// Top-level fields an answer must carry, in the order they are documented.
    pub fn required_fields(&self) -> &'static [&'static str] {
        match self {
            OutputSchema::AudienceInsight => &[
                "common_interests",
                "media_consumption_habits",
                "typical_daily_routine_snippets",
                "core_values_and_beliefs",
                "decision_making_factors",
                "preferred_content_formats_and_tone",
                "elaborated_pain_points",
                "elaborated_aspiration_outcomes",
                "how_they_perceive_brands_like_yours",
                "unique_or_niche_insights",
            ],
            OutputSchema::CreativeStrategy => &[
                "core_message_pillars",
                "brainstormed_hooks",
                "generated_ctas",
                "emotional_triggers",
                "primary_visual_concept",
                "audio_strategy",
            ],
            OutputSchema::VideoScript => &[
                "ad_platform_target",
                "duration_estimate_seconds",
                "scenes",
                "call_to_action_text",
                "suggested_hashtags",
                "key_takeaway",
            ],
            OutputSchema::StaticScript => &[
                "ad_platform_target",
                "headline",
                "body_copy",
                "image_description",
                "on_image_text",
                "call_to_action_text",
                "suggested_hashtags",
                "key_takeaway",
            ],
            OutputSchema::EvaluationReport => &[
                "overall_score",
                "detailed_scores",
                "summary_feedback",
                "actionable_recommendations",
                "is_approved_for_next_stage",
            ],
        }
    }
}

impl fmt::Display for OutputSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

fn malformed(schema: OutputSchema, reason: impl Into<String>) -> WorkflowError {
    WorkflowError::MalformedOutput {
        schema,
        reason: reason.into(),
    }
}

fn parse_as<T: DeserializeOwned>(value: Value, schema: OutputSchema) -> Result<T, WorkflowError> {
    serde_json::from_value(value).map_err(|e| malformed(schema, e.to_string()))
}

pub fn parse_audience_insight(value: &Value) -> Result<AudienceInsight, WorkflowError> {
    parse_as(value.clone(), OutputSchema::AudienceInsight)
}

pub fn parse_creative_strategy(value: &Value) -> Result<CreativeStrategy, WorkflowError> {
    let strategy: CreativeStrategy = parse_as(value.clone(), OutputSchema::CreativeStrategy)?;
    if strategy.brainstormed_hooks.is_empty() || strategy.generated_ctas.is_empty() {
        return Err(malformed(
            OutputSchema::CreativeStrategy,
            "at least one hook and one CTA are required",
        ));
    }
    Ok(strategy)
}

/// Parses a draft and checks it has the variant `schema` asks for.
///
/// A `script_type` tag that names the other variant, or an untagged object
/// carrying the other variant's distinctive fields, is a schema mismatch.
pub fn parse_script_draft(
    value: &Value,
    schema: OutputSchema,
) -> Result<ScriptDraft, WorkflowError> {
    let expected = match schema {
        OutputSchema::VideoScript => PlatformKind::Video,
        OutputSchema::StaticScript => PlatformKind::Static,
        other => return Err(malformed(other, "not a script draft schema")),
    };
    let mut object = value
        .as_object()
        .cloned()
        .ok_or_else(|| malformed(schema, "expected a JSON object"))?;

    let found = match object.remove("script_type") {
        Some(Value::String(tag)) if tag.eq_ignore_ascii_case(expected.label()) => None,
        Some(Value::String(tag)) => Some(tag),
        Some(other) => Some(other.to_string()),
        None => detect_kind(&object)
            .filter(|kind| *kind != expected)
            .map(|kind| kind.label().to_string()),
    };
    if let Some(found) = found {
        return Err(WorkflowError::SchemaMismatch {
            expected: expected.label().to_string(),
            found,
        });
    }

    let draft = match expected {
        PlatformKind::Video => ScriptDraft::Video(parse_as(Value::Object(object), schema)?),
        PlatformKind::Static => ScriptDraft::Static(parse_as(Value::Object(object), schema)?),
    };
    draft.validate().map_err(|reason| malformed(schema, reason))?;
    Ok(draft)
}

fn detect_kind(object: &Map<String, Value>) -> Option<PlatformKind> {
    if object.contains_key("scenes") {
        Some(PlatformKind::Video)
    } else if object.contains_key("headline") || object.contains_key("body_copy") {
        Some(PlatformKind::Static)
    } else {
        None
    }
}

/// Parses an evaluation report and checks scores and criteria coverage.
///
/// The approval flag is returned as the model reported it; callers decide
/// whether to normalize it.
pub fn parse_evaluation_report(value: &Value) -> Result<EvaluationReport, WorkflowError> {
    let report: EvaluationReport = parse_as(value.clone(), OutputSchema::EvaluationReport)?;
    report
        .validate()
        .map_err(|reason| malformed(OutputSchema::EvaluationReport, reason))?;
    Ok(report)
}

#[cfg(test)]
#[path = "tests/schema_tests.rs"]
mod tests;
