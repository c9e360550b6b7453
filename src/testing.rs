//! Fixtures and a scripted generation service shared by the test suites.

use crate::domain::campaign::PlatformKind;
use crate::domain::{
    AudienceInsight, CampaignBrief, CreativeStrategy, EvaluationCriterion, EvaluationReport,
    ScriptDraft,
};
use crate::generation::{Generation, GenerationError, GenerationRequest, GenerationService};
use crate::state::{StateDelta, WorkflowState};
use crate::structured_logger::StructuredLogger;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

pub const VIDEO_PLATFORM: &str = "tiktok_feed";
pub const STATIC_PLATFORM: &str = "instagram_feeds";

pub fn brief(platform: &str) -> CampaignBrief {
    serde_json::from_value(json!({
        "campaign_goal": "app_installs",
        "ad_platform": platform,
        "product": {
            "product_name": "FocusFlow",
            "product_description": "A habit tracker for deep work.",
            "product_features": {"streaks": "Daily focus streaks"},
            "supported_platforms": ["ios", "android"],
            "unique_selling_point": ["Science-backed focus sessions"],
            "problems_solved": ["Constant distraction"]
        },
        "product_feature_focus": "streaks",
        "audience_persona": {
            "age_range": "25-34",
            "gender": "all",
            "location": ["usa"],
            "income_range": "$60k–$100k",
            "lifestyle": ["remote worker"],
            "pain_points": ["procrastination"],
            "aspiration": ["ship side projects"]
        },
        "creative_direction": "problem_solution",
        "script_tone": "energetic"
    }))
    .expect("fixture brief is valid")
}

pub fn insight_json() -> Value {
    let list = json!(["item"]);
    json!({
        "common_interests": list,
        "media_consumption_habits": list,
        "typical_daily_routine_snippets": list,
        "core_values_and_beliefs": list,
        "decision_making_factors": list,
        "preferred_content_formats_and_tone": list,
        "elaborated_pain_points": list,
        "elaborated_aspiration_outcomes": list,
        "how_they_perceive_brands_like_yours": list,
        "unique_or_niche_insights": list
    })
}

pub fn strategy_json() -> Value {
    json!({
        "core_message_pillars": ["Focus compounds"],
        "brainstormed_hooks": ["What if you finished what you started?"],
        "generated_ctas": ["Start your streak"],
        "emotional_triggers": ["pride"],
        "primary_visual_concept": "A streak counter ticking up",
        "audio_strategy": "Lo-fi beat building to a drop"
    })
}

pub fn video_draft_json(cta: &str) -> Value {
    json!({
        "ad_platform_target": VIDEO_PLATFORM,
        "duration_estimate_seconds": 15.0,
        "scenes": [{
            "scene_number": 1,
            "visual_description": "Cluttered desk",
            "audio_description": "Notification pings",
            "on_screen_text": "Distracted again?",
            "voiceover_dialogue": null,
            "duration_seconds": 15.0
        }],
        "call_to_action_text": cta,
        "suggested_hashtags": ["#focus"],
        "key_takeaway": "Focus is a habit"
    })
}

pub fn static_draft_json(cta: &str) -> Value {
    json!({
        "ad_platform_target": STATIC_PLATFORM,
        "headline": "Focus, finally",
        "body_copy": "Build a streak you are proud of.",
        "image_description": "A calm desk at sunrise",
        "on_image_text": "Day 30",
        "call_to_action_text": cta,
        "suggested_hashtags": ["#focus"],
        "key_takeaway": "Small sessions add up"
    })
}

pub fn draft_json(kind: PlatformKind, cta: &str) -> Value {
    match kind {
        PlatformKind::Video => video_draft_json(cta),
        PlatformKind::Static => static_draft_json(cta),
    }
}

/// An evaluation with every criterion at `criterion_score`.
///
/// The reported approval flag follows the real rule so that fixtures do not
/// exercise normalization unless a test asks for it.
pub fn evaluation_json(overall: f64, criterion_score: u8, recommendations: &[&str]) -> Value {
    let detailed: serde_json::Map<String, Value> = EvaluationCriterion::ALL
        .iter()
        .map(|criterion| {
            (
                criterion.as_str().to_string(),
                json!({"score": criterion_score, "feedback": "noted"}),
            )
        })
        .collect();
    let approved = overall >= 4.5 && criterion_score >= 4;
    json!({
        "overall_score": overall,
        "detailed_scores": detailed,
        "summary_feedback": "summary",
        "actionable_recommendations": recommendations,
        "is_approved_for_next_stage": approved
    })
}

pub fn approved_evaluation_json() -> Value {
    evaluation_json(4.7, 5, &[])
}

pub fn rejected_evaluation_json() -> Value {
    evaluation_json(3.2, 3, &["Sharpen the hook", "Add urgency to the CTA"])
}

pub fn insight() -> AudienceInsight {
    serde_json::from_value(insight_json()).expect("fixture insight is valid")
}

pub fn strategy() -> CreativeStrategy {
    serde_json::from_value(strategy_json()).expect("fixture strategy is valid")
}

pub fn draft(kind: PlatformKind, cta: &str) -> ScriptDraft {
    match kind {
        PlatformKind::Video => ScriptDraft::Video(
            serde_json::from_value(video_draft_json(cta)).expect("fixture draft is valid"),
        ),
        PlatformKind::Static => ScriptDraft::Static(
            serde_json::from_value(static_draft_json(cta)).expect("fixture draft is valid"),
        ),
    }
}

pub fn evaluation(overall: f64, criterion_score: u8, recommendations: &[&str]) -> EvaluationReport {
    serde_json::from_value(evaluation_json(overall, criterion_score, recommendations))
        .expect("fixture evaluation is valid")
}

/// A state with insight, strategy and a generated draft, costing 10, 20 and 30 tokens.
pub fn generated_state(platform: &str) -> WorkflowState {
    let kind = crate::domain::AdPlatform::from(platform.to_string())
        .kind()
        .expect("fixture platform is known");
    WorkflowState::new(brief(platform))
        .apply(StateDelta::InsightGenerated {
            insight: insight(),
            token_cost: 10,
        })
        .and_then(|s| {
            s.apply(StateDelta::StrategyGenerated {
                strategy: strategy(),
                token_cost: 20,
            })
        })
        .and_then(|s| {
            s.apply(StateDelta::ScriptGenerated {
                draft: draft(kind, "Start your streak"),
                token_cost: 30,
            })
        })
        .expect("fixture deltas apply")
}

pub fn temp_logger() -> (Arc<StructuredLogger>, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let logger = StructuredLogger::new("test-run", temp_dir.path()).expect("Failed to create logger");
    (Arc::new(logger), temp_dir)
}

/// Replays canned responses in order and records every request it receives.
#[derive(Default)]
pub struct ScriptedGenerator {
    responses: Mutex<VecDeque<Result<Generation, GenerationError>>>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_ok(&self, output: Value, token_cost: u64) -> &Self {
        self.responses
            .lock()
            .expect("responses lock")
            .push_back(Ok(Generation { output, token_cost }));
        self
    }

    pub fn push_err(&self, error: GenerationError) -> &Self {
        self.responses
            .lock()
            .expect("responses lock")
            .push_back(Err(error));
        self
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().expect("requests lock").clone()
    }

    pub fn remaining(&self) -> usize {
        self.responses.lock().expect("responses lock").len()
    }
}

#[async_trait]
impl GenerationService for ScriptedGenerator {
    async fn invoke(&self, request: GenerationRequest) -> Result<Generation, GenerationError> {
        self.requests
            .lock()
            .expect("requests lock")
            .push(request);
        self.responses
            .lock()
            .expect("responses lock")
            .pop_front()
            .unwrap_or_else(|| Err(GenerationError::Transport("script exhausted".to_string())))
    }
}
