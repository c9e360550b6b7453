//! Ad script drafts.
//!
//! A draft is either a video script made of ordered scenes or a static ad.
//! Which one is decided by the platform, and a refinement never switches it.

use crate::domain::campaign::PlatformKind;
use serde::{Deserialize, Serialize};

/// One scene of a video script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scene {
    pub scene_number: u32,
    pub visual_description: String,
    pub audio_description: String,
    #[serde(default)]
    pub on_screen_text: Option<String>,
    #[serde(default)]
    pub voiceover_dialogue: Option<String>,
    pub duration_seconds: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VideoScriptDraft {
    pub ad_platform_target: String,
    pub duration_estimate_seconds: f64,
    pub scenes: Vec<Scene>,
    pub call_to_action_text: String,
    pub suggested_hashtags: Vec<String>,
    pub key_takeaway: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StaticAdDraft {
    pub ad_platform_target: String,
    pub headline: String,
    pub body_copy: String,
    pub image_description: String,
    pub on_image_text: String,
    pub call_to_action_text: String,
    pub suggested_hashtags: Vec<String>,
    pub key_takeaway: String,
}

/// A draft of either shape, tagged with `script_type` when serialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "script_type")]
pub enum ScriptDraft {
    Video(VideoScriptDraft),
    Static(StaticAdDraft),
}

impl ScriptDraft {
    pub fn kind(&self) -> PlatformKind {
        match self {
            ScriptDraft::Video(_) => PlatformKind::Video,
            ScriptDraft::Static(_) => PlatformKind::Static,
        }
    }

    pub fn call_to_action_text(&self) -> &str {
        match self {
            ScriptDraft::Video(draft) => &draft.call_to_action_text,
            ScriptDraft::Static(draft) => &draft.call_to_action_text,
        }
    }

    pub fn key_takeaway(&self) -> &str {
        match self {
            ScriptDraft::Video(draft) => &draft.key_takeaway,
            ScriptDraft::Static(draft) => &draft.key_takeaway,
        }
    }

    /// Checks content rules that the field types alone cannot express.
    pub fn validate(&self) -> Result<(), String> {
        if self.call_to_action_text().trim().is_empty() {
            return Err("call_to_action_text must not be empty".to_string());
        }
        if self.key_takeaway().trim().is_empty() {
            return Err("key_takeaway must not be empty".to_string());
        }
        if let ScriptDraft::Video(draft) = self {
            if draft.scenes.is_empty() {
                return Err("video script must contain at least one scene".to_string());
            }
            if let Some(scene) = draft.scenes.iter().find(|s| s.duration_seconds < 0.0) {
                return Err(format!(
                    "scene {} has a negative duration",
                    scene.scene_number
                ));
            }
            if draft.duration_estimate_seconds < 0.0 {
                return Err("duration_estimate_seconds must not be negative".to_string());
            }
        }
        Ok(())
    }
}
