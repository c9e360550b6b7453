//! A/B variation request and the finalized variant bundle.

use crate::domain::evaluation::EvaluationReport;
use crate::domain::script::ScriptDraft;
use serde::{Deserialize, Serialize};

pub const VARIATION_FOCUS: &str = "Hook + CTA + Emotional Tone Enhancement";
pub const VARIATION_NAME: &str = "Enhanced A/B Test Variant";
pub const BASE_SCRIPT_COMPARISON: &str = "Modified opening hook, enhanced call-to-action, and shifted emotional tone for A/B testing against the original script";

/// What the variation step was asked to change relative to the base script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VariationRequest {
    pub variation_focus: String,
    pub target_changes: Vec<String>,
}

impl VariationRequest {
    /// The single variation the workflow produces: new hook, stronger CTA,
    /// shifted emotional tone.
    pub fn hook_cta_tone() -> Self {
        Self {
            variation_focus: VARIATION_FOCUS.to_string(),
            target_changes: vec![
                "Modified opening hook using different audience pain point/aspiration".to_string(),
                "Enhanced call-to-action with stronger urgency and emotional resonance".to_string(),
                "Shifted emotional tone to align with different audience values/preferences"
                    .to_string(),
            ],
        }
    }
}

/// The variant handed to consumers once the variation loop terminates.
///
/// Fields are private; the only way to obtain one is [`FinalizedVariation::package`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinalizedVariation {
    variation_name: String,
    variation_type: String,
    base_script_comparison: String,
    ad_script_variation: ScriptDraft,
    variation_evaluation_report: Option<EvaluationReport>,
    variation_iteration_count: u32,
    notes: String,
}

impl FinalizedVariation {
    pub fn package(
        draft: ScriptDraft,
        evaluation: Option<EvaluationReport>,
        iteration_count: u32,
    ) -> Self {
        let notes = match &evaluation {
            Some(report) => format!(
                "Refined through {} iterations with final quality score of {:.1}/5.0",
                iteration_count, report.overall_score
            ),
            None => "Generated single variation for A/B testing".to_string(),
        };
        Self {
            variation_name: VARIATION_NAME.to_string(),
            variation_type: VARIATION_FOCUS.to_string(),
            base_script_comparison: BASE_SCRIPT_COMPARISON.to_string(),
            ad_script_variation: draft,
            variation_evaluation_report: evaluation,
            variation_iteration_count: iteration_count,
            notes,
        }
    }

    pub fn variation_name(&self) -> &str {
        &self.variation_name
    }

    pub fn variation_type(&self) -> &str {
        &self.variation_type
    }

    pub fn base_script_comparison(&self) -> &str {
        &self.base_script_comparison
    }

    pub fn draft(&self) -> &ScriptDraft {
        &self.ad_script_variation
    }

    pub fn evaluation(&self) -> Option<&EvaluationReport> {
        self.variation_evaluation_report.as_ref()
    }

    pub fn iteration_count(&self) -> u32 {
        self.variation_iteration_count
    }

    pub fn notes(&self) -> &str {
        &self.notes
    }
}
