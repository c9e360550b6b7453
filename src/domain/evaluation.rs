//! Evaluation reports and the approval rule.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Overall score a draft must reach to be approved.
pub const APPROVAL_OVERALL_THRESHOLD: f64 = 4.5;

/// Score every individual criterion must reach to be approved.
pub const APPROVAL_CRITERION_THRESHOLD: u8 = 4;

/// The fixed set of criteria every evaluation scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationCriterion {
    Hook,
    Clarity,
    Conciseness,
    EmotionalAppeal,
    CallToActionStrength,
    BrandVoiceAdherence,
    PlatformCompliance,
    RelevanceToAudience,
    FeatureHighlightEffectiveness,
    UniquenessOriginality,
    OverallImpact,
}

impl EvaluationCriterion {
    pub const ALL: [EvaluationCriterion; 11] = [
        EvaluationCriterion::Hook,
        EvaluationCriterion::Clarity,
        EvaluationCriterion::Conciseness,
        EvaluationCriterion::EmotionalAppeal,
        EvaluationCriterion::CallToActionStrength,
        EvaluationCriterion::BrandVoiceAdherence,
        EvaluationCriterion::PlatformCompliance,
        EvaluationCriterion::RelevanceToAudience,
        EvaluationCriterion::FeatureHighlightEffectiveness,
        EvaluationCriterion::UniquenessOriginality,
        EvaluationCriterion::OverallImpact,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EvaluationCriterion::Hook => "hook",
            EvaluationCriterion::Clarity => "clarity",
            EvaluationCriterion::Conciseness => "conciseness",
            EvaluationCriterion::EmotionalAppeal => "emotional_appeal",
            EvaluationCriterion::CallToActionStrength => "call_to_action_strength",
            EvaluationCriterion::BrandVoiceAdherence => "brand_voice_adherence",
            EvaluationCriterion::PlatformCompliance => "platform_compliance",
            EvaluationCriterion::RelevanceToAudience => "relevance_to_audience",
            EvaluationCriterion::FeatureHighlightEffectiveness => {
                "feature_highlight_effectiveness"
            }
            EvaluationCriterion::UniquenessOriginality => "uniqueness_originality",
            EvaluationCriterion::OverallImpact => "overall_impact",
        }
    }
}

impl fmt::Display for EvaluationCriterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Score and feedback for one criterion. Scores run 1 (poor) to 5 (excellent).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EvaluationMetric {
    pub score: u8,
    pub feedback: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EvaluationReport {
    pub overall_score: f64,
    pub detailed_scores: BTreeMap<EvaluationCriterion, EvaluationMetric>,
    pub summary_feedback: String,
    pub actionable_recommendations: Vec<String>,
    pub is_approved_for_next_stage: bool,
}

impl EvaluationReport {
    /// Checks score ranges and that every criterion was scored.
    pub fn validate(&self) -> Result<(), String> {
        if !self.overall_score.is_finite() || !(1.0..=5.0).contains(&self.overall_score) {
            return Err(format!(
                "overall_score {} is outside 1.0-5.0",
                self.overall_score
            ));
        }
        for criterion in EvaluationCriterion::ALL {
            match self.detailed_scores.get(&criterion) {
                None => return Err(format!("missing score for criterion '{}'", criterion)),
                Some(metric) if !(1..=5).contains(&metric.score) => {
                    return Err(format!(
                        "score {} for '{}' is outside 1-5",
                        metric.score, criterion
                    ))
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    /// Lowest per-criterion score, if any criteria were scored.
    pub fn min_criterion_score(&self) -> Option<u8> {
        self.detailed_scores.values().map(|m| m.score).min()
    }

    /// Approved iff overall >= 4.5 and every criterion scored >= 4.
    pub fn meets_approval_threshold(&self) -> bool {
        self.overall_score >= APPROVAL_OVERALL_THRESHOLD
            && self
                .detailed_scores
                .values()
                .all(|metric| metric.score >= APPROVAL_CRITERION_THRESHOLD)
    }

    /// Overwrites the approval flag with the computed rule.
    ///
    /// Returns true when the reported flag disagreed with the scores.
    pub fn normalize_approval(&mut self) -> bool {
        let computed = self.meets_approval_threshold();
        let changed = computed != self.is_approved_for_next_stage;
        self.is_approved_for_next_stage = computed;
        changed
    }

    /// Recommendations joined one per line, or `None` when there are none.
    pub fn revision_feedback(&self) -> Option<String> {
        if self.actionable_recommendations.is_empty() {
            None
        } else {
            Some(self.actionable_recommendations.join("\n"))
        }
    }
}

#[cfg(test)]
#[path = "tests/evaluation_tests.rs"]
mod tests;
