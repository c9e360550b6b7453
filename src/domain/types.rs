//! Strongly typed identifiers shared across the workflow.
//!
//! These newtypes and enums name the steps of both graphs, the two draft
//! slots a loop can run against, and the identity of a single traversal run.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for one campaign run (primary plus optional variation).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Creates a new random run ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which set of draft fields a loop operates on.
///
/// The variation loop keeps its own draft, evaluation, counter and ledger so
/// that producing a variant never disturbs the primary artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftSlot {
    Primary,
    Variation,
}

impl fmt::Display for DraftSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DraftSlot::Primary => write!(f, "primary"),
            DraftSlot::Variation => write!(f, "variation"),
        }
    }
}

/// Every node that can appear in either graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    AudienceInsight,
    CreativeStrategy,
    ScriptGeneration,
    ScriptEvaluation,
    ScriptRefinement,
    VariationGeneration,
    VariationEvaluation,
    VariationRefinement,
    FinalizeVariation,
}

impl StepKind {
    /// The evaluation node for a slot.
    pub fn evaluation(slot: DraftSlot) -> Self {
        match slot {
            DraftSlot::Primary => StepKind::ScriptEvaluation,
            DraftSlot::Variation => StepKind::VariationEvaluation,
        }
    }

    /// The refinement node for a slot.
    pub fn refinement(slot: DraftSlot) -> Self {
        match slot {
            DraftSlot::Primary => StepKind::ScriptRefinement,
            DraftSlot::Variation => StepKind::VariationRefinement,
        }
    }

    /// Stable node name used in logs and step traces.
    pub fn node_name(&self) -> &'static str {
        match self {
            StepKind::AudienceInsight => "audience_insight_node",
            StepKind::CreativeStrategy => "creative_strategy_node",
            StepKind::ScriptGeneration => "script_generation_node",
            StepKind::ScriptEvaluation => "script_evaluation_node",
            StepKind::ScriptRefinement => "script_refinement_node",
            StepKind::VariationGeneration => "variation_generation_node",
            StepKind::VariationEvaluation => "variation_evaluation_node",
            StepKind::VariationRefinement => "variation_refinement_node",
            StepKind::FinalizeVariation => "finalize_variation_node",
        }
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.node_name())
    }
}
