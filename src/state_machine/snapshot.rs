//! Read-only snapshot of workflow progress for display.
//!
//! Consumers never mutate this; they receive new snapshots via the watch channel.

use super::Phase;
use crate::state::WorkflowState;

#[derive(Debug, Clone, PartialEq)]
pub struct StateSnapshot {
    /// Current loop phase
    pub phase: Phase,
    /// Primary refinements completed
    pub iteration_count: u32,
    /// Variation refinements completed
    pub variation_iteration_count: u32,
    /// Running token total
    pub total_llm_tokens: u64,
    /// Overall score of the most recent evaluation, variation first
    pub latest_score: Option<f64>,
    /// Whether the most recent evaluation approved its draft
    pub latest_approved: bool,
    /// Whether a finalized variation exists
    pub has_variation_result: bool,
}

impl StateSnapshot {
    pub fn capture(state: &WorkflowState, phase: Phase) -> Self {
        let latest = state
            .variation_evaluation()
            .or_else(|| state.evaluation_report());
        Self {
            phase,
            iteration_count: state.iteration_count(),
            variation_iteration_count: state.variation_iteration_count(),
            total_llm_tokens: state.total_llm_tokens(),
            latest_score: latest.map(|report| report.overall_score),
            latest_approved: latest.is_some_and(|report| report.is_approved_for_next_stage),
            has_variation_result: state.single_variation_result().is_some(),
        }
    }
}
