//! The workflow state record.
//!
//! `WorkflowState` is replaced, never mutated: every step returns a
//! [`StateDelta`] and [`WorkflowState::apply`] builds the next version from a
//! copy. Fields are private so the only way to advance a state is through a
//! delta, and every delta is checked against the invariants of the loop.

use crate::domain::{
    AudienceInsight, CampaignBrief, CreativeStrategy, DraftSlot, EvaluationReport,
    FinalizedVariation, HistoryLedger, IterationLogEntry, ScriptDraft, StepKind,
    VariationRequest, WorkflowError,
};
use crate::state_machine::router::MAX_REFINEMENT_ITERATIONS;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Output of one step, ready to be applied to the state it was computed from.
#[derive(Debug, Clone, PartialEq)]
pub enum StateDelta {
    InsightGenerated {
        insight: AudienceInsight,
        token_cost: u64,
    },
    StrategyGenerated {
        strategy: CreativeStrategy,
        token_cost: u64,
    },
    ScriptGenerated {
        draft: ScriptDraft,
        token_cost: u64,
    },
    VariationGenerated {
        request: VariationRequest,
        draft: ScriptDraft,
        token_cost: u64,
    },
    Evaluated {
        slot: DraftSlot,
        report: EvaluationReport,
        token_cost: u64,
    },
    Refined {
        slot: DraftSlot,
        draft: ScriptDraft,
        entry: IterationLogEntry,
        token_cost: u64,
    },
    VariationFinalized {
        variation: FinalizedVariation,
    },
}

impl StateDelta {
    /// The step that produces this delta.
    pub fn step(&self) -> StepKind {
        match self {
            StateDelta::InsightGenerated { .. } => StepKind::AudienceInsight,
            StateDelta::StrategyGenerated { .. } => StepKind::CreativeStrategy,
            StateDelta::ScriptGenerated { .. } => StepKind::ScriptGeneration,
            StateDelta::VariationGenerated { .. } => StepKind::VariationGeneration,
            StateDelta::Evaluated { slot, .. } => StepKind::evaluation(*slot),
            StateDelta::Refined { slot, .. } => StepKind::refinement(*slot),
            StateDelta::VariationFinalized { .. } => StepKind::FinalizeVariation,
        }
    }

    pub fn token_cost(&self) -> u64 {
        match self {
            StateDelta::InsightGenerated { token_cost, .. }
            | StateDelta::StrategyGenerated { token_cost, .. }
            | StateDelta::ScriptGenerated { token_cost, .. }
            | StateDelta::VariationGenerated { token_cost, .. }
            | StateDelta::Evaluated { token_cost, .. }
            | StateDelta::Refined { token_cost, .. } => *token_cost,
            StateDelta::VariationFinalized { .. } => 0,
        }
    }
}

/// Read-only view of the fields one loop operates on.
#[derive(Debug, Clone, Copy)]
pub struct SlotView<'a> {
    pub slot: DraftSlot,
    pub draft: Option<&'a ScriptDraft>,
    pub evaluation: Option<&'a EvaluationReport>,
    pub revision_feedback: Option<&'a str>,
    pub iteration_count: u32,
    pub history: &'a HistoryLedger,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkflowState {
    #[serde(flatten)]
    brief: CampaignBrief,
    audience_insight: Option<AudienceInsight>,
    creative_strategy: Option<CreativeStrategy>,
    script_draft: Option<ScriptDraft>,
    evaluation_report: Option<EvaluationReport>,
    revision_feedback: Option<String>,
    iteration_count: u32,
    history: HistoryLedger,
    variation_request: Option<VariationRequest>,
    variation_script_draft: Option<ScriptDraft>,
    variation_evaluation_report: Option<EvaluationReport>,
    variation_revision_feedback: Option<String>,
    variation_iteration_count: u32,
    variation_history: HistoryLedger,
    single_variation_result: Option<FinalizedVariation>,
    total_llm_tokens: u64,
    updated_at: DateTime<Utc>,
}

impl WorkflowState {
    /// Creates a state with the identity fields set and every accumulator empty.
    pub fn new(brief: CampaignBrief) -> Self {
        Self {
            brief,
            audience_insight: None,
            creative_strategy: None,
            script_draft: None,
            evaluation_report: None,
            revision_feedback: None,
            iteration_count: 0,
            history: HistoryLedger::new(),
            variation_request: None,
            variation_script_draft: None,
            variation_evaluation_report: None,
            variation_revision_feedback: None,
            variation_iteration_count: 0,
            variation_history: HistoryLedger::new(),
            single_variation_result: None,
            total_llm_tokens: 0,
            updated_at: Utc::now(),
        }
    }

    /// Builds the next state version from `delta`.
    ///
    /// `self` is never modified. On error no new version exists and the
    /// caller keeps the state it had.
    pub fn apply(&self, delta: StateDelta) -> Result<WorkflowState, WorkflowError> {
        let step = delta.step();
        let mut next = self.clone();
        next.total_llm_tokens = next.total_llm_tokens.saturating_add(delta.token_cost());

        match delta {
            StateDelta::InsightGenerated { insight, .. } => {
                if self.audience_insight.is_some() {
                    return Err(already_set(step, "audience_insight"));
                }
                next.audience_insight = Some(insight);
            }
            StateDelta::StrategyGenerated { strategy, .. } => {
                require(step, self.audience_insight.is_some(), "audience_insight")?;
                if self.creative_strategy.is_some() {
                    return Err(already_set(step, "creative_strategy"));
                }
                next.creative_strategy = Some(strategy);
            }
            StateDelta::ScriptGenerated { draft, .. } => {
                require(step, self.audience_insight.is_some(), "audience_insight")?;
                require(step, self.creative_strategy.is_some(), "creative_strategy")?;
                if self.script_draft.is_some() {
                    return Err(already_set(step, "script_draft"));
                }
                self.check_platform_kind(&draft)?;
                next.script_draft = Some(draft);
            }
            StateDelta::VariationGenerated { request, draft, .. } => {
                require(step, self.script_draft.is_some(), "script_draft")?;
                require(step, self.evaluation_report.is_some(), "evaluation_report")?;
                if self.variation_script_draft.is_some() {
                    return Err(already_set(step, "variation_script_draft"));
                }
                self.check_platform_kind(&draft)?;
                next.variation_request = Some(request);
                next.variation_script_draft = Some(draft);
            }
            StateDelta::Evaluated { slot, report, .. } => {
                require(step, self.slot(slot).draft.is_some(), draft_field(slot))?;
                let feedback = report.revision_feedback();
                match slot {
                    DraftSlot::Primary => {
                        next.evaluation_report = Some(report);
                        next.revision_feedback = feedback;
                    }
                    DraftSlot::Variation => {
                        next.variation_evaluation_report = Some(report);
                        next.variation_revision_feedback = feedback;
                    }
                }
            }
            StateDelta::Refined {
                slot, draft, entry, ..
            } => {
                let view = self.slot(slot);
                let current = view
                    .draft
                    .ok_or_else(|| precondition(step, draft_field(slot)))?;
                require(step, view.evaluation.is_some(), evaluation_field(slot))?;
                if current.kind() != draft.kind() {
                    return Err(WorkflowError::SchemaMismatch {
                        expected: current.kind().to_string(),
                        found: draft.kind().to_string(),
                    });
                }
                if view.iteration_count >= MAX_REFINEMENT_ITERATIONS {
                    return Err(WorkflowError::InvalidTransition {
                        message: format!(
                            "{} would exceed the cap of {} refinements",
                            step, MAX_REFINEMENT_ITERATIONS
                        ),
                    });
                }
                if entry.iteration != view.iteration_count + 1 {
                    return Err(WorkflowError::InvalidTransition {
                        message: format!(
                            "history entry for iteration {} does not follow iteration {}",
                            entry.iteration, view.iteration_count
                        ),
                    });
                }
                match slot {
                    DraftSlot::Primary => {
                        next.script_draft = Some(draft);
                        next.iteration_count += 1;
                        next.history.append(entry);
                        next.revision_feedback = None;
                    }
                    DraftSlot::Variation => {
                        next.variation_script_draft = Some(draft);
                        next.variation_iteration_count += 1;
                        next.variation_history.append(entry);
                        next.variation_revision_feedback = None;
                    }
                }
            }
            StateDelta::VariationFinalized { variation } => {
                require(
                    step,
                    self.variation_script_draft.is_some(),
                    "variation_script_draft",
                )?;
                if self.single_variation_result.is_some() {
                    return Err(already_set(step, "single_variation_result"));
                }
                next.single_variation_result = Some(variation);
            }
        }

        next.updated_at = Utc::now();
        Ok(next)
    }

    fn check_platform_kind(&self, draft: &ScriptDraft) -> Result<(), WorkflowError> {
        let expected = self.brief.ad_platform.kind()?;
        if draft.kind() != expected {
            return Err(WorkflowError::SchemaMismatch {
                expected: expected.to_string(),
                found: draft.kind().to_string(),
            });
        }
        Ok(())
    }

    /// The fields one loop reads.
    pub fn slot(&self, slot: DraftSlot) -> SlotView<'_> {
        match slot {
            DraftSlot::Primary => SlotView {
                slot,
                draft: self.script_draft.as_ref(),
                evaluation: self.evaluation_report.as_ref(),
                revision_feedback: self.revision_feedback.as_deref(),
                iteration_count: self.iteration_count,
                history: &self.history,
            },
            DraftSlot::Variation => SlotView {
                slot,
                draft: self.variation_script_draft.as_ref(),
                evaluation: self.variation_evaluation_report.as_ref(),
                revision_feedback: self.variation_revision_feedback.as_deref(),
                iteration_count: self.variation_iteration_count,
                history: &self.variation_history,
            },
        }
    }

    pub fn brief(&self) -> &CampaignBrief {
        &self.brief
    }

    pub fn audience_insight(&self) -> Option<&AudienceInsight> {
        self.audience_insight.as_ref()
    }

    pub fn creative_strategy(&self) -> Option<&CreativeStrategy> {
        self.creative_strategy.as_ref()
    }

    pub fn script_draft(&self) -> Option<&ScriptDraft> {
        self.script_draft.as_ref()
    }

    pub fn evaluation_report(&self) -> Option<&EvaluationReport> {
        self.evaluation_report.as_ref()
    }

    pub fn revision_feedback(&self) -> Option<&str> {
        self.revision_feedback.as_deref()
    }

    pub fn iteration_count(&self) -> u32 {
        self.iteration_count
    }

    pub fn history(&self) -> &HistoryLedger {
        &self.history
    }

    pub fn variation_request(&self) -> Option<&VariationRequest> {
        self.variation_request.as_ref()
    }

    pub fn variation_draft(&self) -> Option<&ScriptDraft> {
        self.variation_script_draft.as_ref()
    }

    pub fn variation_evaluation(&self) -> Option<&EvaluationReport> {
        self.variation_evaluation_report.as_ref()
    }

    pub fn variation_iteration_count(&self) -> u32 {
        self.variation_iteration_count
    }

    pub fn variation_history(&self) -> &HistoryLedger {
        &self.variation_history
    }

    pub fn single_variation_result(&self) -> Option<&FinalizedVariation> {
        self.single_variation_result.as_ref()
    }

    pub fn total_llm_tokens(&self) -> u64 {
        self.total_llm_tokens
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

fn precondition(step: StepKind, missing: &'static str) -> WorkflowError {
    WorkflowError::Precondition { step, missing }
}

fn require(step: StepKind, present: bool, field: &'static str) -> Result<(), WorkflowError> {
    if present {
        Ok(())
    } else {
        Err(precondition(step, field))
    }
}

fn already_set(step: StepKind, field: &str) -> WorkflowError {
    WorkflowError::InvalidTransition {
        message: format!("{} cannot overwrite {}", step, field),
    }
}

/// Name of the draft field a slot reads, as it appears in the serialized state.
pub fn draft_field(slot: DraftSlot) -> &'static str {
    match slot {
        DraftSlot::Primary => "script_draft",
        DraftSlot::Variation => "variation_script_draft",
    }
}

/// Name of the evaluation field a slot reads, as it appears in the serialized state.
pub fn evaluation_field(slot: DraftSlot) -> &'static str {
    match slot {
        DraftSlot::Primary => "evaluation_report",
        DraftSlot::Variation => "variation_evaluation_report",
    }
}

#[cfg(test)]
#[path = "tests/state_tests.rs"]
mod tests;
