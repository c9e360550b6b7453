//! Append-only ledger of refinement attempts.
//!
//! Each refinement appends exactly one entry. Entries are never edited or
//! removed, and their order is the order the refinements ran in.

use crate::domain::campaign::PlatformKind;
use crate::domain::evaluation::EvaluationReport;
use crate::domain::script::ScriptDraft;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryAction {
    ScriptRefined,
    VariationRefined,
}

/// The parts of a produced draft the evaluator is shown on later passes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftSnapshot {
    pub script_type: PlatformKind,
    pub key_takeaway: String,
    pub call_to_action_text: String,
}

impl From<&ScriptDraft> for DraftSnapshot {
    fn from(draft: &ScriptDraft) -> Self {
        Self {
            script_type: draft.kind(),
            key_takeaway: draft.key_takeaway().to_string(),
            call_to_action_text: draft.call_to_action_text().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationLogEntry {
    /// 1-based number of the refinement that produced this entry.
    pub iteration: u32,
    pub timestamp: DateTime<Utc>,
    pub action: HistoryAction,
    pub previous_overall_score: f64,
    pub recommendations_given: Vec<String>,
    pub output_snapshot: DraftSnapshot,
}

impl IterationLogEntry {
    /// Records a refinement that answered `evaluation` with `refined`.
    pub fn new(
        iteration: u32,
        action: HistoryAction,
        evaluation: &EvaluationReport,
        refined: &ScriptDraft,
    ) -> Self {
        Self {
            iteration,
            timestamp: Utc::now(),
            action,
            previous_overall_score: evaluation.overall_score,
            recommendations_given: evaluation.actionable_recommendations.clone(),
            output_snapshot: DraftSnapshot::from(refined),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HistoryLedger(Vec<IterationLogEntry>);

impl HistoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[IterationLogEntry] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn last(&self) -> Option<&IterationLogEntry> {
        self.0.last()
    }

    pub(crate) fn append(&mut self, entry: IterationLogEntry) {
        self.0.push(entry);
    }
}
