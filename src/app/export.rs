use crate::app::runner::CampaignResult;
use crate::domain::StepKind;
use crate::state::WorkflowState;
use crate::state_machine::Termination;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;

/// Everything a consumer needs from one run, written as a single JSON file.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport<'a> {
    pub run_id: &'a str,
    pub generated_at: DateTime<Utc>,
    pub attempts: u32,
    pub primary_steps: &'a [StepKind],
    pub primary_termination: Option<Termination>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variation_steps: Option<&'a [StepKind]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variation_termination: Option<Termination>,
    /// Final state; includes the finalized variation when one ran.
    pub state: &'a WorkflowState,
}

impl<'a> RunReport<'a> {
    pub fn new(run_id: &'a str, result: &'a CampaignResult) -> Self {
        Self {
            run_id,
            generated_at: Utc::now(),
            attempts: result.attempts,
            primary_steps: &result.primary.steps,
            primary_termination: result.primary.termination,
            variation_steps: result.variation.as_ref().map(|v| v.steps.as_slice()),
            variation_termination: result.variation.as_ref().and_then(|v| v.termination),
            state: result.final_state(),
        }
    }

    /// Short human-readable lines for the terminal.
    pub fn summary_lines(&self) -> Vec<String> {
        let mut lines = vec![format!("Run {}", self.run_id)];

        let primary_score = self
            .state
            .evaluation_report()
            .map(|report| format!("{:.1}/5.0", report.overall_score))
            .unwrap_or_else(|| "not evaluated".to_string());
        lines.push(format!(
            "Primary script: {} after {} refinement(s), score {}",
            termination_label(self.primary_termination),
            self.state.iteration_count(),
            primary_score
        ));

        if let Some(variation) = self.state.single_variation_result() {
            lines.push(format!(
                "Variation: {} ({})",
                termination_label(self.variation_termination),
                variation.notes()
            ));
        }

        lines.push(format!(
            "Total LLM tokens: {}",
            self.state.total_llm_tokens()
        ));
        lines
    }
}

fn termination_label(termination: Option<Termination>) -> &'static str {
    match termination {
        Some(Termination::Approved) => "approved",
        Some(Termination::Exhausted) => "not approved (refinement limit reached)",
        None => "incomplete",
    }
}

/// Writes `report` as pretty JSON, creating parent directories as needed.
pub fn write_report(path: &Path, report: &RunReport<'_>) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
    }
    let json = serde_json::to_string_pretty(report).context("Failed to serialize run report")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write report: {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DraftSlot, FinalizedVariation, PlatformKind};
    use crate::graph::TraversalOutcome;
    use crate::state::StateDelta;
    use crate::testing::{draft, evaluation, generated_state, VIDEO_PLATFORM};
    use tempfile::tempdir;

    fn evaluated_state() -> WorkflowState {
        generated_state(VIDEO_PLATFORM)
            .apply(StateDelta::Evaluated {
                slot: DraftSlot::Primary,
                report: evaluation(4.7, 5, &[]),
                token_cost: 5,
            })
            .unwrap()
    }

    fn primary_only() -> CampaignResult {
        CampaignResult {
            primary: TraversalOutcome {
                state: evaluated_state(),
                steps: vec![
                    StepKind::AudienceInsight,
                    StepKind::CreativeStrategy,
                    StepKind::ScriptGeneration,
                    StepKind::ScriptEvaluation,
                ],
                termination: Some(Termination::Approved),
            },
            variation: None,
            attempts: 1,
        }
    }

    #[test]
    fn test_write_report_exposes_consumer_fields() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out").join("report.json");
        let result = primary_only();
        let report = RunReport::new("run-1", &result);

        write_report(&path, &report).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["run_id"], "run-1");
        assert_eq!(value["primary_termination"], "approved");
        assert_eq!(value["primary_steps"][3], "script_evaluation");
        assert_eq!(value["state"]["script_draft"]["script_type"], "Video");
        assert_eq!(value["state"]["iteration_count"], 0);
        assert_eq!(value["state"]["total_llm_tokens"], 65);
        assert!(value["state"]["history"].as_array().unwrap().is_empty());
        assert!(value.get("variation_steps").is_none());
    }

    #[test]
    fn test_summary_mentions_variation_notes() {
        let mut result = primary_only();
        let state = result
            .primary
            .state
            .apply(StateDelta::VariationGenerated {
                request: crate::domain::VariationRequest::hook_cta_tone(),
                draft: draft(PlatformKind::Video, "Claim it"),
                token_cost: 3,
            })
            .and_then(|s| {
                s.apply(StateDelta::VariationFinalized {
                    variation: FinalizedVariation::package(
                        draft(PlatformKind::Video, "Claim it"),
                        None,
                        0,
                    ),
                })
            })
            .unwrap();
        result.variation = Some(TraversalOutcome {
            state,
            steps: vec![StepKind::VariationGeneration, StepKind::FinalizeVariation],
            termination: None,
        });

        let report = RunReport::new("run-2", &result);
        let lines = report.summary_lines();

        assert_eq!(lines[0], "Run run-2");
        assert!(lines[1].contains("approved after 0 refinement(s), score 4.7/5.0"));
        assert!(lines[2].contains("Generated single variation for A/B testing"));
        assert_eq!(lines[3], "Total LLM tokens: 68");
    }
}
