use crate::config::{EvaluationSettings, WorkflowConfig};
use crate::domain::{CampaignBrief, FailureKind, FailurePolicy};
use crate::generation::GenerationService;
use crate::graph::runner::check_variation_ready;
use crate::graph::{build_primary_graph, build_variation_graph, run_graph, Graph, TraversalOutcome};
use crate::phases::PhaseContext;
use crate::state::WorkflowState;
use crate::state_machine::{StateSnapshot, WorkflowStateMachine};
use crate::structured_logger::StructuredLogger;
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Result of one campaign run: the primary traversal and, when requested,
/// the variation traversal that followed it.
#[derive(Debug, Clone)]
pub struct CampaignResult {
    pub primary: TraversalOutcome,
    pub variation: Option<TraversalOutcome>,
    /// Traversal attempts across both graphs, including retries.
    pub attempts: u32,
}

impl CampaignResult {
    /// The most advanced state: the variation's if it ran, else the primary's.
    pub fn final_state(&self) -> &WorkflowState {
        self.variation
            .as_ref()
            .map(|outcome| &outcome.state)
            .unwrap_or(&self.primary.state)
    }
}

/// Runs campaign traversals with whole-traversal retries.
///
/// A failed traversal is never resumed. When the failure is retryable the
/// graph is re-run from the state it started with.
pub struct CampaignRunner {
    generator: Arc<dyn GenerationService>,
    logger: Arc<StructuredLogger>,
    evaluation: EvaluationSettings,
    policy: FailurePolicy,
    show_progress: bool,
}

impl CampaignRunner {
    pub fn new(
        generator: Arc<dyn GenerationService>,
        logger: Arc<StructuredLogger>,
        config: &WorkflowConfig,
    ) -> Self {
        Self {
            generator,
            logger,
            evaluation: config.evaluation.clone(),
            policy: config.failure_policy.clone(),
            show_progress: false,
        }
    }

    /// Logs every state snapshot while a traversal runs.
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub async fn run(&self, brief: CampaignBrief, with_variation: bool) -> Result<CampaignResult> {
        let mut attempts = 0;

        let primary_graph = build_primary_graph()?;
        let primary = self
            .run_with_retries(&primary_graph, &WorkflowState::new(brief), &mut attempts)
            .await?;

        let variation = if with_variation {
            check_variation_ready(&primary.state)
                .context("Primary traversal left no evaluated draft to vary")?;
            let variation_graph = build_variation_graph()?;
            Some(
                self.run_with_retries(&variation_graph, &primary.state, &mut attempts)
                    .await?,
            )
        } else {
            None
        };

        Ok(CampaignResult {
            primary,
            variation,
            attempts,
        })
    }

    async fn run_with_retries(
        &self,
        graph: &Graph,
        initial: &WorkflowState,
        attempts: &mut u32,
    ) -> Result<TraversalOutcome> {
        let mut retries = 0;
        loop {
            *attempts += 1;
            match self.run_once(graph, initial.clone()).await {
                Ok(outcome) => return Ok(outcome),
                Err(e) => {
                    let kind = FailureKind::classify(&e);
                    if !self.policy.allows_retry(&kind, retries) {
                        let message = format!(
                            "{} traversal failed ({}) after {} retries",
                            graph.name(),
                            kind.display_name(),
                            retries
                        );
                        return Err(anyhow::Error::new(e).context(message));
                    }
                    retries += 1;
                    let delay = self.policy.backoff(retries);
                    warn!(
                        graph = graph.name(),
                        failure = kind.display_name(),
                        retry = retries,
                        max_retries = self.policy.max_retries,
                        delay_secs = delay.as_secs(),
                        error = %e,
                        "Traversal failed, retrying from the start"
                    );
                    self.logger.increment_attempt();
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    async fn run_once(
        &self,
        graph: &Graph,
        initial: WorkflowState,
    ) -> Result<TraversalOutcome, crate::domain::WorkflowError> {
        let ctx = PhaseContext {
            generator: self.generator.as_ref(),
            logger: self.logger.clone(),
            evaluation: self.evaluation.clone(),
        };
        let (mut machine, snapshots) = WorkflowStateMachine::new(initial, self.logger.clone());
        let progress = self
            .show_progress
            .then(|| spawn_progress(graph.name(), snapshots));

        let result = run_graph(graph, &mut machine, &ctx).await;
        let state = machine.into_state();
        if let Some(handle) = progress {
            let _ = handle.await;
        }

        result.map(|traversal| TraversalOutcome {
            state,
            steps: traversal.steps,
            termination: traversal.termination,
        })
    }
}

/// Reports snapshots until the state machine is dropped.
fn spawn_progress(
    graph: &'static str,
    mut snapshots: watch::Receiver<StateSnapshot>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while snapshots.changed().await.is_ok() {
            let snapshot = snapshots.borrow_and_update().clone();
            info!(
                graph,
                phase = ?snapshot.phase,
                iteration = snapshot.iteration_count,
                variation_iteration = snapshot.variation_iteration_count,
                tokens = snapshot.total_llm_tokens,
                latest_score = ?snapshot.latest_score,
                "Progress"
            );
        }
    })
}

#[cfg(test)]
#[path = "tests/runner_tests.rs"]
mod tests;
