//! Drives a [`Graph`] to completion on a [`WorkflowStateMachine`].

use super::{build_primary_graph, build_variation_graph, Edge, Graph};
use crate::domain::{StepKind, WorkflowError};
use crate::phases::{execute_step, PhaseContext};
use crate::state::WorkflowState;
use crate::state_machine::{Route, Termination, WorkflowStateMachine};
use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, error, info};

/// What a traversal did, in execution order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Traversal {
    pub steps: Vec<StepKind>,
    /// How the last evaluate/refine loop ended.
    pub termination: Option<Termination>,
}

/// A finished traversal together with the state it produced.
#[derive(Debug, Clone)]
pub struct TraversalOutcome {
    pub state: WorkflowState,
    pub steps: Vec<StepKind>,
    pub termination: Option<Termination>,
}

/// Runs `graph` from its entry until an `End` edge or a finishing route.
///
/// Steps run strictly one after another. The first error aborts the
/// traversal; the machine keeps the last state that was applied.
pub async fn run_graph(
    graph: &Graph,
    machine: &mut WorkflowStateMachine,
    ctx: &PhaseContext<'_>,
) -> Result<Traversal, WorkflowError> {
    info!(
        graph = graph.name(),
        entry = %graph.entry(),
        nodes = graph.steps().count(),
        "Starting traversal"
    );
    ctx.logger.log_traversal_start(graph.name());

    let result = traverse(graph, machine, ctx).await;
    match &result {
        Ok(traversal) => {
            let label = traversal
                .termination
                .map(|t| t.to_string())
                .unwrap_or_else(|| "completed".to_string());
            info!(
                graph = graph.name(),
                steps = traversal.steps.len(),
                result = %label,
                tokens = machine.state().total_llm_tokens(),
                "Traversal complete"
            );
            ctx.logger.log_traversal_complete(graph.name(), &label);
        }
        Err(e) => {
            error!(graph = graph.name(), error = %e, "Traversal aborted");
            ctx.logger
                .log_traversal_complete(graph.name(), &format!("failed: {}", e));
        }
    }
    result
}

async fn traverse(
    graph: &Graph,
    machine: &mut WorkflowStateMachine,
    ctx: &PhaseContext<'_>,
) -> Result<Traversal, WorkflowError> {
    // An unknown platform fails here, before the first generation call.
    let kind = machine.state().brief().ad_platform.kind()?;
    debug!(graph = graph.name(), script_type = %kind, "Platform classified");

    let mut steps = Vec::new();
    let mut termination = None;
    let mut current = graph.entry();

    loop {
        let delta = execute_step(current, machine.state(), ctx).await?;
        machine.apply(delta)?;
        steps.push(current);

        let edge = graph
            .edge(current)
            .ok_or_else(|| WorkflowError::InvalidTransition {
                message: format!("{} has no outgoing edge in '{}'", current, graph.name()),
            })?;
        current = match edge {
            Edge::To(next) => next,
            Edge::End => break,
            Edge::Route { slot, finish } => match machine.route(slot)? {
                Route::Refine => StepKind::refinement(slot),
                Route::Finish(reason) => {
                    termination = Some(reason);
                    match finish {
                        Some(next) => next,
                        None => break,
                    }
                }
            },
        };
    }

    Ok(Traversal { steps, termination })
}

/// Runs the primary graph from a fresh state.
pub async fn run_primary(
    state: WorkflowState,
    ctx: &PhaseContext<'_>,
) -> Result<TraversalOutcome> {
    let graph = build_primary_graph().context("Failed to assemble primary graph")?;
    let (mut machine, _snapshots) = WorkflowStateMachine::new(state, ctx.logger.clone());
    let traversal = run_graph(&graph, &mut machine, ctx).await?;
    Ok(TraversalOutcome {
        state: machine.into_state(),
        steps: traversal.steps,
        termination: traversal.termination,
    })
}

/// Runs the variation graph on the state a primary traversal produced.
pub async fn run_variation(
    state: WorkflowState,
    ctx: &PhaseContext<'_>,
) -> Result<TraversalOutcome> {
    check_variation_ready(&state)?;
    let graph = build_variation_graph().context("Failed to assemble variation graph")?;
    let (mut machine, _snapshots) = WorkflowStateMachine::new(state, ctx.logger.clone());
    let traversal = run_graph(&graph, &mut machine, ctx).await?;
    Ok(TraversalOutcome {
        state: machine.into_state(),
        steps: traversal.steps,
        termination: traversal.termination,
    })
}

/// The variation graph needs a completed primary traversal.
pub fn check_variation_ready(state: &WorkflowState) -> Result<(), WorkflowError> {
    let step = StepKind::VariationGeneration;
    if state.script_draft().is_none() {
        return Err(WorkflowError::Precondition {
            step,
            missing: "script_draft",
        });
    }
    if state.evaluation_report().is_none() {
        return Err(WorkflowError::Precondition {
            step,
            missing: "evaluation_report",
        });
    }
    Ok(())
}

#[cfg(test)]
#[path = "tests/runner_tests.rs"]
mod tests;
