//! Centralized state machine for one traversal.
//!
//! This module provides the ONLY place where state versions are advanced.
//! The state machine owns the current state and the loop phase, validates
//! every delta against the phase, emits events, and broadcasts snapshots to
//! subscribers via a watch channel.

mod events;
pub mod router;
mod snapshot;

pub use events::StateEvent;
pub use router::{route_after_evaluation, Route, Termination, MAX_REFINEMENT_ITERATIONS};
pub use snapshot::StateSnapshot;

use crate::domain::{DraftSlot, StepKind, WorkflowError};
use crate::state::{draft_field, StateDelta, WorkflowState};
use crate::structured_logger::StructuredLogger;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info};

/// Where a traversal is in the generate/evaluate/refine cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Nothing applied yet.
    Pending,
    /// Insight or strategy recorded, no draft yet.
    Preparing,
    /// A first draft exists and awaits evaluation.
    Generated,
    /// A refined draft awaits re-evaluation.
    Evaluating,
    /// The latest evaluation approved the draft.
    Approved,
    /// The latest evaluation rejected the draft.
    NeedsRefinement,
    /// The router sent the draft back for refinement.
    Refining,
    /// The router ended the loop.
    Done,
}

impl Phase {
    pub fn can_transition_to(&self, next: Phase) -> bool {
        use Phase::*;
        matches!(
            (self, next),
            (Pending, Preparing)
                | (Preparing, Preparing)
                | (Pending, Generated)
                | (Preparing, Generated)
                | (Generated, Approved)
                | (Generated, NeedsRefinement)
                | (Evaluating, Approved)
                | (Evaluating, NeedsRefinement)
                | (Approved, Done)
                | (NeedsRefinement, Refining)
                | (NeedsRefinement, Done)
                | (Refining, Evaluating)
        )
    }
}

/// The ONLY place state versions are advanced.
/// Owns the state, validates deltas, emits events, broadcasts snapshots.
pub struct WorkflowStateMachine {
    state: WorkflowState,
    phase: Phase,
    snapshot_tx: watch::Sender<StateSnapshot>,
    logger: Arc<StructuredLogger>,
}

impl WorkflowStateMachine {
    /// Creates a new state machine with the given initial state.
    ///
    /// Returns the state machine and a watch receiver for state snapshots.
    pub fn new(
        initial_state: WorkflowState,
        logger: Arc<StructuredLogger>,
    ) -> (Self, watch::Receiver<StateSnapshot>) {
        let phase = Phase::Pending;
        let snapshot = StateSnapshot::capture(&initial_state, phase);
        let (snapshot_tx, snapshot_rx) = watch::channel(snapshot);

        let machine = Self {
            state: initial_state,
            phase,
            snapshot_tx,
            logger,
        };

        (machine, snapshot_rx)
    }

    /// Applies one step's delta.
    ///
    /// On error neither the state nor the phase changes.
    pub fn apply(&mut self, delta: StateDelta) -> Result<Vec<StateEvent>, WorkflowError> {
        let step = delta.step();
        let cost = delta.token_cost();

        let result = self
            .target_phase(&delta)
            .and_then(|target| self.state.apply(delta).map(|next| (target, next)));
        let (target, next) = match result {
            Ok(ok) => ok,
            Err(e) => {
                self.logger.log_delta_rejected(step, &e.to_string());
                return Err(e);
            }
        };

        let previous = std::mem::replace(&mut self.state, next);
        let mut events = self.describe_changes(&previous, step, cost);
        if target != self.phase {
            events.push(StateEvent::PhaseChanged {
                from: self.phase,
                to: target,
            });
            self.phase = target;
        }

        self.logger
            .log_delta_applied(step, cost, self.state.total_llm_tokens());
        for event in &events {
            self.logger.log_state_event(event);
        }
        debug!(step = %step, phase = ?self.phase, "Applied delta");
        self.broadcast_snapshot();
        Ok(events)
    }

    /// Asks the router for the next edge and moves the phase accordingly.
    pub fn route(&mut self, slot: DraftSlot) -> Result<Route, WorkflowError> {
        let view = self.state.slot(slot);
        let iteration_count = view.iteration_count;
        let route = route_after_evaluation(view)?;
        let target = match route {
            Route::Refine => Phase::Refining,
            Route::Finish(_) => Phase::Done,
        };
        if !self.phase.can_transition_to(target) {
            return Err(WorkflowError::InvalidTransition {
                message: format!("cannot route from {:?} to {:?}", self.phase, target),
            });
        }

        info!(slot = %slot, iteration_count, route = ?route, "Router decision");
        self.logger.log_route_decision(slot, iteration_count, &route);
        let events = [
            StateEvent::RouteDecided { slot, route },
            StateEvent::PhaseChanged {
                from: self.phase,
                to: target,
            },
        ];
        for event in &events {
            self.logger.log_state_event(event);
        }
        self.phase = target;
        self.broadcast_snapshot();
        Ok(route)
    }

    fn target_phase(&self, delta: &StateDelta) -> Result<Phase, WorkflowError> {
        let target = match delta {
            StateDelta::InsightGenerated { .. } | StateDelta::StrategyGenerated { .. } => {
                Phase::Preparing
            }
            StateDelta::ScriptGenerated { .. } | StateDelta::VariationGenerated { .. } => {
                Phase::Generated
            }
            StateDelta::Evaluated { report, .. } => {
                if report.is_approved_for_next_stage {
                    Phase::Approved
                } else {
                    Phase::NeedsRefinement
                }
            }
            StateDelta::Refined { .. } => Phase::Evaluating,
            StateDelta::VariationFinalized { .. } => {
                if self.phase == Phase::Done {
                    return Ok(Phase::Done);
                }
                return Err(WorkflowError::InvalidTransition {
                    message: format!("cannot finalize a variation from {:?}", self.phase),
                });
            }
        };
        if self.phase.can_transition_to(target) {
            Ok(target)
        } else {
            Err(WorkflowError::InvalidTransition {
                message: format!(
                    "{} is not valid in phase {:?}",
                    delta.step(),
                    self.phase
                ),
            })
        }
    }

    fn describe_changes(
        &self,
        previous: &WorkflowState,
        step: StepKind,
        cost: u64,
    ) -> Vec<StateEvent> {
        let mut events = vec![StateEvent::TokensAccrued {
            step,
            cost,
            total: self.state.total_llm_tokens(),
        }];

        if previous.audience_insight().is_none() && self.state.audience_insight().is_some() {
            events.push(StateEvent::FieldPopulated {
                step,
                field: "audience_insight",
            });
        }
        if previous.creative_strategy().is_none() && self.state.creative_strategy().is_some() {
            events.push(StateEvent::FieldPopulated {
                step,
                field: "creative_strategy",
            });
        }

        for slot in [DraftSlot::Primary, DraftSlot::Variation] {
            let before = previous.slot(slot);
            let after = self.state.slot(slot);
            if before.draft.is_none() && after.draft.is_some() {
                events.push(StateEvent::FieldPopulated {
                    step,
                    field: draft_field(slot),
                });
            }
            if step == StepKind::evaluation(slot) {
                if let Some(report) = after.evaluation {
                    events.push(StateEvent::EvaluationRecorded {
                        slot,
                        overall_score: report.overall_score,
                        min_criterion_score: report.min_criterion_score(),
                        approved: report.is_approved_for_next_stage,
                    });
                }
            }
            if after.iteration_count != before.iteration_count {
                events.push(StateEvent::IterationIncremented {
                    slot,
                    new_value: after.iteration_count,
                });
            }
            if after.history.len() != before.history.len() {
                events.push(StateEvent::HistoryAppended {
                    slot,
                    len: after.history.len(),
                    previous_overall_score: after
                        .history
                        .last()
                        .map(|entry| entry.previous_overall_score),
                });
            }
        }

        if let (None, Some(variation)) = (
            previous.single_variation_result(),
            self.state.single_variation_result(),
        ) {
            events.push(StateEvent::VariationFinalized {
                iteration_count: variation.iteration_count(),
            });
        }
        events
    }

    /// Returns immutable reference to the current state.
    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Hands the final state to the caller.
    pub fn into_state(self) -> WorkflowState {
        self.state
    }

    /// Broadcasts the current state snapshot to all watchers.
    pub fn broadcast_snapshot(&self) {
        let snapshot = StateSnapshot::capture(&self.state, self.phase);
        let _ = self.snapshot_tx.send(snapshot);
    }
}
