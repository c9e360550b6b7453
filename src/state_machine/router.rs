//! Termination policy for the evaluation/refinement cycle.
//!
//! After every evaluation the router picks one of two edges: back to
//! refinement, or out of the loop. The same policy governs the primary and
//! the variation loop, each over its own fields.

use crate::domain::{StepKind, WorkflowError};
use crate::state::{evaluation_field, SlotView};
use serde::Serialize;
use std::fmt;

/// Refinements allowed per loop before the last draft is accepted as is.
pub const MAX_REFINEMENT_ITERATIONS: u32 = 3;

/// Why a loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// The latest evaluation approved the draft.
    Approved,
    /// The cap was reached; the last draft is kept unapproved.
    Exhausted,
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Termination::Approved => write!(f, "approved"),
            Termination::Exhausted => write!(f, "exhausted"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    Refine,
    Finish(Termination),
}

/// Decides the edge taken after an evaluation of `view`'s slot.
///
/// Approval wins over everything. Otherwise the loop refines until the
/// slot's counter reaches [`MAX_REFINEMENT_ITERATIONS`].
pub fn route_after_evaluation(view: SlotView<'_>) -> Result<Route, WorkflowError> {
    let evaluation = view.evaluation.ok_or(WorkflowError::Precondition {
        step: StepKind::evaluation(view.slot),
        missing: evaluation_field(view.slot),
    })?;

    if evaluation.is_approved_for_next_stage {
        Ok(Route::Finish(Termination::Approved))
    } else if view.iteration_count >= MAX_REFINEMENT_ITERATIONS {
        Ok(Route::Finish(Termination::Exhausted))
    } else {
        Ok(Route::Refine)
    }
}
