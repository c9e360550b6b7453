//! Events emitted by the state machine after applying deltas.
//!
//! These are for logging and notification purposes only.
//! Progress displays get updates via the watch channel's StateSnapshot.

use super::{Phase, Route};
use crate::domain::{DraftSlot, StepKind};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum StateEvent {
    /// Phase changed from one phase to another
    PhaseChanged { from: Phase, to: Phase },
    /// A step's token cost was added to the running total
    TokensAccrued {
        step: StepKind,
        cost: u64,
        total: u64,
    },
    /// A set-once field was populated
    FieldPopulated { step: StepKind, field: &'static str },
    /// An evaluation replaced the slot's previous one
    EvaluationRecorded {
        slot: DraftSlot,
        overall_score: f64,
        /// Lowest per-criterion score, `None` when nothing was scored
        min_criterion_score: Option<u8>,
        approved: bool,
    },
    /// A refinement incremented the slot's counter
    IterationIncremented { slot: DraftSlot, new_value: u32 },
    /// A refinement appended to the slot's ledger
    HistoryAppended {
        slot: DraftSlot,
        len: usize,
        /// Overall score of the evaluation the new entry responded to
        previous_overall_score: Option<f64>,
    },
    /// The router chose the next edge
    RouteDecided { slot: DraftSlot, route: Route },
    /// The variation was packaged for consumers
    VariationFinalized { iteration_count: u32 },
}
