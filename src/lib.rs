//! Ad script generation workflow.
//!
//! A campaign brief flows through audience insight, creative strategy and
//! script generation, then through a bounded evaluate/refine loop. An
//! optional second graph produces one A/B variation of the result.

pub mod app;
pub mod config;
pub mod domain;
pub mod generation;
pub mod graph;
pub mod paths;
pub mod phases;
pub mod state;
pub mod state_machine;
pub mod structured_logger;

#[cfg(test)]
pub mod testing;
