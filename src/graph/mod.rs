//! Static step graphs for the primary and variation traversals.
//!
//! A graph maps every step to exactly one outgoing edge. The only cycle is
//! the evaluate/refine loop, expressed as a [`Edge::Route`] edge whose
//! refine branch leads to the refinement step for the same slot.

pub mod runner;

pub use runner::{run_graph, run_primary, run_variation, Traversal, TraversalOutcome};

use crate::domain::{DraftSlot, StepKind};
use anyhow::{bail, Result};
use std::collections::BTreeMap;

/// Where control goes after a step completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    To(StepKind),
    /// Ask the router. Refine goes to the slot's refinement step; finish goes
    /// to `finish`, or ends the traversal when it is `None`.
    Route {
        slot: DraftSlot,
        finish: Option<StepKind>,
    },
    End,
}

#[derive(Debug, Clone)]
pub struct Graph {
    name: &'static str,
    entry: StepKind,
    edges: BTreeMap<StepKind, Edge>,
}

impl Graph {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn entry(&self) -> StepKind {
        self.entry
    }

    pub fn edge(&self, step: StepKind) -> Option<Edge> {
        self.edges.get(&step).copied()
    }

    pub fn steps(&self) -> impl Iterator<Item = StepKind> + '_ {
        self.edges.keys().copied()
    }
}

pub struct GraphBuilder {
    name: &'static str,
    edges: BTreeMap<StepKind, Edge>,
}

impl GraphBuilder {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            edges: BTreeMap::new(),
        }
    }

    pub fn edge(mut self, from: StepKind, edge: Edge) -> Self {
        self.edges.insert(from, edge);
        self
    }

    /// Checks that every edge lands on a known step and that plain edges
    /// cannot loop without passing through the router.
    pub fn build(self, entry: StepKind) -> Result<Graph> {
        if !self.edges.contains_key(&entry) {
            bail!("graph '{}' has no node for entry {}", self.name, entry);
        }

        for (from, edge) in &self.edges {
            let targets: Vec<StepKind> = match edge {
                Edge::To(next) => vec![*next],
                Edge::Route { slot, finish } => {
                    let mut targets = vec![StepKind::refinement(*slot)];
                    targets.extend(finish.iter().copied());
                    targets
                }
                Edge::End => Vec::new(),
            };
            for target in targets {
                if !self.edges.contains_key(&target) {
                    bail!(
                        "graph '{}': edge from {} leads to missing node {}",
                        self.name,
                        from,
                        target
                    );
                }
            }
        }

        for start in self.edges.keys() {
            let mut current = *start;
            for _ in 0..=self.edges.len() {
                match self.edges.get(&current) {
                    Some(Edge::To(next)) => current = *next,
                    _ => break,
                }
                if current == *start {
                    bail!(
                        "graph '{}': {} loops back to itself without a router edge",
                        self.name,
                        start
                    );
                }
            }
        }

        Ok(Graph {
            name: self.name,
            entry,
            edges: self.edges,
        })
    }
}

/// insight -> strategy -> generation -> evaluation, then the bounded cycle.
pub fn build_primary_graph() -> Result<Graph> {
    GraphBuilder::new("primary")
        .edge(
            StepKind::AudienceInsight,
            Edge::To(StepKind::CreativeStrategy),
        )
        .edge(
            StepKind::CreativeStrategy,
            Edge::To(StepKind::ScriptGeneration),
        )
        .edge(
            StepKind::ScriptGeneration,
            Edge::To(StepKind::ScriptEvaluation),
        )
        .edge(
            StepKind::ScriptEvaluation,
            Edge::Route {
                slot: DraftSlot::Primary,
                finish: None,
            },
        )
        .edge(
            StepKind::ScriptRefinement,
            Edge::To(StepKind::ScriptEvaluation),
        )
        .build(StepKind::AudienceInsight)
}

/// variation generation -> evaluation, the bounded cycle, then finalize once.
pub fn build_variation_graph() -> Result<Graph> {
    GraphBuilder::new("variation")
        .edge(
            StepKind::VariationGeneration,
            Edge::To(StepKind::VariationEvaluation),
        )
        .edge(
            StepKind::VariationEvaluation,
            Edge::Route {
                slot: DraftSlot::Variation,
                finish: Some(StepKind::FinalizeVariation),
            },
        )
        .edge(
            StepKind::VariationRefinement,
            Edge::To(StepKind::VariationEvaluation),
        )
        .edge(StepKind::FinalizeVariation, Edge::End)
        .build(StepKind::VariationGeneration)
}
