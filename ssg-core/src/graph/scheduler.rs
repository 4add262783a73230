//! Component Scheduler
//!
//! The scheduler decides the order in which parts of the game are solved. A
//! node's value depends only on its successors, so successors are always
//! solved first.
//!
//! # Algorithm
//!
//! 1. If the graph is acyclic, every node is its own component. A depth-first
//!    post-order walk from every root yields successors before predecessors,
//!    and each node needs a single evaluation.
//! 2. Otherwise, collapse strongly connected components into a condensation
//!    DAG and walk that in post-order from every root. Each component is
//!    solved as one fixed-point problem after every component it has an edge
//!    into.
//! 3. A component that times out aborts the whole run; nothing computed so
//!    far is returned.

use indexmap::IndexMap;
use num_traits::One;
use petgraph::algo::{condensation, is_cyclic_directed};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::DfsPostOrder;
use petgraph::Direction;
use serde::Serialize;
use tracing::{debug, info};

use super::model::GameGraph;
use super::node::{NodeId, Rational};
use crate::config::SolverConfig;
use crate::error::SolveError;
use crate::solver::{PrecisionWarning, Termination, ValueSolver, ValueTable};

/// Components in the order they must be solved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolvePlan {
    /// Whether the graph had no cycle, so every component is a singleton.
    pub acyclic: bool,

    /// Components, each listed after every component it depends on.
    pub components: Vec<Vec<NodeId>>,
}

/// Counters for one solve run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SolveStats {
    pub acyclic: bool,
    pub components: usize,
    pub largest_component: usize,
    pub sweeps: u64,
    pub exact_snapshots: usize,
}

/// Values of a fully solved graph.
#[derive(Debug, Clone)]
pub struct Solution {
    values: ValueTable,
    stats: SolveStats,
    warnings: Vec<PrecisionWarning>,
}

impl Solution {
    pub fn values(&self) -> &ValueTable {
        &self.values
    }

    /// Value of a node of the solved graph.
    pub fn value(&self, id: NodeId) -> Option<&Rational> {
        self.values.get(id)
    }

    /// Value of a producer state, following merges and pruning.
    pub fn state_value(&self, graph: &GameGraph, state: u64) -> Option<Rational> {
        let id = graph.node_for_state(state)?;
        if graph.contains(id) {
            self.values.get(id).cloned()
        } else {
            graph.pruned_payoff(id).cloned()
        }
    }

    pub fn stats(&self) -> &SolveStats {
        &self.stats
    }

    /// Components whose exactness rests on a capped denominator bound.
    pub fn warnings(&self) -> &[PrecisionWarning] {
        &self.warnings
    }

    /// Whether every value carries the full exactness guarantee.
    pub fn is_exact(&self) -> bool {
        self.warnings.is_empty()
    }

    /// Whether the game is won by the maximizer with certainty from `id`.
    pub fn is_sure_win(&self, id: NodeId) -> bool {
        self.value(id).is_some_and(One::is_one)
    }
}

/// Solves a game graph component by component.
#[derive(Debug, Clone, Default)]
pub struct ComponentScheduler {
    config: SolverConfig,
}

impl ComponentScheduler {
    /// Create a new scheduler.
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }

    /// Compute the order in which components must be solved.
    pub fn plan(&self, graph: &GameGraph) -> SolvePlan {
        let mut index: IndexMap<NodeId, NodeIndex> = IndexMap::new();
        let mut digraph: DiGraph<NodeId, ()> =
            DiGraph::with_capacity(graph.node_count(), graph.edge_count());
        for id in graph.node_ids() {
            index.insert(id, digraph.add_node(id));
        }
        for node in graph.nodes() {
            for succ in node.successors().keys() {
                digraph.add_edge(index[&node.id()], index[succ], ());
            }
        }

        if !is_cyclic_directed(&digraph) {
            let components = post_order(&digraph)
                .into_iter()
                .map(|ix| vec![digraph[ix]])
                .collect();
            return SolvePlan {
                acyclic: true,
                components,
            };
        }

        let condensed = condensation(digraph, true);
        let components = post_order(&condensed)
            .into_iter()
            .map(|ix| {
                let mut members = condensed[ix].clone();
                members.sort();
                members
            })
            .collect();
        SolvePlan {
            acyclic: false,
            components,
        }
    }

    /// Solve every component in dependency order.
    ///
    /// On timeout the error is returned and no values are reported, including
    /// for components that were already solved.
    pub fn solve(&self, graph: &GameGraph) -> Result<Solution, SolveError> {
        let plan = self.plan(graph);
        let approximant = self.config.build_approximant();
        let solver = ValueSolver::new(graph, &self.config, approximant.as_ref());
        let mut values = ValueTable::from_graph(graph);

        let mut stats = SolveStats {
            acyclic: plan.acyclic,
            components: plan.components.len(),
            ..SolveStats::default()
        };
        let mut warnings = Vec::new();

        for component in &plan.components {
            let outcome = solver.solve(&mut values, component)?;
            debug!(
                size = component.len(),
                sweeps = outcome.sweeps,
                termination = ?outcome.termination,
                "component solved"
            );
            stats.largest_component = stats.largest_component.max(component.len());
            stats.sweeps += outcome.sweeps;
            if outcome.termination == Termination::ExactFixedPointFound {
                stats.exact_snapshots += 1;
            }
            warnings.extend(outcome.warning);
        }

        info!(
            acyclic = stats.acyclic,
            components = stats.components,
            largest = stats.largest_component,
            sweeps = stats.sweeps,
            warnings = warnings.len(),
            "game solved"
        );
        Ok(Solution {
            values,
            stats,
            warnings,
        })
    }
}

/// Depth-first post-order from every root, so each node comes after all of
/// its successors.
fn post_order<N, E>(graph: &DiGraph<N, E>) -> Vec<NodeIndex> {
    let mut order = Vec::with_capacity(graph.node_count());
    let mut dfs = DfsPostOrder::empty(graph);
    for root in graph.externals(Direction::Incoming) {
        dfs.move_to(root);
        while let Some(ix) = dfs.next(graph) {
            order.push(ix);
        }
    }
    order
}
