//! Value Iteration
//!
//! The fixed-point engine for one component. Sweeps update every node of the
//! component in place (Gauss–Seidel order), so later nodes in a sweep already
//! see the values computed earlier in the same sweep. All arithmetic is exact.
//!
//! Exact iteration on a cycle converges only in the limit, so every
//! `check_interval` sweeps the solver tries a shortcut: snap each value to the
//! nearest fraction with a bounded denominator, run one verification sweep on
//! the snapped vector, and accept it if nothing moves. A snapped vector that
//! survives a sweep unchanged is an exact fixed point.

use std::ops::Index;
use std::time::Instant;

use num_traits::Zero;
use serde::Serialize;
use tracing::{debug, warn};

use super::approx::{denominator_bound, Approximant, DenominatorBound};
use crate::config::SolverConfig;
use crate::error::SolveError;
use crate::graph::{GameGraph, Label, NodeId, Rational};

/// Current value of every node, indexed by arena slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueTable {
    values: Vec<Rational>,
}

impl ValueTable {
    /// Start from known values; everything else starts at 0.
    pub fn from_graph(graph: &GameGraph) -> Self {
        let mut values = vec![Rational::zero(); graph.capacity()];
        for node in graph.nodes() {
            if let Some(known) = node.known() {
                values[node.id().index()] = known.clone();
            }
        }
        Self { values }
    }

    pub fn get(&self, id: NodeId) -> Option<&Rational> {
        self.values.get(id.index())
    }

    pub fn set(&mut self, id: NodeId, value: Rational) {
        self.values[id.index()] = value;
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Index<NodeId> for ValueTable {
    type Output = Rational;

    fn index(&self, id: NodeId) -> &Rational {
        &self.values[id.index()]
    }
}

/// How a component's solve ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// A sweep changed nothing.
    Converged,

    /// A snapped vector survived a verification sweep.
    ExactFixedPointFound,
}

/// Exactness caveat for a component solved through a capped bound.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrecisionWarning {
    pub component_size: usize,
    pub denominator_cap: u64,
}

/// Result of a successful [`ValueSolver::solve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolveOutcome {
    pub termination: Termination,
    pub sweeps: u64,
    pub warning: Option<PrecisionWarning>,
}

/// Fixed-point engine over one graph.
pub struct ValueSolver<'a> {
    graph: &'a GameGraph,
    config: &'a SolverConfig,
    approximant: &'a dyn Approximant,
}

impl<'a> ValueSolver<'a> {
    pub fn new(
        graph: &'a GameGraph,
        config: &'a SolverConfig,
        approximant: &'a dyn Approximant,
    ) -> Self {
        Self {
            graph,
            config,
            approximant,
        }
    }

    /// Value of `id` after one application of its operator to the current
    /// successor values. `None` when the node has nothing to compute from.
    pub fn one_step(&self, values: &ValueTable, id: NodeId) -> Option<Rational> {
        let node = self.graph.node(id)?;
        let succ_values = node.successors().keys().map(|&s| &values[s]);
        match node.label() {
            Label::Sink => node.known().cloned(),
            Label::Max => succ_values.max().cloned(),
            Label::Min => succ_values.min().cloned(),
            Label::Average => Some(
                node.successors()
                    .iter()
                    .fold(Rational::zero(), |acc, (&s, w)| acc + w * &values[s]),
            ),
        }
    }

    /// Apply [`Self::one_step`] once to every node, in order, in place.
    /// Returns whether any value changed.
    pub fn sweep(&self, values: &mut ValueTable, nodes: &[NodeId]) -> bool {
        let mut changed = false;
        for &id in nodes {
            if let Some(next) = self.one_step(values, id) {
                if next != values[id] {
                    values.set(id, next);
                    changed = true;
                }
            }
        }
        changed
    }

    /// Iterate the component `nodes` to a fixed point, writing the result
    /// into `values`. Fails with [`SolveError::Timeout`] once the time
    /// budget is spent; the values of `nodes` are then meaningless.
    pub fn solve(
        &self,
        values: &mut ValueTable,
        nodes: &[NodeId],
    ) -> Result<SolveOutcome, SolveError> {
        let started = Instant::now();
        let timeout = self.config.timeout();
        let interval = u64::from(self.config.check_interval);
        let mut bound: Option<DenominatorBound> = None;
        let mut sweeps = 0u64;

        loop {
            let elapsed = started.elapsed();
            if elapsed >= timeout {
                return Err(SolveError::Timeout {
                    component_size: nodes.len(),
                    elapsed,
                });
            }

            sweeps += 1;
            let changed = self.sweep(values, nodes);

            if interval > 0 && sweeps % interval == 0 {
                let bound = *bound.get_or_insert_with(|| {
                    denominator_bound(self.graph, nodes, self.config.denominator_cap)
                });
                if self.try_exact(values, nodes, bound.value) {
                    let warning = bound.capped.then(|| PrecisionWarning {
                        component_size: nodes.len(),
                        denominator_cap: bound.value,
                    });
                    if let Some(warning) = &warning {
                        warn!(
                            component_size = warning.component_size,
                            cap = warning.denominator_cap,
                            "exact snapshot accepted under a capped denominator bound"
                        );
                    }
                    return Ok(SolveOutcome {
                        termination: Termination::ExactFixedPointFound,
                        sweeps,
                        warning,
                    });
                }
            }

            if !changed {
                return Ok(SolveOutcome {
                    termination: Termination::Converged,
                    sweeps,
                    warning: None,
                });
            }
        }
    }

    /// Snap every non-sink value of `nodes` and keep the snapped vector if it
    /// is a fixed point. Otherwise restore the previous values.
    fn try_exact(&self, values: &mut ValueTable, nodes: &[NodeId], bound: u64) -> bool {
        let saved: Vec<Rational> = nodes.iter().map(|&id| values[id].clone()).collect();

        for &id in nodes {
            let is_sink = self.graph.node(id).is_some_and(|n| n.is_sink());
            if !is_sink {
                let snapped = self.approximant.nearest(&values[id], bound);
                values.set(id, snapped);
            }
        }

        // read-only: a fixed point is also unchanged by an in-place sweep
        let exact = nodes.iter().all(|&id| match self.one_step(values, id) {
            Some(next) => next == values[id],
            None => true,
        });

        if !exact {
            for (&id, value) in nodes.iter().zip(saved) {
                values.set(id, value);
            }
        }
        debug!(size = nodes.len(), bound, exact, "exact snapshot check");
        exact
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::{FractionTable, SternBrocot};
    use num_bigint::BigInt;

    fn ratio(n: i64, d: i64) -> Rational {
        Rational::new(BigInt::from(n), BigInt::from(d))
    }

    fn two_cycle() -> (GameGraph, NodeId, NodeId) {
        let mut graph = GameGraph::new();
        let s0 = graph.add_sink(false);
        let s1 = graph.add_sink(true);
        let a = graph.add_node(Label::Average);
        let b = graph.add_node(Label::Average);
        graph.add_edge(a, s1, ratio(1, 2));
        graph.add_edge(a, b, ratio(1, 2));
        graph.add_edge(b, s0, ratio(1, 2));
        graph.add_edge(b, a, ratio(1, 2));
        (graph, a, b)
    }

    #[test]
    fn one_step_operators() {
        let mut graph = GameGraph::new();
        let s0 = graph.add_sink(false);
        let s1 = graph.add_sink(true);
        let avg = graph.add_node(Label::Average);
        let max = graph.add_node(Label::Max);
        let min = graph.add_node(Label::Min);
        graph.add_edge(avg, s0, ratio(1, 3));
        graph.add_edge(avg, s1, ratio(2, 3));
        graph.add_edge(max, avg, ratio(1, 1));
        graph.add_edge(max, s0, ratio(1, 1));
        graph.add_edge(min, avg, ratio(1, 1));
        graph.add_edge(min, s1, ratio(1, 1));

        let config = SolverConfig::default();
        let solver = ValueSolver::new(&graph, &config, &SternBrocot);
        let mut values = ValueTable::from_graph(&graph);

        assert_eq!(solver.one_step(&values, avg), Some(ratio(2, 3)));
        values.set(avg, ratio(2, 3));
        assert_eq!(solver.one_step(&values, max), Some(ratio(2, 3)));
        assert_eq!(solver.one_step(&values, min), Some(ratio(2, 3)));
        assert_eq!(solver.one_step(&values, s1), Some(ratio(1, 1)));
    }

    #[test]
    fn max_without_successors_keeps_value() {
        let mut graph = GameGraph::new();
        let max = graph.add_node(Label::Max);
        let config = SolverConfig::default();
        let solver = ValueSolver::new(&graph, &config, &SternBrocot);
        let mut values = ValueTable::from_graph(&graph);

        assert_eq!(solver.one_step(&values, max), None);
        let outcome = solver.solve(&mut values, &[max]).unwrap();
        assert_eq!(outcome.termination, Termination::Converged);
        assert_eq!(values[max], ratio(0, 1));
    }

    #[test]
    fn sweep_is_gauss_seidel() {
        let mut graph = GameGraph::new();
        let s1 = graph.add_sink(true);
        let a = graph.add_node(Label::Max);
        let b = graph.add_node(Label::Max);
        graph.add_edge(a, s1, ratio(1, 1));
        graph.add_edge(b, a, ratio(1, 1));

        let config = SolverConfig::default();
        let solver = ValueSolver::new(&graph, &config, &SternBrocot);
        let mut values = ValueTable::from_graph(&graph);

        assert!(solver.sweep(&mut values, &[a, b]));
        // b already saw a's new value within the same sweep
        assert_eq!(values[b], ratio(1, 1));
        assert!(!solver.sweep(&mut values, &[a, b]));
    }

    #[test]
    fn two_cycle_reaches_exact_fixed_point() {
        let (graph, a, b) = two_cycle();
        let config = SolverConfig::default();
        let solver = ValueSolver::new(&graph, &config, &SternBrocot);
        let mut values = ValueTable::from_graph(&graph);

        let outcome = solver.solve(&mut values, &[a, b]).unwrap();

        assert_eq!(outcome.termination, Termination::ExactFixedPointFound);
        assert_eq!(outcome.sweeps, 50);
        assert_eq!(outcome.warning, None);
        assert_eq!(values[a], ratio(2, 3));
        assert_eq!(values[b], ratio(1, 3));
    }

    #[test]
    fn two_cycle_with_table_approximant() {
        let (graph, a, b) = two_cycle();
        let config = SolverConfig {
            check_interval: 10,
            ..SolverConfig::default()
        };
        let table = FractionTable::new(100);
        let solver = ValueSolver::new(&graph, &config, &table);
        let mut values = ValueTable::from_graph(&graph);

        let outcome = solver.solve(&mut values, &[a, b]).unwrap();

        assert_eq!(outcome.termination, Termination::ExactFixedPointFound);
        assert_eq!(values[a], ratio(2, 3));
        assert_eq!(values[b], ratio(1, 3));
    }

    #[test]
    fn capped_bound_is_reported() {
        let (graph, a, b) = two_cycle();
        let config = SolverConfig {
            denominator_cap: 3,
            ..SolverConfig::default()
        };
        let solver = ValueSolver::new(&graph, &config, &SternBrocot);
        let mut values = ValueTable::from_graph(&graph);

        let outcome = solver.solve(&mut values, &[a, b]).unwrap();

        assert_eq!(outcome.termination, Termination::ExactFixedPointFound);
        assert_eq!(
            outcome.warning,
            Some(PrecisionWarning {
                component_size: 2,
                denominator_cap: 3
            })
        );
        assert_eq!(values[a], ratio(2, 3));
    }

    #[test]
    fn failed_snapshot_restores_values() {
        let (graph, a, b) = two_cycle();
        let config = SolverConfig::default();
        let solver = ValueSolver::new(&graph, &config, &SternBrocot);
        let mut values = ValueTable::from_graph(&graph);
        solver.sweep(&mut values, &[a, b]);
        let before = values.clone();

        // with denominators capped at 1 every value snaps to 0 or 1
        assert!(!solver.try_exact(&mut values, &[a, b], 1));
        assert_eq!(values, before);
    }

    #[test]
    fn zero_budget_times_out() {
        let (graph, a, b) = two_cycle();
        let config = SolverConfig {
            timeout_secs: 0,
            ..SolverConfig::default()
        };
        let solver = ValueSolver::new(&graph, &config, &SternBrocot);
        let mut values = ValueTable::from_graph(&graph);

        let err = solver.solve(&mut values, &[a, b]).unwrap_err();
        assert!(err.is_timeout());
    }

    #[test]
    fn empty_component_converges_immediately() {
        let (graph, _, _) = two_cycle();
        let config = SolverConfig::default();
        let solver = ValueSolver::new(&graph, &config, &SternBrocot);
        let mut values = ValueTable::from_graph(&graph);

        let outcome = solver.solve(&mut values, &[]).unwrap();
        assert_eq!(outcome.termination, Termination::Converged);
        assert_eq!(outcome.sweeps, 1);
    }
}
