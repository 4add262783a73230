//! Graph Reduction
//!
//! Label-driven passes that shrink the game graph without changing the value
//! of any surviving node. [`GraphReducer::reduce`] runs them in the order
//! the solver expects:
//!
//! 1. Promote nodes whose value is already 0 or 1 to sinks
//! 2. Prune sinks nothing can reach
//! 3. Fuse sinks with the same payoff
//! 4. Fuse non-sink nodes with identical labelled successor multisets
//! 5. Delete self-loops
//! 6. Reset every average node to the uniform distribution
//! 7. Verify that every average node's weights sum to exactly one
//!
//! Steps 1-6 never fail; step 7 is the single post-condition and its failure
//! aborts the analysis.

use indexmap::IndexMap;
use num_bigint::BigInt;
use num_traits::One;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::{debug, info};

use super::model::{GameGraph, LabelCounts};
use super::node::{Label, NodeId, Rational};
use crate::error::ReduceError;

/// Which passes [`GraphReducer::reduce`] runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReduceConfig {
    pub promote_sinks: bool,
    pub prune_sinks: bool,
    pub fuse_nodes: bool,
    pub delete_self_loops: bool,
    pub correct_probabilities: bool,
}

impl Default for ReduceConfig {
    fn default() -> Self {
        Self {
            promote_sinks: true,
            prune_sinks: true,
            fuse_nodes: true,
            delete_self_loops: true,
            correct_probabilities: true,
        }
    }
}

impl ReduceConfig {
    /// Only the probability-law correction, which solving always needs.
    pub fn minimal() -> Self {
        Self {
            promote_sinks: false,
            prune_sinks: false,
            fuse_nodes: false,
            delete_self_loops: false,
            correct_probabilities: true,
        }
    }
}

/// What a reduction run changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReductionStats {
    pub nodes_before: usize,
    pub edges_before: usize,
    pub nodes_after: usize,
    pub edges_after: usize,
    pub promoted: usize,
    pub pruned: usize,
    pub fused_sinks: usize,
    pub fused_nodes: usize,
    pub self_loops: usize,
    pub labels_before: LabelCounts,
    pub labels_after: LabelCounts,
}

/// Equivalence key of a non-sink node: its label and its sorted
/// `(successor, weight)` list.
type FuseKey = (Label, SmallVec<[(NodeId, Rational); 4]>);

/// Runs the reduction passes over a graph in place.
#[derive(Debug, Clone, Default)]
pub struct GraphReducer {
    config: ReduceConfig,
}

impl GraphReducer {
    pub fn new(config: ReduceConfig) -> Self {
        Self { config }
    }

    /// Run every enabled pass, then verify the probability law.
    pub fn reduce(&self, graph: &mut GameGraph) -> Result<ReductionStats, ReduceError> {
        let mut stats = ReductionStats {
            nodes_before: graph.node_count(),
            edges_before: graph.edge_count(),
            labels_before: graph.label_counts(),
            ..ReductionStats::default()
        };

        if self.config.promote_sinks {
            stats.promoted = promote_to_sinks(graph);
        }
        if self.config.prune_sinks {
            stats.pruned = prune_unreachable_sinks(graph);
        }
        if self.config.fuse_nodes {
            stats.fused_sinks = fuse_sinks(graph);
            stats.fused_nodes = fuse_equivalent_nodes(graph);
        }
        if self.config.delete_self_loops {
            stats.self_loops = delete_self_loops(graph);
        }
        if self.config.correct_probabilities {
            correct_probability_law(graph);
        }
        verify_probability_law(graph)?;

        stats.nodes_after = graph.node_count();
        stats.edges_after = graph.edge_count();
        stats.labels_after = graph.label_counts();

        info!(
            nodes_before = stats.nodes_before,
            nodes_after = stats.nodes_after,
            edges_before = stats.edges_before,
            edges_after = stats.edges_after,
            "graph reduced"
        );
        Ok(stats)
    }
}

/// Relabel `id` as a sink and drop its outgoing edges, if its known value is
/// exactly 0 or 1. Returns whether the node changed.
pub fn promote_to_sink(graph: &mut GameGraph, id: NodeId) -> bool {
    let Some(node) = graph.node(id) else {
        return false;
    };
    if !node.is_settled() || (node.is_sink() && node.out_degree() == 0) {
        return false;
    }
    graph.set_label(id, Label::Sink);
    graph.clear_successors(id);
    true
}

/// Apply [`promote_to_sink`] to every node. Returns the number of changes.
pub fn promote_to_sinks(graph: &mut GameGraph) -> usize {
    let ids: Vec<NodeId> = graph.node_ids().collect();
    let promoted = ids
        .into_iter()
        .filter(|&id| promote_to_sink(graph, id))
        .count();
    debug!(promoted, "promoted settled nodes to sinks");
    promoted
}

/// Delete sinks with no predecessor other than themselves.
pub fn prune_unreachable_sinks(graph: &mut GameGraph) -> usize {
    let orphans: Vec<NodeId> = graph
        .nodes()
        .filter(|n| n.is_sink())
        .filter(|n| n.predecessors().iter().all(|&p| p == n.id()))
        .map(|n| n.id())
        .collect();
    for &id in &orphans {
        graph.remove_node(id);
    }
    debug!(pruned = orphans.len(), "pruned unreachable sinks");
    orphans.len()
}

/// Merge sinks that share a payoff. Returns the number of merges.
pub fn fuse_sinks(graph: &mut GameGraph) -> usize {
    let mut survivors: IndexMap<Rational, NodeId> = IndexMap::new();
    let mut merges = Vec::new();
    for node in graph.nodes().filter(|n| n.is_sink()) {
        let Some(payoff) = node.known() else {
            continue;
        };
        match survivors.get(payoff) {
            Some(&keep) => merges.push((keep, node.id())),
            None => {
                survivors.insert(payoff.clone(), node.id());
            }
        }
    }
    for &(keep, drop) in &merges {
        graph.contract(keep, drop);
    }
    debug!(fused = merges.len(), "fused sinks");
    merges.len()
}

fn fuse_key(graph: &GameGraph, id: NodeId) -> Option<FuseKey> {
    let node = graph.node(id)?;
    if node.is_sink() {
        return None;
    }
    let mut edges: SmallVec<[(NodeId, Rational); 4]> = node
        .successors()
        .iter()
        .map(|(&succ, w)| (succ, w.clone()))
        .collect();
    edges.sort();
    Some((node.label(), edges))
}

/// Merge non-sink nodes with the same label and the same outgoing
/// `(successor, weight)` multiset, until no two such nodes remain.
///
/// Merging rewrites predecessors' successor lists, which can make them
/// equivalent in turn, hence the outer loop.
pub fn fuse_equivalent_nodes(graph: &mut GameGraph) -> usize {
    let mut total = 0;
    loop {
        let mut survivors: IndexMap<FuseKey, NodeId> = IndexMap::new();
        let mut merges = Vec::new();
        for id in graph.node_ids() {
            let Some(key) = fuse_key(graph, id) else {
                continue;
            };
            match survivors.get(&key) {
                Some(&keep) => merges.push((keep, id)),
                None => {
                    survivors.insert(key, id);
                }
            }
        }
        if merges.is_empty() {
            break;
        }
        for &(keep, drop) in &merges {
            graph.contract(keep, drop);
        }
        total += merges.len();
    }
    debug!(fused = total, "fused equivalent nodes");
    total
}

/// Remove every edge from a node to itself.
pub fn delete_self_loops(graph: &mut GameGraph) -> usize {
    let looped: Vec<NodeId> = graph
        .nodes()
        .filter(|n| n.successors().contains_key(&n.id()))
        .map(|n| n.id())
        .collect();
    for &id in &looped {
        graph.remove_edge(id, id);
    }
    looped.len()
}

/// Give every average node the uniform distribution over its successors.
///
/// Applied whether or not the weights already sum to one: the producer's
/// rounded probabilities are not trusted.
pub fn correct_probability_law(graph: &mut GameGraph) {
    let averages: Vec<(NodeId, Vec<NodeId>)> = graph
        .nodes()
        .filter(|n| n.label() == Label::Average && n.out_degree() > 0)
        .map(|n| (n.id(), n.successors().keys().copied().collect()))
        .collect();
    for (id, successors) in averages {
        let uniform = Rational::new(BigInt::one(), BigInt::from(successors.len()));
        for succ in successors {
            graph.set_weight(id, succ, uniform.clone());
        }
    }
}

/// Check that every average node's outgoing weights sum to exactly one.
pub fn verify_probability_law(graph: &GameGraph) -> Result<(), ReduceError> {
    for node in graph.nodes().filter(|n| n.label() == Label::Average) {
        let sum = node.weight_sum();
        if !sum.is_one() {
            return Err(ReduceError::ProbabilityLaw { node: node.id(), sum });
        }
    }
    Ok(())
}
