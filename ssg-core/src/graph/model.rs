//! Game Graph
//!
//! Arena of typed nodes with weighted directed edges. Nodes are never moved;
//! removal leaves an empty slot so that `NodeId`s stay stable. Contraction
//! records the surviving node in a representative table, so a producer state
//! can still be resolved after its node has been merged away.

use indexmap::IndexMap;
use num_traits::{One, Zero};
use serde::Serialize;

use super::node::{Label, Node, NodeId, Rational};

/// Merge table mapping every node to the node that absorbed it.
///
/// Unlike a rank-balanced union-find, the survivor of a merge is chosen by the
/// caller, so representatives are always live nodes.
#[derive(Debug, Clone, Default)]
struct Representatives {
    parent: Vec<NodeId>,
}

impl Representatives {
    fn push(&mut self, id: NodeId) {
        self.parent.push(id);
    }

    fn find(&self, mut id: NodeId) -> NodeId {
        while self.parent[id.index()] != id {
            id = self.parent[id.index()];
        }
        id
    }

    fn merge_into(&mut self, keep: NodeId, drop: NodeId) {
        let root = self.find(keep);
        self.parent[drop.index()] = root;
    }
}

/// Number of live nodes per label.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LabelCounts {
    pub max: usize,
    pub min: usize,
    pub average: usize,
    pub sink_zero: usize,
    pub sink_one: usize,
}

/// A simple stochastic game graph.
#[derive(Debug, Clone, Default)]
pub struct GameGraph {
    /// Node arena; `None` marks a removed node.
    nodes: Vec<Option<Node>>,

    /// Producer state id to the node created for it.
    states: IndexMap<u64, NodeId>,

    representatives: Representatives,

    /// Payoffs of sinks removed by pruning, so their states stay resolvable.
    pruned: IndexMap<NodeId, Rational>,
}

impl GameGraph {
    /// Create a new empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node with no edges.
    pub fn add_node(&mut self, label: Label) -> NodeId {
        let id = NodeId::from(self.nodes.len());
        self.nodes.push(Some(Node::new(id, label)));
        self.representatives.push(id);
        id
    }

    /// Add a sink with payoff 1 (`true`) or 0 (`false`).
    pub fn add_sink(&mut self, payoff: bool) -> NodeId {
        let id = self.add_node(Label::Sink);
        let value = if payoff { Rational::one() } else { Rational::zero() };
        self.set_known(id, Some(value));
        id
    }

    /// Get a reference to a live node.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index()).and_then(Option::as_ref)
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.index()).and_then(Option::as_mut)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    /// Set the value known before solving.
    pub fn set_known(&mut self, id: NodeId, value: Option<Rational>) {
        if let Some(node) = self.node_mut(id) {
            node.set_known(value);
        }
    }

    /// Live node ids in arena order.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes().map(Node::id)
    }

    /// Live nodes in arena order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> + '_ {
        self.nodes.iter().filter_map(Option::as_ref)
    }

    /// Size of the arena, including removed slots.
    pub fn capacity(&self) -> usize {
        self.nodes.len()
    }

    pub fn node_count(&self) -> usize {
        self.nodes().count()
    }

    pub fn edge_count(&self) -> usize {
        self.nodes().map(Node::out_degree).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.node_count() == 0
    }

    /// Add an edge `from -> to`, replacing the weight of an existing one.
    pub fn add_edge(&mut self, from: NodeId, to: NodeId, weight: Rational) {
        if !self.contains(from) || !self.contains(to) {
            return;
        }
        if let Some(node) = self.node_mut(from) {
            node.successors_mut().insert(to, weight);
        }
        if let Some(node) = self.node_mut(to) {
            node.add_predecessor(from);
        }
    }

    /// Add an edge `from -> to`, summing with the weight of an existing one.
    fn add_or_merge_edge(&mut self, from: NodeId, to: NodeId, weight: Rational) {
        let merged = match self.node(from).and_then(|n| n.weight_to(to)) {
            Some(existing) => existing + weight,
            None => weight,
        };
        self.add_edge(from, to, merged);
    }

    /// Remove an edge, returning its weight.
    pub fn remove_edge(&mut self, from: NodeId, to: NodeId) -> Option<Rational> {
        let weight = self
            .node_mut(from)
            .and_then(|n| n.successors_mut().shift_remove(&to))?;
        if let Some(node) = self.node_mut(to) {
            node.remove_predecessor(from);
        }
        Some(weight)
    }

    /// Remove every outgoing edge of `id`.
    pub fn clear_successors(&mut self, id: NodeId) {
        let successors: Vec<NodeId> = match self.node(id) {
            Some(node) => node.successors().keys().copied().collect(),
            None => return,
        };
        for succ in successors {
            self.remove_edge(id, succ);
        }
    }

    /// Replace the weight of an existing edge.
    pub(crate) fn set_weight(&mut self, from: NodeId, to: NodeId, weight: Rational) {
        if let Some(slot) = self
            .node_mut(from)
            .and_then(|n| n.successors_mut().get_mut(&to))
        {
            *slot = weight;
        }
    }

    pub(crate) fn set_label(&mut self, id: NodeId, label: Label) {
        if let Some(node) = self.node_mut(id) {
            node.set_label(label);
        }
    }

    /// Remove a node and all edges involving it.
    pub fn remove_node(&mut self, id: NodeId) {
        let Some(node) = self.nodes.get_mut(id.index()).and_then(Option::take) else {
            return;
        };
        for succ in node.successors().keys() {
            if let Some(other) = self.node_mut(*succ) {
                other.remove_predecessor(id);
            }
        }
        for pred in node.predecessors() {
            if let Some(other) = self.node_mut(*pred) {
                other.successors_mut().shift_remove(&id);
            }
        }
        if node.is_sink() {
            if let Some(payoff) = node.known() {
                self.pruned.insert(id, payoff.clone());
            }
        }
    }

    /// Merge `drop` into `keep`.
    ///
    /// Every edge into `drop` is redirected to `keep`; when a predecessor
    /// already has an edge to `keep` the two weights are summed. The outgoing
    /// edges of `drop` are discarded, so the caller must only contract nodes
    /// that are behaviourally equivalent.
    pub fn contract(&mut self, keep: NodeId, drop: NodeId) {
        if keep == drop || !self.contains(keep) {
            return;
        }
        let incoming: Vec<(NodeId, Rational)> = match self.node(drop) {
            Some(node) => node
                .predecessors()
                .iter()
                .filter_map(|&pred| {
                    self.node(pred)
                        .and_then(|p| p.weight_to(drop))
                        .map(|w| (pred, w.clone()))
                })
                .collect(),
            None => return,
        };

        self.clear_successors(drop);
        for (pred, _) in &incoming {
            self.remove_edge(*pred, drop);
        }
        for (pred, weight) in incoming {
            let pred = if pred == drop { keep } else { pred };
            self.add_or_merge_edge(pred, keep, weight);
        }

        self.nodes[drop.index()] = None;
        self.representatives.merge_into(keep, drop);
    }

    /// The live node that now stands for `id`.
    pub fn representative(&self, id: NodeId) -> NodeId {
        self.representatives.find(id)
    }

    /// Record that producer state `state` is modelled by `id`.
    pub fn bind_state(&mut self, state: u64, id: NodeId) {
        self.states.insert(state, id);
    }

    /// Node currently standing for producer state `state`.
    pub fn node_for_state(&self, state: u64) -> Option<NodeId> {
        self.states.get(&state).map(|&id| self.representative(id))
    }

    /// Producer states in binding order.
    pub fn states(&self) -> impl Iterator<Item = u64> + '_ {
        self.states.keys().copied()
    }

    /// Payoff of a sink removed by pruning.
    pub fn pruned_payoff(&self, id: NodeId) -> Option<&Rational> {
        self.pruned.get(&id)
    }

    /// Nodes with no predecessors.
    pub fn roots(&self) -> Vec<NodeId> {
        self.nodes()
            .filter(|n| n.in_degree() == 0)
            .map(Node::id)
            .collect()
    }

    pub fn label_counts(&self) -> LabelCounts {
        let mut counts = LabelCounts::default();
        for node in self.nodes() {
            match node.label() {
                Label::Max => counts.max += 1,
                Label::Min => counts.min += 1,
                Label::Average => counts.average += 1,
                Label::Sink => {
                    if node.known().is_some_and(One::is_one) {
                        counts.sink_one += 1;
                    } else {
                        counts.sink_zero += 1;
                    }
                }
            }
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigInt;

    fn ratio(n: i64, d: i64) -> Rational {
        Rational::new(BigInt::from(n), BigInt::from(d))
    }

    #[test]
    fn add_and_remove_nodes() {
        let mut graph = GameGraph::new();
        let a = graph.add_node(Label::Max);
        let s = graph.add_sink(true);
        graph.add_edge(a, s, ratio(1, 1));

        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 1);

        graph.remove_node(s);
        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.edge_count(), 0);
        assert!(graph.node(s).is_none());
        assert_eq!(graph.pruned_payoff(s), Some(&ratio(1, 1)));
    }

    #[test]
    fn add_and_remove_edges() {
        let mut graph = GameGraph::new();
        let a = graph.add_node(Label::Average);
        let b = graph.add_sink(false);
        graph.add_edge(a, b, ratio(1, 2));

        assert!(graph.node(a).unwrap().successors().contains_key(&b));
        assert!(graph.node(b).unwrap().predecessors().contains(&a));

        assert_eq!(graph.remove_edge(a, b), Some(ratio(1, 2)));
        assert!(!graph.node(a).unwrap().successors().contains_key(&b));
        assert!(!graph.node(b).unwrap().predecessors().contains(&a));
    }

    #[test]
    fn contract_sums_parallel_weights() {
        let mut graph = GameGraph::new();
        let avg = graph.add_node(Label::Average);
        let s1 = graph.add_sink(true);
        let s2 = graph.add_sink(true);
        let s0 = graph.add_sink(false);
        graph.add_edge(avg, s1, ratio(1, 4));
        graph.add_edge(avg, s2, ratio(1, 4));
        graph.add_edge(avg, s0, ratio(1, 2));

        graph.contract(s1, s2);

        let node = graph.node(avg).unwrap();
        assert_eq!(node.weight_to(s1), Some(&ratio(1, 2)));
        assert_eq!(node.weight_sum(), ratio(1, 1));
        assert!(!graph.contains(s2));
        assert_eq!(graph.representative(s2), s1);
    }

    #[test]
    fn states_follow_contraction_chains() {
        let mut graph = GameGraph::new();
        let a = graph.add_node(Label::Max);
        let b = graph.add_node(Label::Max);
        let c = graph.add_node(Label::Max);
        graph.bind_state(7, a);

        graph.contract(b, a);
        graph.contract(c, b);

        assert_eq!(graph.node_for_state(7), Some(c));
        assert_eq!(graph.node_for_state(8), None);
    }

    #[test]
    fn label_counts_split_sinks_by_payoff() {
        let mut graph = GameGraph::new();
        graph.add_node(Label::Max);
        graph.add_node(Label::Average);
        graph.add_sink(true);
        graph.add_sink(false);
        graph.add_sink(false);

        let counts = graph.label_counts();
        assert_eq!(counts.max, 1);
        assert_eq!(counts.min, 0);
        assert_eq!(counts.average, 1);
        assert_eq!(counts.sink_one, 1);
        assert_eq!(counts.sink_zero, 2);
    }
}
