//! Graph Nodes
//!
//! This module defines the node types that live in the game graph.

use std::fmt;

use indexmap::{IndexMap, IndexSet};
use num_rational::BigRational;
use num_traits::{One, Zero};
use serde::{Deserialize, Serialize};

/// Exact rational used for values and edge weights.
pub type Rational = BigRational;

/// Index of a node in the game graph arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

impl NodeId {
    /// Get the raw arena index.
    pub fn index(&self) -> usize {
        self.0
    }
}

impl From<usize> for NodeId {
    fn from(index: usize) -> Self {
        Self(index)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Who decides at a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    /// The maximizer picks the best successor.
    Max,

    /// The minimizer picks the worst successor.
    Min,

    /// Nature picks a successor according to the edge weights.
    Average,

    /// Terminal node with a fixed 0/1 payoff. Has no successors.
    Sink,
}

impl Label {
    /// Parse a label keyword as written by the model checker.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "max" => Some(Label::Max),
            "min" => Some(Label::Min),
            "average" => Some(Label::Average),
            "sink" => Some(Label::Sink),
            _ => None,
        }
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            Label::Max => "max",
            Label::Min => "min",
            Label::Average => "average",
            Label::Sink => "sink",
        }
    }
}

/// A node in the game graph.
#[derive(Debug, Clone)]
pub struct Node {
    /// Arena index of this node.
    id: NodeId,

    /// Which operator computes this node's value.
    label: Label,

    /// Value known before solving. For sinks this is the payoff and never
    /// changes afterwards.
    known: Option<Rational>,

    /// Outgoing edges with their weights, in insertion order.
    successors: IndexMap<NodeId, Rational>,

    /// Nodes with an edge into this one.
    predecessors: IndexSet<NodeId>,
}

impl Node {
    /// Create a new node with the given label and no edges.
    pub fn new(id: NodeId, label: Label) -> Self {
        Self {
            id,
            label,
            known: None,
            successors: IndexMap::new(),
            predecessors: IndexSet::new(),
        }
    }

    /// Get the node's ID.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Get the node's label.
    pub fn label(&self) -> Label {
        self.label
    }

    pub(crate) fn set_label(&mut self, label: Label) {
        self.label = label;
    }

    pub fn is_sink(&self) -> bool {
        self.label == Label::Sink
    }

    /// Value known before solving, if any.
    pub fn known(&self) -> Option<&Rational> {
        self.known.as_ref()
    }

    pub(crate) fn set_known(&mut self, value: Option<Rational>) {
        self.known = value;
    }

    /// Whether the known value is exactly 0 or 1.
    pub fn is_settled(&self) -> bool {
        self.known
            .as_ref()
            .is_some_and(|v| v.is_zero() || v.is_one())
    }

    /// Outgoing edges and their weights.
    pub fn successors(&self) -> &IndexMap<NodeId, Rational> {
        &self.successors
    }

    pub(crate) fn successors_mut(&mut self) -> &mut IndexMap<NodeId, Rational> {
        &mut self.successors
    }

    /// Nodes with an edge into this one.
    pub fn predecessors(&self) -> &IndexSet<NodeId> {
        &self.predecessors
    }

    pub(crate) fn add_predecessor(&mut self, node_id: NodeId) {
        self.predecessors.insert(node_id);
    }

    pub(crate) fn remove_predecessor(&mut self, node_id: NodeId) {
        self.predecessors.shift_remove(&node_id);
    }

    /// Weight of the edge to `succ`, if present.
    pub fn weight_to(&self, succ: NodeId) -> Option<&Rational> {
        self.successors.get(&succ)
    }

    /// Sum of the outgoing edge weights.
    pub fn weight_sum(&self) -> Rational {
        self.successors
            .values()
            .fold(Rational::zero(), |acc, w| acc + w)
    }

    pub fn out_degree(&self) -> usize {
        self.successors.len()
    }

    pub fn in_degree(&self) -> usize {
        self.predecessors.len()
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
    fn label_keywords_round_trip() {
        for label in [Label::Max, Label::Min, Label::Average, Label::Sink] {
            assert_eq!(Label::from_keyword(label.keyword()), Some(label));
        }
        assert_eq!(Label::from_keyword("chance"), None);
    }

    #[test]
    fn settled_only_for_zero_or_one() {
        let mut node = Node::new(NodeId::from(0), Label::Max);
        assert!(!node.is_settled());

        node.set_known(Some(ratio(1, 2)));
        assert!(!node.is_settled());

        node.set_known(Some(ratio(1, 1)));
        assert!(node.is_settled());

        node.set_known(Some(ratio(0, 1)));
        assert!(node.is_settled());
    }

    #[test]
    fn weight_sum_adds_outgoing_edges() {
        let mut node = Node::new(NodeId::from(0), Label::Average);
        node.successors_mut().insert(NodeId::from(1), ratio(1, 3));
        node.successors_mut().insert(NodeId::from(2), ratio(2, 3));

        assert_eq!(node.weight_sum(), ratio(1, 1));
        assert_eq!(node.out_degree(), 2);
        assert_eq!(node.weight_to(NodeId::from(2)), Some(&ratio(2, 3)));
    }
}
