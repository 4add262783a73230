//! Game Graph
//!
//! This module implements the typed game graph and the two passes that run
//! over it before values are computed.
//!
//! # Overview
//!
//! The graph is a directed graph where:
//!
//! - Nodes are labelled Max, Min, Average or Sink
//! - An edge `u -> v` means `v` is a possible successor of `u`; its weight is
//!   a probability when `u` is an Average node and is ignored otherwise
//!
//! The reducer shrinks the graph without changing any surviving node's value.
//! The scheduler then splits the reduced graph into strongly connected
//! components and solves them leaves first.
//!
//! # Design Decisions
//!
//! 1. Nodes live in an arena indexed by `NodeId`. Removal leaves a hole, so
//!    ids stay valid for the lifetime of the graph.
//!
//! 2. Merged nodes are tracked in a representative table instead of being
//!    rewritten, which keeps every producer state resolvable.
//!
//! 3. Each node stores both successors (with weights) and predecessors, so
//!    contraction and pruning never need a full scan.

mod model;
mod node;
mod reduce;
mod scheduler;

pub use model::{GameGraph, LabelCounts};
pub use node::{Label, Node, NodeId, Rational};
pub use reduce::{
    correct_probability_law, delete_self_loops, fuse_equivalent_nodes, fuse_sinks,
    promote_to_sink, promote_to_sinks, prune_unreachable_sinks, verify_probability_law,
    GraphReducer, ReduceConfig, ReductionStats,
};
pub use scheduler::{ComponentScheduler, Solution, SolvePlan, SolveStats};
