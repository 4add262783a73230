//! Graph Exports
//!
//! Writes the game graph in the two `.gr` formats read by external
//! structure tools. Nodes are numbered from 1 in arena order; removed nodes
//! leave no gaps.

use std::io::{self, Write};

use indexmap::{IndexMap, IndexSet};

use crate::graph::{GameGraph, NodeId};

/// 1-based contiguous index of every live node.
fn contiguous_index(graph: &GameGraph) -> IndexMap<NodeId, usize> {
    graph
        .node_ids()
        .enumerate()
        .map(|(i, id)| (id, i + 1))
        .collect()
}

/// Edges of the underlying undirected graph, each listed once from the
/// endpoint with the smaller index.
///
/// A node lists its own successors first, in edge order, then the remaining
/// later predecessors by index.
fn undirected_edges(graph: &GameGraph, index: &IndexMap<NodeId, usize>) -> Vec<(usize, usize)> {
    let mut edges = Vec::new();
    for node in graph.nodes() {
        let u = index[&node.id()];
        let mut neighbours: IndexSet<usize> = node
            .successors()
            .keys()
            .filter_map(|n| index.get(n).copied())
            .filter(|&v| v >= u)
            .collect();
        let mut later_preds: Vec<usize> = node
            .predecessors()
            .iter()
            .filter_map(|n| index.get(n).copied())
            .filter(|&v| v > u && !neighbours.contains(&v))
            .collect();
        later_preds.sort_unstable();
        neighbours.extend(later_preds);
        edges.extend(neighbours.into_iter().map(|v| (u, v)));
    }
    edges
}

/// Write the undirected export: `p tdp N E`, then one `u v` line per edge.
pub fn write_undirected<W: Write>(graph: &GameGraph, mut out: W) -> io::Result<()> {
    let index = contiguous_index(graph);
    let edges = undirected_edges(graph, &index);

    writeln!(out, "p tdp {} {}", index.len(), edges.len())?;
    for (u, v) in edges {
        writeln!(out, "{u} {v}")?;
    }
    out.flush()
}

/// Write the directed export: `N E0`, then for each node a line with every
/// successor index followed by a space.
pub fn write_directed<W: Write>(graph: &GameGraph, mut out: W) -> io::Result<()> {
    let index = contiguous_index(graph);

    writeln!(out, "{} {}0", index.len(), graph.edge_count())?;
    for node in graph.nodes() {
        for succ in node.successors().keys() {
            write!(out, "{} ", index[succ])?;
        }
        writeln!(out)?;
    }
    out.flush()
}
