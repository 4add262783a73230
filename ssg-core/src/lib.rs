//! SSG Core
//!
//! This crate computes the exact value of every state of a simple stochastic
//! game: a finite, turn-based, two-player game on a directed graph whose
//! nodes are Max, Min, Average or Sink.
//!
//! It implements:
//!
//! - Parsing of model checker transition and label files
//! - Value-preserving graph reduction (sink promotion, pruning, node fusion)
//! - Component-wise exact value iteration with rational snapping
//! - Export of the graph structure for external treewidth tools
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `graph`: The game graph, the reducer and the component scheduler
//! - `solver`: The fixed-point engine and nearest-fraction searches
//! - `io`: Input parsing and `.gr` export
//! - `config`: Tunables for reduction and solving
//! - `error`: Error types
//!
//! # Example
//!
//! ```rust,ignore
//! use ssg_core::{analyze, io, Config};
//!
//! let mut graph = io::load_game("transitions.txt".as_ref(), "info.txt".as_ref())?;
//! let analysis = analyze(&mut graph, &Config::default())?;
//!
//! for state in graph.states() {
//!     if let Some(value) = analysis.solution.state_value(&graph, state) {
//!         println!("{state} {value}");
//!     }
//! }
//! ```

pub mod config;
pub mod error;
pub mod graph;
pub mod io;
pub mod solver;

pub use config::{ApproximantKind, Config, SolverConfig};
pub use error::{InputError, ReduceError, SolveError};
pub use graph::{GameGraph, Label, NodeId, Rational, ReduceConfig, ReductionStats, Solution};

use graph::{ComponentScheduler, GraphReducer};

/// Outcome of a full analysis run.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub reduction: ReductionStats,
    pub solution: Solution,
}

/// Reduce `graph` in place, then solve it.
pub fn analyze(graph: &mut GameGraph, config: &Config) -> Result<Analysis, SolveError> {
    let reduction = GraphReducer::new(config.reduce).reduce(graph)?;
    let solution = ComponentScheduler::new(config.solver.clone()).solve(graph)?;
    Ok(Analysis {
        reduction,
        solution,
    })
}
