//! Game Input and Output
//!
//! Reading the model checker's transition and label files, and writing the
//! `.gr` exports.

mod export;
mod prism;

pub use export::{write_directed, write_undirected};
pub use prism::{
    build_graph, load_game, parse_decimal, parse_labels, parse_transitions, read_game, Choice,
    StateLabel, Transition,
};
