//! Error Types
//!
//! Every fatal condition of an analysis run. Precision warnings are not
//! errors; see [`crate::solver::PrecisionWarning`].

use std::time::Duration;

use num_rational::BigRational;

use crate::graph::NodeId;

/// Malformed or inconsistent producer input.
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    /// Reading one of the input files failed.
    #[error("failed to read input: {0}")]
    Io(#[from] std::io::Error),

    /// A token could not be parsed as the expected kind of number.
    #[error("line {line}: invalid {expected} token `{token}`")]
    InvalidToken {
        line: usize,
        expected: &'static str,
        token: String,
    },

    /// A probability group ended without its successor.
    #[error("line {line}: dangling probability without successor")]
    DanglingProbability { line: usize },

    /// A label keyword other than max/min/average/sink.
    #[error("line {line}: unknown label `{label}`")]
    UnknownLabel { line: usize, label: String },

    /// A value other than -1, 0 or 1.
    #[error("line {line}: value must be -1, 0 or 1, got `{value}`")]
    InvalidValue { line: usize, value: String },

    /// A sink without a terminal payoff.
    #[error("state {state} is a sink without a 0/1 value")]
    SinkWithoutPayoff { state: u64 },

    /// The transition list mentions a state the label file never labels.
    #[error("state {state} has no label")]
    MissingLabel { state: u64 },
}

/// Post-reduction consistency failure.
#[derive(Debug, thiserror::Error)]
pub enum ReduceError {
    /// An average node's outgoing weights do not sum to exactly one.
    #[error("probability law violated at {node:?}: outgoing weights sum to {sum}")]
    ProbabilityLaw { node: NodeId, sum: BigRational },
}

/// Any failure of a full analysis run.
#[derive(Debug, thiserror::Error)]
pub enum SolveError {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Reduce(#[from] ReduceError),

    /// A component's fixed-point search ran out of time.
    #[error("component of {component_size} node(s) timed out after {elapsed:?}")]
    Timeout {
        component_size: usize,
        elapsed: Duration,
    },
}

impl SolveError {
    /// Whether this is a time budget failure rather than bad input.
    pub fn is_timeout(&self) -> bool {
        matches!(self, SolveError::Timeout { .. })
    }
}
