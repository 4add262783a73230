//! Fixed-Point Solver
//!
//! Exact value iteration for one component at a time, plus the
//! nearest-fraction searches it uses to jump to an exact answer.

mod approx;
mod value;

pub use approx::{
    denominator_bound, limit_denominator, Approximant, DenominatorBound, FractionTable,
    SternBrocot,
};
pub use value::{PrecisionWarning, SolveOutcome, Termination, ValueSolver, ValueTable};
