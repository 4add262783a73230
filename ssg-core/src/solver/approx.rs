//! Rational Approximation
//!
//! Given an approximate value `v` and a denominator bound `B`, find the
//! fraction `p/q` with `q <= B` closest to `v`. All comparisons are exact
//! cross-multiplications; no floating point is involved.
//!
//! Two interchangeable strategies are provided:
//!
//! - [`SternBrocot`] walks the Stern–Brocot tree from `1/2`. It needs no
//!   precomputation and costs one step per tree level.
//! - [`FractionTable`] binary-searches a sorted table of every reduced
//!   fraction in `[0, 1]` up to a fixed denominator. It costs memory up
//!   front and a logarithmic search per query.
//!
//! Both break ties between equally close candidates the same way (smaller
//! denominator first, then smaller numerator), so they always agree.

use std::cmp::Ordering;

use indexmap::IndexSet;
use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{One, Signed};

use crate::graph::{GameGraph, Label, NodeId, Rational};

/// Nearest-fraction search with a bounded denominator.
pub trait Approximant {
    /// The fraction with denominator at most `bound` closest to `value`.
    ///
    /// Game values lie in `[0, 1]`; values outside are clamped to the
    /// nearest end.
    fn nearest(&self, value: &Rational, bound: u64) -> Rational;
}

type Fraction = (u64, u64);

fn to_rational((p, q): Fraction) -> Rational {
    Rational::new(BigInt::from(p), BigInt::from(q))
}

/// Order `p/q` against `value`.
fn compare((p, q): Fraction, value: &Rational) -> Ordering {
    (BigInt::from(p) * value.denom()).cmp(&(value.numer() * BigInt::from(q)))
}

/// Whether `candidate` is a strictly better answer than `best` for `value`.
fn is_closer(candidate: Fraction, best: Fraction, value: &Rational) -> bool {
    // |p/q - a/b| = |p*b - a*q| / (q*b); the common factor b cancels.
    let gap = |(p, q): Fraction| {
        (BigInt::from(p) * value.denom() - value.numer() * BigInt::from(q)).abs()
    };
    let lhs = gap(candidate) * BigInt::from(best.1);
    let rhs = gap(best) * BigInt::from(candidate.1);
    match lhs.cmp(&rhs) {
        Ordering::Less => true,
        Ordering::Greater => false,
        Ordering::Equal => (candidate.1, candidate.0) < (best.1, best.0),
    }
}

/// Stern–Brocot tree walk.
#[derive(Debug, Clone, Copy, Default)]
pub struct SternBrocot;

impl Approximant for SternBrocot {
    fn nearest(&self, value: &Rational, bound: u64) -> Rational {
        let bound = bound.max(1);
        let mut best: Fraction = (0, 1);
        if is_closer((1, 1), best, value) {
            best = (1, 1);
        }

        let mut left: Fraction = (0, 1);
        let mut right: Fraction = (1, 1);
        let mut current: Fraction = (1, 2);
        while current.1 <= bound {
            match compare(current, value) {
                Ordering::Equal => return to_rational(current),
                Ordering::Less => left = current,
                Ordering::Greater => right = current,
            }
            if is_closer(current, best, value) {
                best = current;
            }
            current = (left.0 + right.0, left.1 + right.1);
        }
        to_rational(best)
    }
}

/// Limit `value` to the closest fraction with denominator at most `bound`.
pub fn limit_denominator(value: &Rational, bound: u64) -> Rational {
    SternBrocot.nearest(value, bound)
}

/// Sorted table of every reduced fraction in `[0, 1]` with denominator up to
/// `max_denominator`.
#[derive(Debug, Clone)]
pub struct FractionTable {
    max_denominator: u64,
    entries: Vec<Fraction>,
}

impl FractionTable {
    pub fn new(max_denominator: u64) -> Self {
        let max_denominator = max_denominator.max(1);
        let mut entries = vec![(0, 1), (1, 1)];
        for q in 2..=max_denominator {
            for p in 1..q {
                if p.gcd(&q) == 1 {
                    entries.push((p, q));
                }
            }
        }
        entries.sort_by(|a, b| {
            (u128::from(a.0) * u128::from(b.1)).cmp(&(u128::from(b.0) * u128::from(a.1)))
        });
        Self {
            max_denominator,
            entries,
        }
    }

    pub fn max_denominator(&self) -> u64 {
        self.max_denominator
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Approximant for FractionTable {
    /// Bounds beyond the table fall back to [`SternBrocot`].
    fn nearest(&self, value: &Rational, bound: u64) -> Rational {
        if bound > self.max_denominator {
            return SternBrocot.nearest(value, bound);
        }
        let bound = bound.max(1);
        let split = self
            .entries
            .partition_point(|&e| compare(e, value) != Ordering::Greater);

        let below = self.entries[..split].iter().rev().find(|e| e.1 <= bound);
        let above = self.entries[split..].iter().find(|e| e.1 <= bound);

        let best = match (below, above) {
            (Some(&lo), Some(&hi)) => {
                if is_closer(hi, lo, value) {
                    hi
                } else {
                    lo
                }
            }
            (Some(&lo), None) => lo,
            (None, Some(&hi)) => hi,
            (None, None) => (0, 1),
        };
        to_rational(best)
    }
}

/// Denominator bound for exact reconstruction of a component's values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DenominatorBound {
    /// The bound actually used.
    pub value: u64,

    /// Whether the theoretical bound exceeded the cap.
    pub capped: bool,
}

/// `min((L * q)^k, cap)` for the component `nodes`, where `q` is the largest
/// weight denominator on edges leaving its average nodes, `L` the lcm of the
/// denominators on those edges that leave the component, and `k` the number
/// of average nodes.
pub fn denominator_bound(graph: &GameGraph, nodes: &[NodeId], cap: u64) -> DenominatorBound {
    let members: IndexSet<NodeId> = nodes.iter().copied().collect();
    let mut q = BigInt::one();
    let mut lcm = BigInt::one();
    let mut averages = 0u32;

    for node in nodes.iter().filter_map(|&id| graph.node(id)) {
        if node.label() != Label::Average {
            continue;
        }
        averages += 1;
        for (succ, weight) in node.successors() {
            if weight.denom() > &q {
                q = weight.denom().clone();
            }
            if !members.contains(succ) {
                lcm = lcm.lcm(weight.denom());
            }
        }
    }

    let base = lcm * q;
    let cap_big = BigInt::from(cap);
    let mut acc = BigInt::one();
    for _ in 0..averages {
        acc *= &base;
        if acc > cap_big {
            return DenominatorBound {
                value: cap,
                capped: true,
            };
        }
    }
    DenominatorBound {
        value: u64::try_from(acc).unwrap_or(cap),
        capped: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ratio(n: i64, d: i64) -> Rational {
        Rational::new(BigInt::from(n), BigInt::from(d))
    }

    #[test]
    fn stern_brocot_snaps_to_simple_fraction() {
        // 0.66667 is closest to 2/3 among denominators up to 10
        assert_eq!(SternBrocot.nearest(&ratio(66_667, 100_000), 10), ratio(2, 3));
        assert_eq!(SternBrocot.nearest(&ratio(1, 3), 3), ratio(1, 3));
        assert_eq!(SternBrocot.nearest(&ratio(3, 10), 10), ratio(3, 10));
    }

    #[test]
    fn stern_brocot_respects_bound() {
        // 2/7 is not allowed with bound 5; 1/4 is the closest candidate
        let nearest = SternBrocot.nearest(&ratio(2, 7), 5);
        assert_eq!(nearest, ratio(1, 4));
        assert!(nearest.denom() <= &BigInt::from(5));
    }

    #[test]
    fn stern_brocot_handles_ends() {
        assert_eq!(SternBrocot.nearest(&ratio(0, 1), 100), ratio(0, 1));
        assert_eq!(SternBrocot.nearest(&ratio(1, 1), 100), ratio(1, 1));
        assert_eq!(SternBrocot.nearest(&ratio(1, 1000), 10), ratio(0, 1));
        assert_eq!(SternBrocot.nearest(&ratio(999, 1000), 10), ratio(1, 1));
        assert_eq!(SternBrocot.nearest(&ratio(1, 2), 1), ratio(0, 1));
        assert_eq!(SternBrocot.nearest(&ratio(3, 2), 10), ratio(1, 1));
        assert_eq!(SternBrocot.nearest(&ratio(-1, 2), 10), ratio(0, 1));
    }

    #[test]
    fn ties_prefer_smaller_denominator() {
        // 5/12 sits exactly between 1/3 and 1/2
        assert_eq!(SternBrocot.nearest(&ratio(5, 12), 3), ratio(1, 2));
        let table = FractionTable::new(3);
        assert_eq!(table.nearest(&ratio(5, 12), 3), ratio(1, 2));
    }

    #[test]
    fn table_contains_reduced_fractions_only() {
        // |F_5| = 11: 0/1, 1/5, 1/4, 1/3, 2/5, 1/2, 3/5, 2/3, 3/4, 4/5, 1/1
        let table = FractionTable::new(5);
        assert_eq!(table.len(), 11);
        assert_eq!(table.entries.first(), Some(&(0, 1)));
        assert_eq!(table.entries.last(), Some(&(1, 1)));
        assert_eq!(table.entries[5], (1, 2));
    }

    #[test]
    fn table_matches_stern_brocot_on_samples() {
        let table = FractionTable::new(50);
        for (n, d) in [(1, 7), (355, 1130), (2, 3), (9999, 10000), (1, 99), (17, 40)] {
            let value = ratio(n, d);
            for bound in [1, 2, 7, 13, 50] {
                assert_eq!(
                    table.nearest(&value, bound),
                    SternBrocot.nearest(&value, bound),
                    "value {value}, bound {bound}"
                );
            }
        }
    }

    #[test]
    fn table_defers_to_walk_beyond_its_range() {
        let table = FractionTable::new(1000);
        let value = ratio(1000, 3439);
        assert_eq!(table.nearest(&value, 10_000), ratio(1000, 3439));
        assert_eq!(table.nearest(&value, 10_000), SternBrocot.nearest(&value, 10_000));
        // within range the table itself answers
        assert_eq!(table.nearest(&value, 1000), SternBrocot.nearest(&value, 1000));
    }

    #[test]
    fn bound_for_two_cycle() {
        let mut graph = GameGraph::new();
        let s0 = graph.add_sink(false);
        let s1 = graph.add_sink(true);
        let a = graph.add_node(Label::Average);
        let b = graph.add_node(Label::Average);
        graph.add_edge(a, s1, ratio(1, 2));
        graph.add_edge(a, b, ratio(1, 2));
        graph.add_edge(b, s0, ratio(1, 2));
        graph.add_edge(b, a, ratio(1, 2));

        // L = 2, q = 2, k = 2
        let bound = denominator_bound(&graph, &[a, b], 10_000);
        assert_eq!(bound, DenominatorBound { value: 16, capped: false });

        let capped = denominator_bound(&graph, &[a, b], 10);
        assert_eq!(capped, DenominatorBound { value: 10, capped: true });
    }

    #[test]
    fn bound_without_averages_is_one() {
        let mut graph = GameGraph::new();
        let s1 = graph.add_sink(true);
        let max = graph.add_node(Label::Max);
        graph.add_edge(max, s1, ratio(1, 1));

        assert_eq!(
            denominator_bound(&graph, &[max], 10_000),
            DenominatorBound { value: 1, capped: false }
        );
    }
}
