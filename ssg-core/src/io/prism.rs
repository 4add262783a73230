//! Model Checker Input
//!
//! Reads the two files the model checker exports for a game:
//!
//! - a transition list, one line per state: the state id followed by choice
//!   groups, each opened by a `-1.0` marker. A group `-1.0 1.0 s` is a sure
//!   move to `s`; any other group `-1.0 p1 s1 p2 s2 ...` is a probabilistic
//!   choice and becomes a fresh Average node.
//! - a label file: a header line, then `state label value` lines with
//!   `value = -1` for unresolved states.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use indexmap::IndexMap;
use num_bigint::BigInt;
use num_traits::{One, Zero};
use tracing::info;

use crate::error::InputError;
use crate::graph::{GameGraph, Label, NodeId, Rational};
use crate::solver::limit_denominator;

/// Producer probabilities are only trusted up to this denominator.
const PROBABILITY_DENOMINATOR: u64 = 10;

/// Largest power of ten a decimal token may scale by.
const MAX_DECIMAL_SCALE: u32 = 64;

/// One choice available in a state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Choice {
    /// Move to the state with probability one.
    Sure(u64),

    /// Move according to a distribution over states.
    Random(Vec<(Rational, u64)>),
}

/// All choices of one state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub state: u64,
    pub choices: Vec<Choice>,
}

/// Label and resolved value of one state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateLabel {
    pub state: u64,
    pub label: Label,
    /// `Some(true)` for value 1, `Some(false)` for 0, `None` if unresolved.
    pub value: Option<bool>,
}

fn is_marker(token: &str) -> bool {
    token.parse::<f64>().is_ok_and(|v| v == -1.0)
}

/// Parse an integer written either plainly or as an integral float.
fn parse_integral(token: &str) -> Option<i64> {
    if let Ok(v) = token.parse::<i64>() {
        return Some(v);
    }
    let (int, frac) = token.split_once('.')?;
    if !frac.is_empty() && !frac.bytes().all(|b| b == b'0') {
        return None;
    }
    int.parse().ok()
}

fn parse_state(token: &str, line: usize) -> Result<u64, InputError> {
    parse_integral(token)
        .and_then(|v| u64::try_from(v).ok())
        .ok_or_else(|| InputError::InvalidToken {
            line,
            expected: "state",
            token: token.to_string(),
        })
}

/// Parse a decimal such as `0.25`, `1`, `-1.0` or `2.5E-1` exactly.
pub fn parse_decimal(token: &str) -> Option<Rational> {
    let (mantissa, exponent) = match token.find(['e', 'E']) {
        Some(pos) => (&token[..pos], token[pos + 1..].parse::<i32>().ok()?),
        None => (token, 0),
    };
    let (negative, digits) = match mantissa.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, mantissa.strip_prefix('+').unwrap_or(mantissa)),
    };
    let (int, frac) = digits.split_once('.').unwrap_or((digits, ""));
    if int.is_empty() && frac.is_empty() {
        return None;
    }
    if !int.bytes().chain(frac.bytes()).all(|b| b.is_ascii_digit()) {
        return None;
    }

    let numer: BigInt = format!("{int}{frac}").parse().ok()?;
    let scale = exponent.checked_sub(i32::try_from(frac.len()).ok()?)?;
    if scale.unsigned_abs() > MAX_DECIMAL_SCALE {
        return None;
    }
    let power = num_traits::pow(BigInt::from(10), scale.unsigned_abs() as usize);
    let mut value = if scale >= 0 {
        Rational::from_integer(numer * power)
    } else {
        Rational::new(numer, power)
    };
    if negative {
        value = -value;
    }
    Some(value)
}

fn parse_probability(token: &str, line: usize) -> Result<Rational, InputError> {
    let exact = parse_decimal(token).ok_or_else(|| InputError::InvalidToken {
        line,
        expected: "probability",
        token: token.to_string(),
    })?;
    Ok(limit_denominator(&exact, PROBABILITY_DENOMINATOR))
}

fn parse_transition_line(text: &str, line: usize) -> Result<Option<Transition>, InputError> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    let Some((&first, rest)) = tokens.split_first() else {
        return Ok(None);
    };
    let state = parse_state(first, line)?;
    let mut choices = Vec::new();

    let mut i = 0;
    while i < rest.len() {
        if !is_marker(rest[i]) {
            return Err(InputError::InvalidToken {
                line,
                expected: "choice marker",
                token: rest[i].to_string(),
            });
        }
        i += 1;

        let sure = rest.get(i).and_then(|t| parse_decimal(t)).is_some_and(|p| p.is_one());
        if sure {
            let succ = rest.get(i + 1).ok_or(InputError::DanglingProbability { line })?;
            choices.push(Choice::Sure(parse_state(succ, line)?));
            i += 2;
            continue;
        }

        let mut distribution = Vec::new();
        while i < rest.len() && !is_marker(rest[i]) {
            let probability = parse_probability(rest[i], line)?;
            let succ = rest.get(i + 1).ok_or(InputError::DanglingProbability { line })?;
            distribution.push((probability, parse_state(succ, line)?));
            i += 2;
        }
        choices.push(Choice::Random(distribution));
    }

    Ok(Some(Transition { state, choices }))
}

/// Parse a transition list. Blank lines are skipped.
pub fn parse_transitions<R: BufRead>(reader: R) -> Result<Vec<Transition>, InputError> {
    let mut transitions = Vec::new();
    for (n, text) in reader.lines().enumerate() {
        if let Some(transition) = parse_transition_line(&text?, n + 1)? {
            transitions.push(transition);
        }
    }
    Ok(transitions)
}

/// Parse a label file. The first line is a header and is skipped.
pub fn parse_labels<R: BufRead>(reader: R) -> Result<Vec<StateLabel>, InputError> {
    let mut labels = Vec::new();
    for (n, text) in reader.lines().enumerate().skip(1) {
        let text = text?;
        let line = n + 1;
        let tokens: Vec<&str> = text.split_whitespace().collect();
        let [state, label, value, ..] = tokens.as_slice() else {
            if tokens.is_empty() {
                continue;
            }
            return Err(InputError::InvalidToken {
                line,
                expected: "`state label value` line",
                token: text.clone(),
            });
        };

        let state = parse_state(state, line)?;
        let label = Label::from_keyword(label).ok_or_else(|| InputError::UnknownLabel {
            line,
            label: label.to_string(),
        })?;
        let value = match parse_integral(value) {
            Some(-1) => None,
            Some(0) => Some(false),
            Some(1) => Some(true),
            _ => {
                return Err(InputError::InvalidValue {
                    line,
                    value: value.to_string(),
                })
            }
        };
        if label == Label::Sink && value.is_none() {
            return Err(InputError::SinkWithoutPayoff { state });
        }
        labels.push(StateLabel {
            state,
            label,
            value,
        });
    }
    Ok(labels)
}

/// Build the game graph from parsed transitions and labels.
///
/// Only states mentioned by the transition list become nodes, in order of
/// first mention. Every such state must be labelled.
pub fn build_graph(transitions: &[Transition], labels: &[StateLabel]) -> Result<GameGraph, InputError> {
    let labels: IndexMap<u64, StateLabel> = labels.iter().map(|l| (l.state, *l)).collect();
    let mut graph = GameGraph::new();
    let mut nodes: IndexMap<u64, NodeId> = IndexMap::new();

    let mut state_node = |graph: &mut GameGraph, state: u64| -> Result<NodeId, InputError> {
        if let Some(&id) = nodes.get(&state) {
            return Ok(id);
        }
        let entry = labels.get(&state).ok_or(InputError::MissingLabel { state })?;
        let id = graph.add_node(entry.label);
        let known = entry.value.map(|v| if v { Rational::one() } else { Rational::zero() });
        graph.set_known(id, known);
        graph.bind_state(state, id);
        nodes.insert(state, id);
        Ok(id)
    };

    for transition in transitions {
        let from = state_node(&mut graph, transition.state)?;
        for choice in &transition.choices {
            match choice {
                Choice::Sure(succ) => {
                    let to = state_node(&mut graph, *succ)?;
                    graph.add_edge(from, to, Rational::one());
                }
                Choice::Random(distribution) => {
                    let average = graph.add_node(Label::Average);
                    graph.add_edge(from, average, Rational::one());
                    for (probability, succ) in distribution {
                        let to = state_node(&mut graph, *succ)?;
                        graph.add_edge(average, to, probability.clone());
                    }
                }
            }
        }
    }

    seed_average_values(&mut graph);
    info!(
        states = nodes.len(),
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        "game graph built"
    );
    Ok(graph)
}

/// Give every unresolved Average node whose successors are all known the
/// weighted sum of their values, in arena order.
fn seed_average_values(graph: &mut GameGraph) {
    let ids: Vec<NodeId> = graph.node_ids().collect();
    for id in ids {
        let Some(node) = graph.node(id) else {
            continue;
        };
        if node.label() != Label::Average || node.known().is_some() || node.out_degree() == 0 {
            continue;
        }
        let seeded = node.successors().iter().try_fold(Rational::zero(), |acc, (succ, w)| {
            let value = graph.node(*succ)?.known()?;
            Some(acc + w * value)
        });
        if seeded.is_some() {
            graph.set_known(id, seeded);
        }
    }
}

/// Parse both inputs and build the game graph.
pub fn read_game<T: BufRead, L: BufRead>(transitions: T, labels: L) -> Result<GameGraph, InputError> {
    let transitions = parse_transitions(transitions)?;
    let labels = parse_labels(labels)?;
    build_graph(&transitions, &labels)
}

/// Open and read both input files.
pub fn load_game(transitions: &Path, labels: &Path) -> Result<GameGraph, InputError> {
    read_game(
        BufReader::new(File::open(transitions)?),
        BufReader::new(File::open(labels)?),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ratio(n: i64, d: i64) -> Rational {
        Rational::new(BigInt::from(n), BigInt::from(d))
    }

    #[test]
    fn decimals_parse_exactly() {
        assert_eq!(parse_decimal("0.25"), Some(ratio(1, 4)));
        assert_eq!(parse_decimal("-1.0"), Some(ratio(-1, 1)));
        assert_eq!(parse_decimal("3"), Some(ratio(3, 1)));
        assert_eq!(parse_decimal("2.5E-1"), Some(ratio(1, 4)));
        assert_eq!(parse_decimal(".5"), Some(ratio(1, 2)));
        assert_eq!(parse_decimal("1e2"), Some(ratio(100, 1)));
        assert_eq!(parse_decimal("abc"), None);
        assert_eq!(parse_decimal("."), None);
    }

    #[test]
    fn extreme_exponents_are_rejected() {
        assert_eq!(parse_decimal("1.5e-2147483648"), None);
        assert_eq!(parse_decimal("1e999999999"), None);
        assert_eq!(parse_decimal("1e-65"), None);
        assert_eq!(parse_decimal("1e-64").map(|v| v.is_zero()), Some(false));

        let err = parse_probability("5e99999", 3).unwrap_err();
        assert!(matches!(err, InputError::InvalidToken { line: 3, .. }));
    }

    #[test]
    fn probabilities_are_limited() {
        assert_eq!(parse_probability("0.333333", 1).unwrap(), ratio(1, 3));
        assert_eq!(parse_probability("0.7", 1).unwrap(), ratio(7, 10));
    }

    #[test]
    fn integral_tokens() {
        assert_eq!(parse_integral("3"), Some(3));
        assert_eq!(parse_integral("3.0"), Some(3));
        assert_eq!(parse_integral("-1"), Some(-1));
        assert_eq!(parse_integral("3.5"), None);
    }

    #[test]
    fn transition_line_groups() {
        let transition = parse_transition_line("0 -1.0 1.0 1.0 -1.0 0.5 2.0 0.5 3.0", 1)
            .unwrap()
            .unwrap();

        assert_eq!(transition.state, 0);
        assert_eq!(
            transition.choices,
            vec![
                Choice::Sure(1),
                Choice::Random(vec![(ratio(1, 2), 2), (ratio(1, 2), 3)]),
            ]
        );
    }

    #[test]
    fn transition_without_marker_is_rejected() {
        let err = parse_transition_line("0 0.5 1.0", 4).unwrap_err();
        assert!(matches!(err, InputError::InvalidToken { line: 4, .. }));
    }

    #[test]
    fn dangling_probability_is_rejected() {
        let err = parse_transition_line("0 -1.0 0.5 1.0 0.5", 2).unwrap_err();
        assert!(matches!(err, InputError::DanglingProbability { line: 2 }));
    }

    #[test]
    fn labels_skip_header() {
        let labels = parse_labels("states\n0 max -1\n1 sink 1\n\n2 sink 0\n".as_bytes()).unwrap();
        assert_eq!(labels.len(), 3);
        assert_eq!(labels[0].label, Label::Max);
        assert_eq!(labels[0].value, None);
        assert_eq!(labels[1].value, Some(true));
        assert_eq!(labels[2].value, Some(false));
    }

    #[test]
    fn bad_labels_are_rejected() {
        let unknown = parse_labels("h\n0 chance -1\n".as_bytes()).unwrap_err();
        assert!(matches!(unknown, InputError::UnknownLabel { line: 2, .. }));

        let value = parse_labels("h\n0 max 2\n".as_bytes()).unwrap_err();
        assert!(matches!(value, InputError::InvalidValue { line: 2, .. }));

        let sink = parse_labels("h\n5 sink -1\n".as_bytes()).unwrap_err();
        assert!(matches!(sink, InputError::SinkWithoutPayoff { state: 5 }));
    }

    #[test]
    fn read_game_builds_average_nodes() {
        let transitions = "0 -1.0 1.0 1.0 -1.0 0.5 1.0 0.5 2.0\n1\n2\n";
        let labels = "header\n0 max -1\n1 sink 1\n2 sink 0\n";

        let graph = read_game(transitions.as_bytes(), labels.as_bytes()).unwrap();

        // three states plus one synthesized average node
        assert_eq!(graph.node_count(), 4);
        assert_eq!(graph.edge_count(), 4);
        let root = graph.node_for_state(0).unwrap();
        let node = graph.node(root).unwrap();
        assert_eq!(node.label(), Label::Max);
        assert_eq!(node.out_degree(), 2);

        let average = graph
            .nodes()
            .find(|n| n.label() == Label::Average)
            .unwrap();
        assert_eq!(average.weight_sum(), ratio(1, 1));
        assert_eq!(average.known(), Some(&ratio(1, 2)));
    }

    #[test]
    fn unlabelled_state_is_rejected() {
        let err = read_game("0 -1.0 1.0 9.0\n".as_bytes(), "h\n0 max -1\n".as_bytes()).unwrap_err();
        assert!(matches!(err, InputError::MissingLabel { state: 9 }));
    }
}
