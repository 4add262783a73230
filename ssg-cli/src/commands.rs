//! Subcommand handlers.

use std::fs::File;
use std::io::{self, BufWriter, Write};

use indexmap::IndexMap;
use serde::Serialize;
use tracing::{info, warn};

use ssg_core::config::ConfigError;
use ssg_core::graph::{GraphReducer, LabelCounts, ReduceConfig, SolveStats};
use ssg_core::io::{load_game, write_directed, write_undirected};
use ssg_core::solver::PrecisionWarning;
use ssg_core::{
    analyze, ApproximantKind, Config, GameGraph, InputError, ReduceError, ReductionStats,
    SolveError,
};

use crate::cli::{ExportParams, InputParams, SolveParams, StatsParams};

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Solve(#[from] SolveError),

    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),

    #[error("failed to encode report: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unknown approximant `{0}`")]
    UnknownApproximant(String),
}

impl From<InputError> for CliError {
    fn from(err: InputError) -> Self {
        CliError::Solve(err.into())
    }
}

impl From<ReduceError> for CliError {
    fn from(err: ReduceError) -> Self {
        CliError::Solve(err.into())
    }
}

impl CliError {
    /// Process exit code: 2 for a timeout, 1 for everything else.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Solve(err) if err.is_timeout() => 2,
            _ => 1,
        }
    }
}

fn load_config(input: &InputParams) -> Result<Config, CliError> {
    let mut config = match &input.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if input.no_reduce {
        config.reduce = ReduceConfig::minimal();
    }
    Ok(config)
}

fn load_input(input: &InputParams) -> Result<GameGraph, CliError> {
    info!(
        transitions = %input.transitions.display(),
        labels = %input.labels.display(),
        "loading game"
    );
    Ok(load_game(&input.transitions, &input.labels)?)
}

#[derive(Serialize)]
struct SolveReport<'a> {
    exact: bool,
    reduction: &'a ReductionStats,
    stats: &'a SolveStats,
    warnings: &'a [PrecisionWarning],
    values: IndexMap<u64, String>,
}

pub fn solve(params: SolveParams) -> Result<(), CliError> {
    let mut config = load_config(&params.input)?;
    if let Some(name) = &params.approximant {
        config.solver.approximant = ApproximantKind::from_name(name)
            .ok_or_else(|| CliError::UnknownApproximant(name.clone()))?;
    }
    if let Some(secs) = params.timeout {
        config.solver.timeout_secs = secs;
    }

    let mut graph = load_input(&params.input)?;
    let analysis = analyze(&mut graph, &config)?;
    let solution = &analysis.solution;

    for warning in solution.warnings() {
        warn!(
            component_size = warning.component_size,
            cap = warning.denominator_cap,
            "value reconstructed under a capped denominator bound"
        );
    }

    let values: IndexMap<u64, String> = graph
        .states()
        .filter_map(|state| {
            let value = solution.state_value(&graph, state)?;
            Some((state, value.to_string()))
        })
        .collect();

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    if params.json {
        let report = SolveReport {
            exact: solution.is_exact(),
            reduction: &analysis.reduction,
            stats: solution.stats(),
            warnings: solution.warnings(),
            values,
        };
        serde_json::to_writer_pretty(&mut out, &report)?;
        writeln!(out)?;
    } else {
        for (state, value) in &values {
            writeln!(out, "{state} {value}")?;
        }
    }
    out.flush()?;
    Ok(())
}

pub fn export(params: ExportParams) -> Result<(), CliError> {
    let config = load_config(&params.input)?;
    let mut graph = load_input(&params.input)?;
    GraphReducer::new(config.reduce).reduce(&mut graph)?;

    if let Some(path) = &params.undirected {
        write_undirected(&graph, BufWriter::new(File::create(path)?))?;
        info!(path = %path.display(), "undirected export written");
    }
    if let Some(path) = &params.directed {
        write_directed(&graph, BufWriter::new(File::create(path)?))?;
        info!(path = %path.display(), "directed export written");
    }
    Ok(())
}

#[derive(Serialize)]
struct StatsReport {
    nodes_before: usize,
    edges_before: usize,
    nodes_after: usize,
    edges_after: usize,
    before: LabelCounts,
    after: LabelCounts,
}

pub fn stats(params: StatsParams) -> Result<(), CliError> {
    let config = load_config(&params.input)?;
    let mut graph = load_input(&params.input)?;
    let reduction = GraphReducer::new(config.reduce).reduce(&mut graph)?;

    let report = StatsReport {
        nodes_before: reduction.nodes_before,
        edges_before: reduction.edges_before,
        nodes_after: reduction.nodes_after,
        edges_after: reduction.edges_after,
        before: reduction.labels_before,
        after: reduction.labels_after,
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if params.json {
        serde_json::to_writer_pretty(&mut out, &report)?;
        writeln!(out)?;
        return Ok(());
    }

    writeln!(out, "{:<10}{:>10}{:>10}", "", "before", "after")?;
    let rows = [
        ("nodes", report.nodes_before, report.nodes_after),
        ("edges", report.edges_before, report.edges_after),
        ("max", report.before.max, report.after.max),
        ("min", report.before.min, report.after.min),
        ("average", report.before.average, report.after.average),
        ("sink 0", report.before.sink_zero, report.after.sink_zero),
        ("sink 1", report.before.sink_one, report.after.sink_one),
    ];
    for (name, before, after) in rows {
        writeln!(out, "{name:<10}{before:>10}{after:>10}")?;
    }
    Ok(())
}
