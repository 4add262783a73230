//! Argument parsing for the `ssg` binary.
//!
//! Arg definitions are shared builders so `solve`, `export` and `stats`
//! accept the same input and configuration flags.

use std::path::PathBuf;

use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};

/// Transition list written by the model checker (--transitions).
fn transitions_arg() -> Arg {
    Arg::new("transitions")
        .short('t')
        .long("transitions")
        .value_name("FILE")
        .required(true)
        .value_parser(value_parser!(PathBuf))
        .help("Transition list, one state per line")
}

/// Label file written by the model checker (--labels).
fn labels_arg() -> Arg {
    Arg::new("labels")
        .short('l')
        .long("labels")
        .value_name("FILE")
        .required(true)
        .value_parser(value_parser!(PathBuf))
        .help("Label file: header, then `state label value` lines")
}

/// JSON configuration (--config).
fn config_arg() -> Arg {
    Arg::new("config")
        .short('c')
        .long("config")
        .value_name("FILE")
        .value_parser(value_parser!(PathBuf))
        .help("JSON config; unset fields keep their defaults")
}

fn approximant_arg() -> Arg {
    Arg::new("approximant")
        .long("approximant")
        .value_name("KIND")
        .value_parser(["stern-brocot", "table"])
        .help("Nearest-fraction search used for exact snapshots")
}

fn timeout_arg() -> Arg {
    Arg::new("timeout")
        .long("timeout")
        .value_name("SECS")
        .value_parser(value_parser!(u64))
        .help("Time budget per strongly connected component")
}

fn no_reduce_arg() -> Arg {
    Arg::new("no_reduce")
        .long("no-reduce")
        .action(ArgAction::SetTrue)
        .help("Skip every reduction pass except probability correction")
}

fn json_arg() -> Arg {
    Arg::new("json")
        .long("json")
        .action(ArgAction::SetTrue)
        .help("Print a JSON report instead of `state value` lines")
}

fn verbose_arg() -> Arg {
    Arg::new("verbose")
        .short('v')
        .long("verbose")
        .global(true)
        .action(ArgAction::SetTrue)
        .help("Log at debug level unless RUST_LOG is set")
}

fn with_input_args(cmd: Command) -> Command {
    cmd.arg(transitions_arg())
        .arg(labels_arg())
        .arg(config_arg())
        .arg(no_reduce_arg())
}

/// Build the complete CLI with all subcommands.
pub fn build_cli() -> Command {
    Command::new("ssg")
        .about("Exact values of simple stochastic games")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(verbose_arg())
        .subcommand(solve_command())
        .subcommand(export_command())
        .subcommand(stats_command())
}

pub fn solve_command() -> Command {
    with_input_args(Command::new("solve").about("Reduce and solve a game"))
        .arg(approximant_arg())
        .arg(timeout_arg())
        .arg(json_arg())
        .after_help(
            r#"EXAMPLES:
  ssg solve -t adj.txt -l info.txt
  ssg solve -t adj.txt -l info.txt --approximant table --timeout 60
  ssg solve -t adj.txt -l info.txt --json > report.json"#,
        )
}

pub fn export_command() -> Command {
    with_input_args(Command::new("export").about("Write the reduced graph in .gr formats"))
        .arg(
            Arg::new("undirected")
                .long("undirected")
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf))
                .help("Undirected export (`p tdp N E` header)"),
        )
        .arg(
            Arg::new("directed")
                .long("directed")
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf))
                .help("Directed export (`N E0` header)"),
        )
}

pub fn stats_command() -> Command {
    with_input_args(Command::new("stats").about("Show label counts before and after reduction"))
        .arg(json_arg())
}

/// Flags shared by every subcommand.
#[derive(Debug, Clone)]
pub struct InputParams {
    pub transitions: PathBuf,
    pub labels: PathBuf,
    pub config: Option<PathBuf>,
    pub no_reduce: bool,
}

impl InputParams {
    pub fn from_matches(m: &ArgMatches) -> Self {
        Self {
            transitions: m.get_one::<PathBuf>("transitions").cloned().unwrap_or_default(),
            labels: m.get_one::<PathBuf>("labels").cloned().unwrap_or_default(),
            config: m.get_one::<PathBuf>("config").cloned(),
            no_reduce: m.get_flag("no_reduce"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SolveParams {
    pub input: InputParams,
    pub approximant: Option<String>,
    pub timeout: Option<u64>,
    pub json: bool,
}

impl SolveParams {
    pub fn from_matches(m: &ArgMatches) -> Self {
        Self {
            input: InputParams::from_matches(m),
            approximant: m.get_one::<String>("approximant").cloned(),
            timeout: m.get_one::<u64>("timeout").copied(),
            json: m.get_flag("json"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExportParams {
    pub input: InputParams,
    pub undirected: Option<PathBuf>,
    pub directed: Option<PathBuf>,
}

impl ExportParams {
    pub fn from_matches(m: &ArgMatches) -> Self {
        Self {
            input: InputParams::from_matches(m),
            undirected: m.get_one::<PathBuf>("undirected").cloned(),
            directed: m.get_one::<PathBuf>("directed").cloned(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StatsParams {
    pub input: InputParams,
    pub json: bool,
}

impl StatsParams {
    pub fn from_matches(m: &ArgMatches) -> Self {
        Self {
            input: InputParams::from_matches(m),
            json: m.get_flag("json"),
        }
    }
}
