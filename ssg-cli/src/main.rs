mod cli;
mod commands;

use tracing_subscriber::EnvFilter;

use cli::{build_cli, ExportParams, SolveParams, StatsParams};

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let matches = build_cli().get_matches();
    init_tracing(matches.get_flag("verbose"));

    let result = match matches.subcommand() {
        Some(("solve", m)) => commands::solve(SolveParams::from_matches(m)),
        Some(("export", m)) => commands::export(ExportParams::from_matches(m)),
        Some(("stats", m)) => commands::stats(StatsParams::from_matches(m)),
        _ => unreachable!("clap should have caught this"),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(err.exit_code());
    }
}
