//! simwatch CLI - entity health monitor for tick-driven simulations.

use std::process::ExitCode;

use simwatch::cli::{run_cli, Args};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let args = Args::parse();

    let default_level = if args.verbose() { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    run_cli(args)
}
