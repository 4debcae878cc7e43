//! Command-line front end.
//!
//! Parsing, dispatch and printing are split so each can be tested without
//! touching the process environment. `main.rs` only installs logging and
//! calls [`run_cli`].

mod args;
mod commands;
mod output;

pub use args::{Args, Command};
pub use commands::{check_config, run_cli, run_scenario, RunOptions};
pub use output::{format_outcome, print_config_summary, print_help, print_outcome, print_version};
