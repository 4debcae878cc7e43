//! CLI command handlers.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use tracing::error;

use crate::config::WatchConfig;
use crate::error::WatchResult;
use crate::sandbox::{Scenario, ScenarioOutcome};

use super::output::{print_config_summary, print_help, print_outcome, print_version};
use super::{Args, Command};

/// Options for [`run_scenario`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Configuration file replacing the scenario's embedded settings.
    pub config_path: Option<PathBuf>,
    /// Force detect-only mode.
    pub detect_only: bool,
}

/// Main CLI entry point.
#[must_use]
pub fn run_cli(args: Args) -> ExitCode {
    match args.command {
        Command::Run {
            scenario_path,
            config_path,
            json,
            detect_only,
            verbose,
        } => {
            let options = RunOptions {
                config_path,
                detect_only,
            };
            match run_scenario(&scenario_path, &options) {
                Ok(outcome) => report_outcome(&outcome, json, verbose),
                Err(e) => {
                    error!(path = %scenario_path.display(), err = %e, "scenario failed");
                    eprintln!("Error: {e}");
                    ExitCode::from(1)
                }
            }
        }
        Command::CheckConfig { config_path } => match check_config(&config_path) {
            Ok(config) => {
                println!("✓ {} is valid\n", config_path.display());
                print_config_summary(&config);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("✗ {}: {e}", config_path.display());
                ExitCode::from(1)
            }
        },
        Command::Help => {
            print_help();
            ExitCode::SUCCESS
        }
        Command::Version => {
            print_version();
            ExitCode::SUCCESS
        }
    }
}

fn report_outcome(outcome: &ScenarioOutcome, json: bool, verbose: bool) -> ExitCode {
    if !json {
        print_outcome(outcome, verbose);
        return ExitCode::SUCCESS;
    }
    match outcome.to_json() {
        Ok(text) => {
            println!("{text}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(1)
        }
    }
}

/// Load and run a scenario.
///
/// The monitor configuration comes from `options.config_path` when given,
/// otherwise from the scenario itself, otherwise defaults.
///
/// # Errors
///
/// Returns error if the scenario or configuration cannot be loaded.
pub fn run_scenario(path: &Path, options: &RunOptions) -> WatchResult<ScenarioOutcome> {
    let scenario = Scenario::load(path)?;
    let mut config = match &options.config_path {
        Some(config_path) => WatchConfig::load(config_path)?,
        None => scenario.monitor_config(),
    };
    if options.detect_only {
        config.detect_only = true;
    }
    scenario.run(&config)
}

/// Load and validate a configuration file.
///
/// # Errors
///
/// Returns error if the file cannot be read, parsed or validated.
pub fn check_config(path: &Path) -> WatchResult<WatchConfig> {
    WatchConfig::load(path)
}
