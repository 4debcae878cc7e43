//! CLI argument parsing.

use std::path::PathBuf;

/// CLI arguments container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Args {
    /// The command to execute.
    pub command: Command,
}

/// Available CLI commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run a scripted scenario against the monitor
    Run {
        /// Path to the scenario YAML file.
        scenario_path: PathBuf,
        /// Monitor configuration overriding the scenario's own.
        config_path: Option<PathBuf>,
        /// Print the outcome as JSON.
        json: bool,
        /// Force detect-only mode.
        detect_only: bool,
        /// Enable debug logging and per-entity output.
        verbose: bool,
    },
    /// Validate a monitor configuration file
    CheckConfig {
        /// Path to the configuration YAML file.
        config_path: PathBuf,
    },
    /// Show help
    Help,
    /// Show version
    Version,
}

impl Args {
    /// Parse command-line arguments from an iterator.
    ///
    /// Accepts any iterator of strings, not just `std::env::args()`.
    #[must_use]
    pub fn parse_from<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let args: Vec<String> = args.into_iter().map(|s| s.as_ref().to_string()).collect();
        Self::parse_from_vec(&args)
    }

    /// Parse command-line arguments from the environment.
    #[must_use]
    pub fn parse() -> Self {
        Self::parse_from(std::env::args())
    }

    /// Whether debug logging was requested.
    #[must_use]
    pub const fn verbose(&self) -> bool {
        matches!(self.command, Command::Run { verbose: true, .. })
    }

    fn parse_from_vec(args: &[String]) -> Self {
        if args.len() < 2 {
            return Self {
                command: Command::Help,
            };
        }

        let command = match args[1].as_str() {
            "run" => Self::parse_run_command(args),
            "check-config" => Self::parse_check_config_command(args),
            "-h" | "--help" | "help" => Command::Help,
            "-V" | "--version" | "version" => Command::Version,
            unknown => {
                eprintln!("Unknown command: {unknown}");
                Command::Help
            }
        };

        Self { command }
    }

    fn parse_run_command(args: &[String]) -> Command {
        if args.len() < 3 || args[2].starts_with('-') {
            eprintln!("Error: 'run' command requires scenario path");
            return Command::Help;
        }

        let mut config_path = None;
        let mut json = false;
        let mut detect_only = false;
        let mut verbose = false;

        let mut i = 3;
        while i < args.len() {
            match args[i].as_str() {
                "-c" | "--config" => {
                    if let Some(path) = args.get(i + 1) {
                        config_path = Some(PathBuf::from(path));
                        i += 2;
                    } else {
                        eprintln!("Error: '--config' requires a path");
                        return Command::Help;
                    }
                }
                "--json" => {
                    json = true;
                    i += 1;
                }
                "--detect-only" => {
                    detect_only = true;
                    i += 1;
                }
                "-v" | "--verbose" => {
                    verbose = true;
                    i += 1;
                }
                other => {
                    eprintln!("Warning: ignoring unknown option '{other}'");
                    i += 1;
                }
            }
        }

        Command::Run {
            scenario_path: PathBuf::from(&args[2]),
            config_path,
            json,
            detect_only,
            verbose,
        }
    }

    fn parse_check_config_command(args: &[String]) -> Command {
        if args.len() < 3 {
            eprintln!("Error: 'check-config' command requires config path");
            return Command::Help;
        }

        Command::CheckConfig {
            config_path: PathBuf::from(&args[2]),
        }
    }
}
