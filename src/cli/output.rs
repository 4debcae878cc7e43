//! CLI output formatting.

use std::fmt::Write as _;

use crate::config::WatchConfig;
use crate::monitor::AnomalyKind;
use crate::sandbox::ScenarioOutcome;

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

/// Print version information.
pub fn print_version() {
    let version = option_env!("SIMWATCH_VERSION").unwrap_or(env!("CARGO_PKG_VERSION"));
    println!("simwatch {version}");
    if let Some(hash) = option_env!("GIT_HASH").filter(|hash| !hash.is_empty()) {
        println!("commit {hash}");
    }
    if let Some(stamp) = option_env!("BUILD_TIMESTAMP") {
        println!("built {stamp}");
    }
}

/// Print help message.
pub fn print_help() {
    println!(
        r"simwatch - Entity health monitor for real-time simulations

USAGE:
    simwatch <COMMAND> [OPTIONS]

COMMANDS:
    run <scenario.yaml>         Run a scripted sandbox scenario
        -c, --config <FILE>     Monitor configuration (overrides the scenario's)
        --detect-only           Detect and confirm problems but never fix them
        --json                  Print the outcome as JSON
        -v, --verbose           Debug logging and per-entity state

    check-config <config.yaml>  Validate a monitor configuration file

    help                        Show this help message
    version                     Show version information

EXAMPLES:
    simwatch run scenarios/stuck_player.yaml
    simwatch run scenarios/crowd.yaml --config simwatch.yaml --json
    simwatch check-config simwatch.yaml

LOGGING:
    Set RUST_LOG to override the log filter (default: info)."
    );
}

/// Render a run outcome as a human-readable report.
#[must_use]
pub fn format_outcome(outcome: &ScenarioOutcome, verbose: bool) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(out, "Scenario: {}", outcome.name);
    let _ = writeln!(out, "{RULE}\n");

    let _ = writeln!(out, "Ticks:");
    let _ = writeln!(out, "  Ran:     {}", outcome.ticks_ran);
    let _ = writeln!(out, "  Skipped: {}", outcome.ticks_skipped);
    let _ = writeln!(out, "  Scans:   {}", outcome.scans);
    let _ = writeln!(out, "  End:     {}", outcome.end_time);

    let _ = writeln!(out, "\nFixes: {}", outcome.fixes.len());
    for fix in &outcome.fixes {
        let _ = writeln!(
            out,
            "  {:>9} {} {:?} -> {:?}",
            fix.time.to_string(),
            fix.entity,
            fix.problem,
            fix.remediation
        );
    }

    if !outcome.dropped.is_empty() {
        let _ = writeln!(out, "\nDropped: {}", outcome.dropped.len());
        for drop in &outcome.dropped {
            let _ = writeln!(out, "  {:>9} {}", drop.time.to_string(), drop.entity);
        }
    }

    let unresolved: Vec<_> = outcome
        .report
        .entities
        .iter()
        .filter(|entity| entity.confirmed != AnomalyKind::None)
        .collect();
    if !unresolved.is_empty() {
        let _ = writeln!(out, "\nUnresolved:");
        for entity in unresolved {
            let _ = writeln!(out, "  ! {} {} {:?}", entity.id, entity.name, entity.confirmed);
        }
    }

    if verbose {
        let _ = writeln!(out, "\nEntities:");
        for entity in &outcome.report.entities {
            let role = if entity.privileged { " (privileged)" } else { "" };
            let _ = writeln!(
                out,
                "  {} {}{role}: tentative {:?}, confirmed {:?}, {} fix(es)",
                entity.id,
                entity.name,
                entity.tentative,
                entity.confirmed,
                entity.fix_count()
            );
        }
    }

    let _ = writeln!(out, "\n{RULE}");
    out
}

/// Print a run outcome.
pub fn print_outcome(outcome: &ScenarioOutcome, verbose: bool) {
    print!("{}", format_outcome(outcome, verbose));
}

/// Print the effective monitor configuration.
pub fn print_config_summary(config: &WatchConfig) {
    println!("Scan interval: {}s", config.scan.interval);
    println!(
        "Dwell:         stuck {}s, falling {}s, airborne {}s",
        config.dwell.input_without_movement, config.dwell.falling, config.dwell.airborne
    );
    println!(
        "Grace:         stuck {}s, falling {}s, airborne {}s",
        config.grace.input_without_movement, config.grace.falling, config.grace.airborne
    );
    println!("History cap:   {}", config.history_cap);
    println!(
        "Navigation:    radius {}, forward {}",
        config.navigation.search_radius, config.navigation.forward_distance
    );
    if config.detect_only {
        println!("Mode:          detect-only");
    }
}
