//! Covert Simulation CLI
//!
//! Run the resistance vs. counter-intelligence simulation until one of its
//! termination conditions is met.

use clap::Parser;
use covert_core::SimParams;
use covert_sim::{run, CliError, RunConfig, RunReport, ScenarioId};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Covert conflict simulation
#[derive(Parser, Debug)]
#[command(name = "covert-sim")]
#[command(about = "Run the resistance vs. counter-intelligence simulation", long_about = None)]
struct Args {
    /// Configuration file (`key=value` or `key value` per line)
    #[arg(default_value = "config.txt")]
    config: PathBuf,

    /// Master seed; makes every actor's random stream reproducible
    #[arg(short, long)]
    seed: Option<u64>,

    /// Run on a virtual clock that skips idle time
    #[arg(long)]
    virtual_time: bool,

    /// Parameter preset applied before the config file
    #[arg(short = 'S', long, default_value = "baseline")]
    scenario: String,

    /// List available scenarios and exit
    #[arg(long)]
    list_scenarios: bool,

    /// Export snapshot frames and the outcome to a JSON file
    #[arg(long)]
    export: Option<PathBuf>,

    /// Seconds between viewer snapshots
    #[arg(long, default_value = "5")]
    view_interval: f64,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// JSON output on stdout
    #[arg(long)]
    json: bool,
}

fn main() {
    let args = Args::parse();

    // Initialize logging; RUST_LOG overrides the verbosity flag
    let level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }

    if args.list_scenarios {
        for id in ScenarioId::all() {
            println!("{:<14} {}", id.name(), id.description());
        }
        return;
    }

    if !args.json {
        info!("Covert Simulator v{}", env!("CARGO_PKG_VERSION"));
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }

    match execute(&args) {
        Ok(report) => {
            if let Err(e) = print_report(&report, args.json) {
                error!("{}", e);
                std::process::exit(1);
            }
        }
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    }
}

fn execute(args: &Args) -> Result<RunReport, CliError> {
    let scenario: ScenarioId = args
        .scenario
        .parse()
        .map_err(|_| CliError::UnknownScenario(args.scenario.clone()))?;
    let view_interval = Duration::try_from_secs_f64(args.view_interval)
        .ok()
        .filter(|d| !d.is_zero())
        .ok_or(CliError::InvalidViewInterval(args.view_interval))?;

    let mut params = SimParams::default();
    scenario.apply(&mut params);
    let params = params.load_file(&args.config)?;
    params.validate()?;

    let mut config = RunConfig::new(params, scenario).with_virtual_time(args.virtual_time);
    if let Some(seed) = args.seed {
        config = config.with_seed(seed);
    }
    config.view_interval = view_interval;
    config.export = args.export.clone();

    Ok(run(config)?)
}

fn print_report(report: &RunReport, json: bool) -> Result<(), CliError> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    let outcome = &report.outcome;
    let c = &outcome.snapshot.counters;
    info!("");
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("  Run {} ({}, seed={})", report.run_id, report.scenario, report.seed);
    info!("  Ended after {:.1}s: {}", outcome.elapsed_secs, outcome.reason);
    info!("  RESISTANCE:");
    info!("    Groups formed:       {}", c.total_resistance_groups);
    info!("    Killed / injured:    {} / {}", c.killed_resistance, c.injured_resistance);
    info!("    Caught:              {}", c.caught_resistance);
    info!("  AGENCY:");
    info!("    Killed / injured:    {} / {}", c.killed_agency, c.injured_agency);
    info!("    Caught:              {}", c.caught_agency);
    info!("  COUNTER-INTELLIGENCE:");
    info!("    Arrests:             {}", c.total_arrests);
    info!("    Imprisoned:          {}", c.total_imprisoned);
    info!("    Released:            {}", c.total_released);
    info!("    Data shared:         {}", c.data_shared);
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    Ok(())
}
