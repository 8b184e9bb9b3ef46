//! # Refloat Host Runner
//!
//! Drives the ride-control core against the simulated host: loads the TOML
//! config, replays a scripted demo ride and prints cycle statistics. Ctrl-C
//! is not trapped; use `--ticks` to bound a run.

use clap::Parser;
use refloat_common::config::LogLevel;
use refloat_control::config::{LoadedConfig, load_config};
use refloat_control::controller::RideController;
use refloat_control::cycle::CycleRunner;
use refloat_control::host::VescHost;
use refloat_control::host::sim::{SimulatedHost, demo_ride_script};
use std::path::PathBuf;
use std::process;
use tracing::{Level, error, info};
use tracing_subscriber::EnvFilter;

/// Refloat host runner: ride-control loop against a simulated board
#[derive(Parser, Debug)]
#[command(name = "refloat_control")]
#[command(author = "RTS007")]
#[command(version)]
#[command(about = "Self-balancing ride-control loop driven by a simulated host")]
struct Args {
    /// Path to the runner configuration TOML.
    #[arg(default_value = "config/refloat.toml")]
    config: PathBuf,

    /// Stop after N ticks (default: run the 10 s demo ride).
    #[arg(long, value_name = "N")]
    ticks: Option<u64>,

    /// Tick as fast as possible instead of in real time.
    #[arg(long)]
    fast: bool,

    /// Log at DEBUG regardless of the configured level.
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,
}

/// Length of the scripted demo ride [s].
const DEMO_RIDE_S: u64 = 10;

fn main() {
    let args = Args::parse();

    // The config picks the log level, so it is read before logging starts.
    let loaded = load_config(&args.config);
    let log_level = loaded
        .as_ref()
        .map(|cfg| cfg.shared.log_level)
        .unwrap_or_default();
    setup_tracing(&args, log_level);

    info!("Refloat v{} starting...", env!("CARGO_PKG_VERSION"));

    let result = match loaded {
        Ok(cfg) => run(&args, cfg),
        Err(e) => Err(e.into()),
    };
    if let Err(e) = result {
        error!("FATAL: {e}");
        process::exit(1);
    }

    info!("Refloat shutdown complete");
}

fn run(args: &Args, loaded: LoadedConfig) -> Result<(), Box<dyn std::error::Error>> {
    let hertz = loaded.ride.hertz;
    info!(
        "Config OK: board={}, hertz={}, disabled={}",
        loaded.shared.board_name, hertz, loaded.ride.disabled,
    );

    let mut host = SimulatedHost::new(hertz).with_script(demo_ride_script);
    host.wheel_model = true;
    let controller = RideController::new(&loaded.ride, host.system_time_ticks());

    let ticks = args.ticks.unwrap_or(DEMO_RIDE_S * hertz as u64);
    let mut runner = CycleRunner::new(controller, host, hertz)?.with_max_ticks(ticks);
    if args.fast {
        runner = runner.unpaced();
    }

    let reason = runner.run();
    info!(
        ?reason,
        engages = runner.stats.engages,
        disengages = runner.stats.disengages,
        recorded = runner.controller.recorder().len(),
        "Run finished"
    );
    Ok(())
}

/// Setup tracing subscriber from the configured level and CLI flags.
fn setup_tracing(args: &Args, log_level: LogLevel) {
    let level = if args.verbose {
        Level::DEBUG
    } else {
        Level::from(log_level)
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .compact()
            .init();
    }
}
