//! # elevator_sim — Console simulator
//!
//! Runs a bank of elevators against random traffic and/or manual console
//! requests.
//!
//! ## Startup Sequence
//!
//! 1. Load the building configuration (JSON file, then CLI overrides).
//! 2. Print the banner and start the periodic status report.
//! 3. Feed requests from the random generator (unless `--manual`) and the
//!    console until `q`, end of input, or Ctrl-C.
//! 4. Stop every elevator and report how shutdown went.

mod command;
mod driver;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use elevator_control::{ElevatorController, RequestGenerator};
use elevator_core::{BuildingConfig, ScanPolicy};

#[derive(Parser)]
#[command(name = "elevator_sim", about = "Elevator bank simulator")]
struct Args {
    /// JSON building configuration; built-in defaults when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of floors
    #[arg(short, long)]
    floors: Option<u32>,

    /// Number of elevators
    #[arg(short, long)]
    elevators: Option<u32>,

    /// Simulation speed multiplier
    #[arg(short, long)]
    speed: Option<u32>,

    /// Turn around as soon as a sweep runs out of floors ahead
    #[arg(long)]
    reverse_immediately: bool,

    /// Seed for the random request generator
    #[arg(long)]
    seed: Option<u64>,

    /// Only take requests from the console
    #[arg(short, long)]
    manual: bool,
}

impl Args {
    fn building_config(&self) -> Result<BuildingConfig> {
        let mut config = match &self.config {
            Some(path) => BuildingConfig::from_json_file(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => BuildingConfig::default(),
        };

        if let Some(floors) = self.floors {
            config.total_floors = floors;
        }
        if let Some(elevators) = self.elevators {
            config.total_elevators = elevators;
        }
        if let Some(speed) = self.speed {
            config.simulation_speed = speed;
        }
        if self.reverse_immediately {
            config.scan_policy = ScanPolicy::ReverseImmediately;
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("elevator_sim=info".parse()?)
                .add_directive("elevator_control=info".parse()?),
        )
        .init();

    let args = Args::parse();
    let config = args.building_config()?;

    println!("=== Elevator Bank Simulator ===");
    println!(
        "{} floors, {} elevators, {}x speed, {:?} scan",
        config.total_floors, config.total_elevators, config.simulation_speed, config.scan_policy
    );

    let generator = (!args.manual).then(|| match args.seed {
        Some(seed) => RequestGenerator::seeded(&config, seed),
        None => RequestGenerator::from_entropy(&config),
    });

    let controller = Arc::new(ElevatorController::with_defaults(config));
    let cancel = CancellationToken::new();

    let status = tokio::spawn({
        let controller = Arc::clone(&controller);
        let cancel = cancel.clone();
        async move { controller.start(cancel).await }
    });

    let traffic = generator.map(|generator| {
        let controller = Arc::clone(&controller);
        let cancel = cancel.clone();
        tokio::spawn(async move { driver::run_generator(&controller, generator, cancel).await })
    });

    tokio::select! {
        () = driver::run_console(&controller, cancel.clone()) => info!("console quit"),
        result = tokio::signal::ctrl_c() => {
            result.context("listening for Ctrl-C")?;
            info!("interrupted");
        }
    }

    cancel.cancel();
    if let Some(traffic) = traffic
        && let Err(e) = traffic.await
    {
        warn!(%e, "request generator task failed");
    }

    let report = controller.stop().await;
    if let Err(e) = status.await {
        warn!(%e, "status task failed");
    }

    info!(
        settled = report.settled,
        abandoned = report.abandoned,
        "elevator simulator shut down"
    );
    Ok(())
}
