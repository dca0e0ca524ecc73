//! Parses the command line arguments.
//!
//! Runs one of the prebuilt simulations and prints its traffic report.
//! Basic usage for running the scatter/gather simulation with logging on:
//!
//! ```cargo run -- --simulation scatter-gather --peers 8 --log```

use crate::{
    report::Report,
    simulations::{echo, scatter_gather, SimConfig},
};
use anyhow::Context;
use clap::{Parser, ValueEnum};
use std::{
    fs::{create_dir_all, OpenOptions},
    sync::Arc,
};
use tracing_subscriber::FmtSubscriber;

/// The prebuilt simulations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Simulation {
    Echo,
    ScatterGather,
}

/// Stores the different command line arguments.
#[derive(Debug, Parser)]
#[command(version, about = "Traffic accounting for distributed algorithm simulations")]
pub struct Args {
    /// Logging flag. Used to turn logging on or off.
    #[arg(short, long)]
    pub log: bool,
    /// The simulation to run.
    #[arg(short, long, value_enum, default_value_t = Simulation::Echo)]
    pub simulation: Simulation,
    /// Number of clients or peers.
    #[arg(short, long, default_value_t = SimConfig::default().peers)]
    pub peers: usize,
    /// Number of rounds.
    #[arg(short, long, default_value_t = SimConfig::default().rounds)]
    pub rounds: usize,
    /// Seed of the random choices.
    #[arg(long, default_value_t = SimConfig::default().seed)]
    pub seed: u64,
    /// Number of distinct peer keys.
    #[arg(short, long, default_value_t = SimConfig::default().keys)]
    pub keys: i32,
}

impl Args {
    pub fn config(&self) -> SimConfig {
        SimConfig {
            peers: self.peers,
            rounds: self.rounds,
            seed: self.seed,
            keys: self.keys,
        }
    }
}

/// Parses command line arguments, runs the chosen simulation and prints its
/// report.
pub fn initialize_from_arguments() -> anyhow::Result<()> {
    let cli = Args::parse();
    if cli.log {
        initialize_logging()?;
    }
    let report = run(cli.simulation, &cli.config())?;
    print!("{report}");
    Ok(())
}

/// Runs a simulation and renders its traffic report.
pub fn run(simulation: Simulation, config: &SimConfig) -> anyhow::Result<String> {
    let network = match simulation {
        Simulation::Echo => echo(config).context("echo simulation failed")?,
        Simulation::ScatterGather => scatter_gather(config)
            .context("scatter/gather simulation failed")?
            .into_network(),
    };
    Ok(Report::new(&network).to_string())
}

/// Initializes the event protocol. Only should be called once when the sim starts.
/// Writes every event to a JSON log file in ./logs.
fn initialize_logging() -> anyhow::Result<()> {
    let main_path = "./logs";
    create_dir_all(main_path).context("cannot create the log directory")?;
    let file_path = format!(
        "{}/debug-{}.log",
        main_path,
        chrono::offset::Local::now().format("%y-%m-%d_%H-%M-%S")
    );
    let file = OpenOptions::new()
        .append(true)
        .create(true)
        .open(&file_path)
        .with_context(|| format!("cannot open {file_path}"))?;
    let subscriber = FmtSubscriber::builder()
        .with_max_level(tracing::Level::TRACE)
        .with_writer(Arc::new(file))
        .json()
        .finish();
    // set the global default so all events/logs go to the same subscriber and
    // subsequently the same file
    tracing::subscriber::set_global_default(subscriber)
        .context("a global subscriber is already installed")
}
