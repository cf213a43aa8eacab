// racer_sim/src/cli.rs

use bevy::prelude::Resource;
use clap::Parser;
use std::path::PathBuf;

/// Racer: a rangefinder-driven car racing simulator.
///
/// Runs a scenario of training, racing and player agents on one track.
#[derive(Parser, Debug, Resource, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// The path to the scenario TOML file to run.
    #[arg(short, long, default_value = "assets/scenarios/training.toml")]
    pub scenario: PathBuf,

    /// Run without a window or renderer.
    #[arg(long, default_value_t = false)]
    pub headless: bool,

    /// Exit after this many race ticks.
    #[arg(long)]
    pub ticks: Option<u64>,
}
