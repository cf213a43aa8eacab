// racer_sim/src/main.rs

//! Runs one racing scenario.
//!
//! From the `racer_sim` directory, `cargo run -- --scenario
//! assets/scenarios/training.toml` opens a window; add `--headless --ticks
//! 3600` for a batch training run. Asset paths are relative to the working
//! directory.

use std::time::Duration;

use avian3d::prelude::*;
use bevy::{
    app::ScheduleRunnerPlugin,
    log::LogPlugin,
    prelude::*,
    render::{
        settings::{RenderCreation, WgpuSettings},
        RenderPlugin,
    },
    window::ExitCondition,
    winit::WinitPlugin,
};
use clap::Parser;

use racer_sim::cli::Cli;
use racer_sim::prelude::{AppState, ScenarioConfig};
use racer_sim::simulation::core::simulation_setup::TickBudget;
use racer_sim::RacerSimulationPlugin;

const LOG_FILTER: &str = "info,wgpu_core=error,wgpu_hal=error,racer_sim=debug,racer_core=debug";

fn main() -> AppExit {
    let cli = Cli::parse();

    // --- 1. Load Scenario ---
    let scenario = match ScenarioConfig::load(&cli.scenario) {
        Ok(scenario) => scenario,
        Err(e) => {
            eprintln!(
                "Could not load scenario '{}': {}",
                cli.scenario.display(),
                e
            );
            return AppExit::error();
        }
    };
    let tick_rate = scenario.simulation.tick_rate_hz.max(1.0);

    let mut app = App::new();

    // --- 2. Core Bevy Plugins ---
    let log = LogPlugin {
        filter: LOG_FILTER.to_string(),
        ..default()
    };
    if cli.headless {
        app.add_plugins((
            DefaultPlugins
                .set(log)
                .set(RenderPlugin {
                    render_creation: RenderCreation::Automatic(WgpuSettings {
                        backends: None,
                        ..default()
                    }),
                    ..default()
                })
                .set(WindowPlugin {
                    primary_window: None,
                    exit_condition: ExitCondition::DontExit,
                    close_when_requested: false,
                })
                .disable::<WinitPlugin>(),
            ScheduleRunnerPlugin::run_loop(Duration::from_secs_f64(1.0 / tick_rate)),
        ));
    } else {
        app.add_plugins(DefaultPlugins.set(log));
    }

    // --- 3. Physics ---
    // Stepped inside the fixed race tick, between actuation and read-back.
    app.add_plugins(PhysicsPlugins::new(FixedUpdate));
    if !cli.headless {
        app.add_plugins(PhysicsDebugPlugin::default());
    }

    // --- 4. Scenario & Simulation ---
    // Resources the simulation plugins read while building.
    app.insert_resource(scenario)
        .insert_resource(TickBudget {
            remaining: cli.ticks,
        })
        .insert_resource(cli)
        .init_state::<AppState>()
        .add_plugins(RacerSimulationPlugin);

    app.run()
}
