// racer_sim/src/lib.rs

use bevy::prelude::*;

use crate::simulation::config::ConfigPlugin;
use crate::simulation::core::simulation_setup::SimulationSetupPlugin;
use crate::simulation::plugins::agents::AgentPlugin;
use crate::simulation::plugins::sensors::rangefinder::RangefinderPlugin;
use crate::simulation::plugins::vehicles::car::CarPlugin;
use crate::simulation::plugins::world::track::TrackPlugin;

// This prelude is for convenience for other files WITHIN the racer_sim crate.
pub mod prelude;

pub mod cli;
pub mod simulation;

/// Everything needed to race: config loading, the fixed race tick, the
/// track, the cars, their rangefinders and the agents driving them.
///
/// Expects a `ScenarioConfig` resource, `AppState` and avian's physics
/// plugins (scheduled in `FixedUpdate`) to be set up by the binary.
pub struct RacerSimulationPlugin;

impl Plugin for RacerSimulationPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins((
            ConfigPlugin,
            SimulationSetupPlugin,
            TrackPlugin,
            CarPlugin,
            RangefinderPlugin,
            AgentPlugin,
        ));
    }
}
