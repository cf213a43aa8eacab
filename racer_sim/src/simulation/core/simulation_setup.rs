// racer_sim/src/simulation/core/simulation_setup.rs

use std::time::Duration;

use avian3d::prelude::{Gravity, PhysicsSet};

use crate::prelude::*;
use crate::simulation::config::ResolvedAgents;
use crate::simulation::core::prng::SimulationRng;

/// Stops the app after a fixed number of race ticks. `None` runs forever.
#[derive(Resource, Debug, Clone, Copy, Default)]
pub struct TickBudget {
    pub remaining: Option<u64>,
}

/// Counts race ticks since entering `Running`.
#[derive(Resource, Debug, Clone, Copy, Default)]
pub struct RaceClock {
    pub ticks: u64,
}

pub struct SimulationSetupPlugin;

impl Plugin for SimulationSetupPlugin {
    fn build(&self, app: &mut App) {
        let simulation = app
            .world()
            .get_resource::<ScenarioConfig>()
            .map(|config| config.simulation.clone())
            .unwrap_or_default();

        // --- Deterministic PRNG ---
        if simulation.seed.is_none() {
            warn!("No seed in scenario; training weights will not be reproducible.");
        }
        app.insert_resource(SimulationRng::from_seed(simulation.seed));

        // --- Fixed race tick ---
        let rate = if simulation.tick_rate_hz > 0.0 {
            simulation.tick_rate_hz
        } else {
            warn!(
                "tick_rate_hz must be positive, got {}; using 60 Hz",
                simulation.tick_rate_hz
            );
            60.0
        };
        app.insert_resource(Time::<Fixed>::from_duration(Duration::from_secs_f64(
            1.0 / rate,
        )))
        .insert_resource(Gravity(Vec3::from_array(simulation.gravity)))
        .init_resource::<TickBudget>()
        .init_resource::<RaceClock>();

        // --- Spawning pipeline ---
        app.configure_sets(
            OnEnter(AppState::SceneBuilding),
            (
                SceneBuildSet::CreateRequests,
                SceneBuildSet::ProcessVehicle,
                SceneBuildSet::ProcessSensors,
                SceneBuildSet::ProcessControllers,
                SceneBuildSet::Physics,
                SceneBuildSet::Finalize,
                SceneBuildSet::Cleanup,
            )
                .chain(),
        );

        app.add_systems(
            OnEnter(AppState::SceneBuilding),
            (
                spawn_agent_shells.in_set(SceneBuildSet::CreateRequests),
                cleanup_spawn_requests.in_set(SceneBuildSet::Cleanup),
                transition_to_running
                    .in_set(SceneBuildSet::Cleanup)
                    .after(cleanup_spawn_requests),
            ),
        );

        // --- Race tick ---
        // Physics runs inside FixedUpdate, between actuation and read-back.
        app.configure_sets(
            FixedUpdate,
            (
                SimulationSet::Decision,
                SimulationSet::Actuation,
                PhysicsSet::Prepare,
                PhysicsSet::StepSimulation,
                PhysicsSet::Sync,
                SimulationSet::StateSync,
                SimulationSet::Sensors,
                SimulationSet::Localization,
                SimulationSet::Progress,
            )
                .chain(),
        );
        for set in [
            SimulationSet::Decision,
            SimulationSet::Actuation,
            SimulationSet::StateSync,
            SimulationSet::Sensors,
            SimulationSet::Localization,
            SimulationSet::Progress,
        ] {
            app.configure_sets(FixedUpdate, set.run_if(in_state(AppState::Running)));
        }

        app.add_systems(
            FixedUpdate,
            count_ticks
                .in_set(SimulationSet::Progress)
                .run_if(in_state(AppState::Running)),
        );
    }
}

fn spawn_agent_shells(mut commands: Commands, resolved_agents: Res<ResolvedAgents>) {
    for (index, agent_config) in resolved_agents.0.iter().enumerate() {
        info!(
            "[SPAWN] Posting spawn request for agent '{}' ({:?})",
            agent_config.name, agent_config.role
        );
        commands.spawn((
            Name::new(agent_config.name.clone()),
            Transform::default(),
            SpawnAgentConfigRequest {
                index,
                config: agent_config.clone(),
            },
        ));
    }
}

fn cleanup_spawn_requests(mut commands: Commands, query: Query<Entity, With<SpawnAgentConfigRequest>>) {
    debug!("[CLEANUP] Removing spawn request components.");
    for entity in &query {
        commands.entity(entity).remove::<SpawnAgentConfigRequest>();
    }
}

fn transition_to_running(mut next_state: ResMut<NextState<AppState>>) {
    info!("Scene building complete. Transitioning to Running state.");
    next_state.set(AppState::Running);
}

fn count_ticks(
    mut clock: ResMut<RaceClock>,
    mut budget: ResMut<TickBudget>,
    mut exit: EventWriter<AppExit>,
) {
    clock.ticks += 1;
    if let Some(remaining) = budget.remaining.as_mut() {
        *remaining = remaining.saturating_sub(1);
        if *remaining == 0 {
            info!("Tick budget exhausted after {} ticks, exiting.", clock.ticks);
            exit.write(AppExit::Success);
        }
    }
}
