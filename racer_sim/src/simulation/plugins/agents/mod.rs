// racer_sim/src/simulation/plugins/agents/mod.rs

//! Turns each spawn request into a driving agent: builds its controller,
//! assembles the core `Agent` from the classified car and places it on the
//! track. Also owns the per-tick decision and bookkeeping systems.

pub mod decision;
pub mod progress;

use rand::Rng;

use crate::prelude::*;
use crate::simulation::config::LoadedTrack;
use crate::simulation::core::prng::SimulationRng;
use crate::simulation::core::transforms::pose_to_transform;
use crate::simulation::plugins::vehicles::car::{PartVisual, PendingVehicle};
use crate::simulation::plugins::world::track::CollisionIndex;
use racer_core::prelude::{BodyHandle, ControllerError};

/// The controller built for an agent that is still being assembled. `None`
/// means the agent is driven from the keyboard.
#[derive(Component, Debug)]
pub struct PendingController(pub Option<Box<dyn DrivingController>>);

/// Marks agents whose intents come from the keyboard.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct KeyboardDriven;

pub struct AgentPlugin;

impl Plugin for AgentPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            OnEnter(AppState::SceneBuilding),
            (
                build_controllers.in_set(SceneBuildSet::ProcessControllers),
                finalize_agents.in_set(SceneBuildSet::Finalize),
            ),
        )
        .add_plugins((decision::DecisionPlugin, progress::ProgressPlugin));
    }
}

/// Builds the controller an agent config asks for. Player agents are always
/// keyboard driven.
pub fn build_controller<R: Rng + ?Sized>(
    config: &AgentConfig,
    rng: &mut R,
) -> Result<Option<Box<dyn DrivingController>>, ControllerError> {
    if config.role == AgentRole::Player {
        return Ok(None);
    }
    let inputs = NetworkController::input_size(config.rangefinder.reading_len());
    let controller: Box<dyn DrivingController> = match &config.controller {
        ControllerConfig::Network {
            weights: Some(weights),
            threshold,
            ..
        } => Box::new(NetworkController::from_weights(inputs, weights, *threshold)?),
        ControllerConfig::Network {
            weights: None,
            stddev,
            threshold,
        } => Box::new(NetworkController::random(inputs, *stddev, *threshold, rng)?),
        ControllerConfig::WallFollower(follower) => Box::new(*follower),
        ControllerConfig::Keyboard => return Ok(None),
    };
    Ok(Some(controller))
}

// =========================================================================
// == Spawning Systems ==
// =========================================================================

fn build_controllers(
    mut commands: Commands,
    mut rng: ResMut<SimulationRng>,
    request_query: Query<(Entity, &Name, &SpawnAgentConfigRequest), With<PendingVehicle>>,
) {
    for (entity, name, request) in &request_query {
        match build_controller(&request.config, &mut rng.0) {
            Ok(controller) => {
                info!(
                    "  -> '{}': {} controller",
                    name.as_str(),
                    controller.as_ref().map_or("Keyboard", |c| c.kind())
                );
                commands.entity(entity).insert(PendingController(controller));
            }
            Err(e) => {
                error!(
                    "[SPAWN] Cannot build the controller of '{}': {}. Agent not spawned.",
                    name.as_str(),
                    e
                );
                commands.entity(entity).despawn();
            }
        }
    }
}

fn finalize_agents(
    mut commands: Commands,
    track: Res<LoadedTrack>,
    mut collisions: ResMut<CollisionIndex>,
    mut query: Query<(
        Entity,
        &SpawnAgentConfigRequest,
        &PendingVehicle,
        &mut PendingController,
    )>,
    visuals: Query<(Entity, &PartVisual)>,
) {
    for (entity, request, pending, mut controller) in &mut query {
        let config = &request.config;
        let mut agent = Agent::new(
            config.name.clone(),
            config.role,
            pending.body.clone(),
            pending.rig.clone(),
            controller.0.take(),
            config.spawn,
            config.car.spawn_height,
        );

        let pose = match agent.respawn(&track.track) {
            Ok(pose) => pose,
            Err(e) => {
                error!(
                    "[SPAWN] Cannot place '{}' on '{}': {}. Agent not spawned.",
                    config.name,
                    track.track.name(),
                    e
                );
                collisions.0.unregister(BodyHandle::from_entity(entity));
                for (visual_entity, visual) in &visuals {
                    if visual.agent == entity {
                        commands.entity(visual_entity).despawn();
                    }
                }
                commands.entity(entity).despawn();
                continue;
            }
        };

        info!(
            "[SPAWN] '{}' ({:?}, {}) placed at vroad {}",
            config.name,
            config.role,
            agent.controller_kind(),
            agent.progress.furthest_vroad
        );

        let keyboard = agent.controller_kind() == "Keyboard";
        let mut entity_commands = commands.entity(entity);
        entity_commands
            .insert((
                pose_to_transform(&pose),
                RacerAgent(agent),
                AgentId(request.index),
            ))
            .remove::<(PendingVehicle, PendingController)>();
        if keyboard {
            entity_commands.insert(KeyboardDriven);
        }
    }
}
