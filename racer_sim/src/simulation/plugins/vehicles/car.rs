// racer_sim/src/simulation/plugins/vehicles/car.rs

use avian3d::prelude::*;

use crate::cli::Cli;
use crate::prelude::*;
use crate::simulation::core::layers::vehicle_layers;
use crate::simulation::core::transforms::{pose_to_transform, vec_to_bevy};
use crate::simulation::plugins::vehicles::raycast_wheels::{
    apply_wheel_forces, ChassisConstraint, ChassisReadback, RaycastWheels,
};
use crate::simulation::plugins::world::track::CollisionIndex;
use racer_core::prelude::{BodyHandle, CollisionEntity};

// --- Components ---

/// The classified body and rig of an agent that is still being assembled.
#[derive(Component, Debug, Clone)]
pub struct PendingVehicle {
    pub body: VehicleBody,
    pub rig: SuspensionRig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisualPart {
    Body,
    Wheel(WheelSlot),
    Misc(usize),
}

/// A rendered car part. Its transform is copied from the agent's vehicle
/// body every tick.
#[derive(Component, Debug, Clone, Copy)]
pub struct PartVisual {
    pub agent: Entity,
    pub part: VisualPart,
}

pub struct CarPlugin;

impl Plugin for CarPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            OnEnter(AppState::SceneBuilding),
            (
                build_vehicle_bodies.in_set(SceneBuildSet::ProcessVehicle),
                (attach_vehicle_physics, spawn_part_visuals).in_set(SceneBuildSet::Physics),
            ),
        )
        .add_systems(
            FixedUpdate,
            (
                (actuate_vehicles, apply_wheel_forces)
                    .chain()
                    .in_set(SimulationSet::Actuation),
                (sync_vehicle_bodies, update_part_visuals)
                    .chain()
                    .in_set(SimulationSet::StateSync),
            ),
        );
    }
}

// =========================================================================
// == Spawning Systems ==
// =========================================================================

/// Classifies each requested car's parts. A car that cannot be classified
/// cannot exist, so its agent is dropped.
fn build_vehicle_bodies(
    mut commands: Commands,
    request_query: Query<(Entity, &Name, &SpawnAgentConfigRequest)>,
) {
    for (entity, name, request) in &request_query {
        let car = &request.config.car;
        match VehicleBody::from_parts(car.mesh_parts(), car.title) {
            Ok(body) => {
                let rig_config = RigConfig::from_body(&body, car.suspension);
                info!(
                    "  -> '{}': {} car, wheel radius {:.2} m, {} misc parts ({} aliased)",
                    name.as_str(),
                    car.title.as_str(),
                    rig_config.wheel_radius,
                    body.misc().len(),
                    body.aliases().len()
                );
                let rig = SuspensionRig::new(rig_config, car.tuning);
                commands.entity(entity).insert(PendingVehicle { body, rig });
            }
            Err(e) => {
                error!(
                    "[SPAWN] Cannot build the car of '{}': {}. Agent not spawned.",
                    name.as_str(),
                    e
                );
                commands.entity(entity).despawn();
            }
        }
    }
}

fn attach_vehicle_physics(
    mut commands: Commands,
    mut collisions: ResMut<CollisionIndex>,
    query: Query<(Entity, &SpawnAgentConfigRequest, &PendingVehicle), Without<RigidBody>>,
) {
    for (entity, request, pending) in &query {
        let config = pending.rig.config();
        let half = config.chassis_half_extents;
        let chassis_shape = Collider::cuboid(2.0 * half.x, 2.0 * half.y, 2.0 * half.z);
        let collider = Collider::compound(vec![(
            vec_to_bevy(&config.center_of_mass_offset),
            Quat::IDENTITY,
            chassis_shape,
        )]);

        commands.entity(entity).insert((
            RigidBody::Dynamic,
            collider,
            Mass(config.suspension.chassis_mass),
            LinearDamping(config.suspension.linear_damping),
            AngularDamping(config.suspension.angular_damping),
            vehicle_layers(),
            SleepingDisabled,
            CollisionEventsEnabled,
            LinearVelocity::default(),
            AngularVelocity::default(),
            ExternalForce::default(),
            ExternalTorque::default(),
            RaycastWheels::new(config.clone()),
            Visibility::default(),
        ));

        collisions.0.register(
            BodyHandle::from_entity(entity),
            CollisionEntity::Vehicle {
                agent: request.index,
            },
        );
    }
}

/// One box mesh per enabled part. Skipped in headless runs.
fn spawn_part_visuals(
    mut commands: Commands,
    cli: Option<Res<Cli>>,
    meshes: Option<ResMut<Assets<Mesh>>>,
    materials: Option<ResMut<Assets<StandardMaterial>>>,
    query: Query<(Entity, &Name, &PendingVehicle)>,
) {
    if cli.is_some_and(|cli| cli.headless) {
        return;
    }
    let (Some(mut meshes), Some(mut materials)) = (meshes, materials) else {
        return;
    };
    let body_material = materials.add(Color::srgb(0.75, 0.15, 0.1));
    let wheel_material = materials.add(Color::srgb(0.08, 0.08, 0.08));
    let misc_material = materials.add(Color::srgb(0.6, 0.6, 0.65));

    for (agent, name, pending) in &query {
        let body = &pending.body;
        let parts = std::iter::once((VisualPart::Body, body.body(), body_material.clone()))
            .chain(WheelSlot::ALL.map(|slot| {
                (VisualPart::Wheel(slot), body.wheel(slot), wheel_material.clone())
            }))
            .chain(
                body.misc()
                    .iter()
                    .enumerate()
                    .map(|(i, part)| (VisualPart::Misc(i), part, misc_material.clone())),
            );

        for (part, instance, material) in parts {
            if !instance.enabled {
                continue;
            }
            commands.spawn((
                Name::new(format!("{}/{}", name.as_str(), instance.part.name)),
                Mesh3d(meshes.add(part_mesh(instance))),
                MeshMaterial3d(material),
                pose_to_transform(&instance.pose),
                PartVisual { agent, part },
            ));
        }
    }
}

fn part_mesh(instance: &PartInstance) -> Cuboid {
    let half = instance.part.geometry.half_extents();
    Cuboid::new(2.0 * half.x, 2.0 * half.y, 2.0 * half.z)
}

// =========================================================================
// == Runtime Systems ==
// =========================================================================

/// Pushes each agent's latched intents through its rig into the wheels.
fn actuate_vehicles(
    mut query: Query<(
        &mut RacerAgent,
        &mut Transform,
        &mut LinearVelocity,
        &mut AngularVelocity,
        &mut ExternalForce,
        &mut ExternalTorque,
        &mut RaycastWheels,
    )>,
) {
    for (mut agent, mut transform, mut lin_vel, mut ang_vel, mut force, mut torque, mut wheels) in
        &mut query
    {
        let mut chassis = ChassisConstraint {
            transform: &mut *transform,
            linear_velocity: &mut *lin_vel,
            angular_velocity: &mut *ang_vel,
            force: &mut *force,
            torque: &mut *torque,
            wheels: &mut *wheels,
        };
        agent.0.actuate(&mut chassis);
    }
}

/// Copies the simulated chassis and wheel poses back onto the vehicle bodies.
fn sync_vehicle_bodies(
    mut query: Query<(&mut RacerAgent, &Transform, &LinearVelocity, &RaycastWheels)>,
) {
    for (mut agent, transform, linear_velocity, wheels) in &mut query {
        let chassis = ChassisReadback {
            transform,
            linear_velocity,
            wheels,
        };
        agent.0.sync(&chassis);
    }
}

fn update_part_visuals(
    agents: Query<&RacerAgent>,
    mut visuals: Query<(&PartVisual, &mut Transform), Without<RacerAgent>>,
) {
    for (visual, mut transform) in &mut visuals {
        let Ok(agent) = agents.get(visual.agent) else {
            continue;
        };
        let body = &agent.0.body;
        let instance = match visual.part {
            VisualPart::Body => Some(body.body()),
            VisualPart::Wheel(slot) => Some(body.wheel(slot)),
            VisualPart::Misc(i) => body.misc().get(i),
        };
        if let Some(instance) = instance {
            *transform = pose_to_transform(&instance.pose);
        }
    }
}
