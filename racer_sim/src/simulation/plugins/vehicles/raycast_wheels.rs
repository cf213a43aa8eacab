// racer_sim/src/simulation/plugins/vehicles/raycast_wheels.rs

//! A four-wheel raycast vehicle on top of an avian rigid body. Each wheel
//! casts down from its mount, pushes the chassis up with a spring-damper and
//! transmits engine, brake and lateral grip forces at the contact.

use avian3d::prelude::*;
use bevy::prelude::*;
use nalgebra::Translation3;

use racer_core::prelude::{Pose, RigConfig, Rotation, VehicleConstraint, VehicleState};
use racer_core::types::{basis, Point, Vec3 as CoreVec3};

use crate::simulation::core::layers::sensor_mask;
use crate::simulation::core::transforms::{
    point_to_bevy, pose_to_transform, transform_to_pose, vec_from_bevy, vec_to_bevy,
};

/// Suspension velocities below this are treated as zero.
const DAMPER_DEADZONE: f32 = 0.05;
/// Rebound is damped this much softer than compression.
const REBOUND_SCALE: f32 = 0.4;
/// The damper never exceeds this fraction of the spring force.
const DAMPER_LIMIT: f32 = 0.6;

// =========================================================================
// == Components ==
// =========================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelState {
    pub engine_force: f32,
    pub brake: f32,
    /// Steering angle in radians, positive to the left.
    pub steering: f32,
    /// Current mount-to-hub distance.
    pub suspension_length: f32,
    pub in_contact: bool,
    /// Accumulated roll angle, for the visuals.
    pub spin: f32,
}

/// Per-wheel state of a raycast vehicle, indexed by `WheelSlot`.
#[derive(Component, Debug, Clone)]
pub struct RaycastWheels {
    pub config: RigConfig,
    pub wheels: [WheelState; 4],
}

impl RaycastWheels {
    pub fn new(config: RigConfig) -> Self {
        let rest = WheelState {
            engine_force: 0.0,
            brake: 0.0,
            steering: 0.0,
            suspension_length: config.suspension.rest_length,
            in_contact: false,
            spin: 0.0,
        };
        Self {
            config,
            wheels: [rest; 4],
        }
    }

    /// Where the suspension ray starts, in chassis space: one rest length
    /// above the wheel's rest position.
    pub fn mount_point(&self, wheel: usize) -> CoreVec3 {
        self.config.connection_points[wheel] + basis::up() * self.config.suspension.rest_length
    }

    /// The hub in chassis space, with steering and spin applied.
    pub fn wheel_local_pose(&self, wheel: usize) -> Pose {
        let state = &self.wheels[wheel];
        let hub = self.mount_point(wheel) - basis::up() * state.suspension_length;
        let steer = Rotation::from_axis_angle(&CoreVec3::y_axis(), state.steering);
        let spin = Rotation::from_axis_angle(&CoreVec3::x_axis(), state.spin);
        Pose::from_parts(Translation3::from(hub), steer * spin)
    }

    /// Furthest a ray looks for ground: full extension plus the wheel.
    pub fn ray_length(&self) -> f32 {
        2.0 * self.config.suspension.rest_length + self.config.wheel_radius
    }

    fn relax(&mut self) {
        let rest = self.config.suspension.rest_length;
        for wheel in &mut self.wheels {
            wheel.suspension_length = rest;
            wheel.in_contact = false;
        }
    }
}

// =========================================================================
// == Wheel Physics ==
// =========================================================================

/// Spring plus a one-sided, clamped damper. `suspension_vel` is the contact
/// point velocity along the ground normal; negative means compressing.
pub fn suspension_force(compression: f32, suspension_vel: f32, stiffness: f32, damping: f32) -> f32 {
    let v = if suspension_vel.abs() < DAMPER_DEADZONE {
        0.0
    } else {
        suspension_vel
    };
    let v = if v > 0.0 { v * REBOUND_SCALE } else { v };

    let spring = stiffness * compression;
    let limit = spring.abs() * DAMPER_LIMIT;
    let damper = (-damping * v).clamp(-limit, limit);

    (spring + damper).max(0.0)
}

/// What the physics engine knows about the chassis this tick.
#[derive(Debug, Clone, Copy)]
pub struct ChassisKinematics {
    pub pose: Pose,
    pub linear_velocity: CoreVec3,
    pub angular_velocity: CoreVec3,
    /// World-space center of mass.
    pub center_of_mass: Point,
}

impl ChassisKinematics {
    pub fn point_velocity(&self, point: &Point) -> CoreVec3 {
        self.linear_velocity + self.angular_velocity.cross(&(point - self.center_of_mass))
    }
}

/// The net push of one wheel on the chassis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelOutput {
    pub force: CoreVec3,
    pub torque: CoreVec3,
    pub suspension_length: f32,
    pub in_contact: bool,
    /// Contact speed along the wheel's heading.
    pub rolling_speed: f32,
}

/// Forces from one wheel given the distance its ray travelled before
/// hitting ground (`None` when airborne).
pub fn wheel_forces(
    wheels: &RaycastWheels,
    wheel: usize,
    chassis: &ChassisKinematics,
    hit_distance: Option<f32>,
) -> WheelOutput {
    let config = &wheels.config;
    let tuning = &config.suspension;
    let state = &wheels.wheels[wheel];
    let rest = tuning.rest_length;

    let airborne = WheelOutput {
        force: CoreVec3::zeros(),
        torque: CoreVec3::zeros(),
        suspension_length: rest,
        in_contact: false,
        rolling_speed: 0.0,
    };
    let Some(distance) = hit_distance.filter(|d| d.is_finite()) else {
        return airborne;
    };

    let suspension_length = (distance - config.wheel_radius).clamp(0.0, 2.0 * rest);
    let compression = rest - suspension_length;
    if compression <= 0.0 {
        return WheelOutput {
            suspension_length,
            ..airborne
        };
    }

    let rotation = chassis.pose.rotation;
    let up = rotation * basis::up();
    let mount = chassis.pose * Point::from(wheels.mount_point(wheel));
    let contact = mount - up * distance;

    let point_vel = chassis.point_velocity(&contact);
    let suspension_vel = point_vel.dot(&up);
    let damping = if suspension_vel < 0.0 {
        tuning.compression
    } else {
        tuning.damping
    };
    let normal_force = tuning.chassis_mass
        * suspension_force(compression, suspension_vel, tuning.stiffness, damping);

    let steer = Rotation::from_axis_angle(&CoreVec3::y_axis(), state.steering);
    let forward = rotation * (steer * basis::forward());
    let side = rotation * (steer * basis::right());
    let v_long = point_vel.dot(&forward);
    let v_lat = point_vel.dot(&side);

    let drive = forward * (state.engine_force - state.brake * v_long.clamp(-1.0, 1.0));
    let grip = -side * v_lat.clamp(-1.0, 1.0) * tuning.wheel_friction * normal_force;

    let r = contact - chassis.center_of_mass;
    // Lateral grip acts closer to the center of mass height, less roll.
    let r_grip = r - up * (r.dot(&up) * (1.0 - tuning.roll_influence));

    let normal = up * normal_force;
    WheelOutput {
        force: normal + drive + grip,
        torque: r.cross(&(normal + drive)) + r_grip.cross(&grip),
        suspension_length,
        in_contact: true,
        rolling_speed: v_long,
    }
}

// =========================================================================
// == Physics Constraint ==
// =========================================================================

/// The chassis components the rig reads back after a physics step.
pub struct ChassisReadback<'a> {
    pub transform: &'a Transform,
    pub linear_velocity: &'a LinearVelocity,
    pub wheels: &'a RaycastWheels,
}

impl VehicleState for ChassisReadback<'_> {
    fn num_wheels(&self) -> usize {
        self.wheels.wheels.len()
    }

    fn chassis_pose(&self) -> Pose {
        transform_to_pose(self.transform)
    }

    fn wheel_world_pose(&self, wheel: usize) -> Pose {
        self.chassis_pose() * self.wheels.wheel_local_pose(wheel)
    }

    fn linear_velocity(&self) -> CoreVec3 {
        vec_from_bevy(self.linear_velocity.0)
    }
}

/// The chassis components of one car, borrowed for a tick so the rig can
/// drive them.
pub struct ChassisConstraint<'a> {
    pub transform: &'a mut Transform,
    pub linear_velocity: &'a mut LinearVelocity,
    pub angular_velocity: &'a mut AngularVelocity,
    pub force: &'a mut ExternalForce,
    pub torque: &'a mut ExternalTorque,
    pub wheels: &'a mut RaycastWheels,
}

impl ChassisConstraint<'_> {
    fn readback(&self) -> ChassisReadback<'_> {
        ChassisReadback {
            transform: &*self.transform,
            linear_velocity: &*self.linear_velocity,
            wheels: &*self.wheels,
        }
    }
}

impl VehicleState for ChassisConstraint<'_> {
    fn num_wheels(&self) -> usize {
        self.readback().num_wheels()
    }

    fn chassis_pose(&self) -> Pose {
        self.readback().chassis_pose()
    }

    fn wheel_world_pose(&self, wheel: usize) -> Pose {
        self.readback().wheel_world_pose(wheel)
    }

    fn linear_velocity(&self) -> CoreVec3 {
        self.readback().linear_velocity()
    }
}

impl VehicleConstraint for ChassisConstraint<'_> {
    fn set_chassis_pose(&mut self, pose: Pose) {
        *self.transform = pose_to_transform(&pose);
    }

    fn clear_motion(&mut self) {
        self.linear_velocity.0 = Vec3::ZERO;
        self.angular_velocity.0 = Vec3::ZERO;
        self.force.clear();
        self.torque.clear();
    }

    fn reset_suspension(&mut self) {
        self.wheels.relax();
    }

    fn apply_engine_force(&mut self, force: f32, wheel: usize) {
        self.wheels.wheels[wheel].engine_force = force;
    }

    fn set_brake(&mut self, force: f32, wheel: usize) {
        self.wheels.wheels[wheel].brake = force;
    }

    fn set_steering_value(&mut self, angle: f32, wheel: usize) {
        self.wheels.wheels[wheel].steering = angle;
    }
}

// =========================================================================
// == Runtime System ==
// =========================================================================

/// Casts every wheel's suspension ray and loads the summed wheel forces into
/// the chassis for the coming physics step.
pub fn apply_wheel_forces(
    time: Res<Time>,
    spatial_query: SpatialQuery,
    mut query: Query<(
        Entity,
        &Transform,
        &LinearVelocity,
        &AngularVelocity,
        &mut RaycastWheels,
        &mut ExternalForce,
        &mut ExternalTorque,
    )>,
) {
    let dt = time.delta_secs();
    for (entity, transform, lin_vel, ang_vel, mut wheels, mut force, mut torque) in &mut query {
        let pose = transform_to_pose(transform);
        let chassis = ChassisKinematics {
            pose,
            linear_velocity: vec_from_bevy(lin_vel.0),
            angular_velocity: vec_from_bevy(ang_vel.0),
            center_of_mass: pose * Point::from(wheels.config.center_of_mass_offset),
        };
        let filter = SpatialQueryFilter::from_mask(sensor_mask()).with_excluded_entities([entity]);
        let Ok(down) = Dir3::new(vec_to_bevy(&(pose.rotation * -basis::up()))) else {
            continue;
        };
        let ray_length = wheels.ray_length();

        let mut total_force = CoreVec3::zeros();
        let mut total_torque = CoreVec3::zeros();
        for wheel in 0..wheels.wheels.len() {
            let mount = pose * Point::from(wheels.mount_point(wheel));
            let hit = spatial_query
                .cast_ray(point_to_bevy(&mount), down, ray_length, true, &filter)
                .map(|hit| hit.distance);

            let out = wheel_forces(&wheels, wheel, &chassis, hit);
            total_force += out.force;
            total_torque += out.torque;

            let radius = wheels.config.wheel_radius.max(f32::EPSILON);
            let state = &mut wheels.wheels[wheel];
            state.suspension_length = out.suspension_length;
            state.in_contact = out.in_contact;
            state.spin = (state.spin - out.rolling_speed / radius * dt) % std::f32::consts::TAU;
        }

        force.set_force(vec_to_bevy(&total_force));
        torque.set_torque(vec_to_bevy(&total_torque));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use racer_core::prelude::SuspensionTuning;

    fn config() -> RigConfig {
        RigConfig {
            wheel_radius: 0.3,
            wheel_width: 0.1,
            connection_points: [
                CoreVec3::new(-0.8, -0.3, -1.3),
                CoreVec3::new(0.8, -0.3, -1.3),
                CoreVec3::new(-0.8, -0.3, 1.3),
                CoreVec3::new(0.8, -0.3, 1.3),
            ],
            chassis_half_extents: CoreVec3::new(0.9, 0.4, 2.0),
            center_of_mass_offset: CoreVec3::zeros(),
            suspension: SuspensionTuning::default(),
        }
    }

    fn at_rest() -> ChassisKinematics {
        ChassisKinematics {
            pose: Pose::identity(),
            linear_velocity: CoreVec3::zeros(),
            angular_velocity: CoreVec3::zeros(),
            center_of_mass: Point::origin(),
        }
    }

    #[test]
    fn suspension_force_is_spring_plus_limited_damper() {
        assert_abs_diff_eq!(suspension_force(0.01, 0.0, 1000.0, 500.0), 10.0);
        // Tiny velocities fall in the deadzone.
        assert_abs_diff_eq!(suspension_force(0.01, -0.01, 1000.0, 500.0), 10.0);
        // Fast compression is capped at 60% extra.
        assert_abs_diff_eq!(suspension_force(0.01, -5.0, 1000.0, 500.0), 16.0, epsilon = 1e-4);
        // Rebound can pull down at most 60%.
        assert_abs_diff_eq!(suspension_force(0.01, 5.0, 1000.0, 500.0), 4.0, epsilon = 1e-4);
        // Never pulls.
        assert_abs_diff_eq!(suspension_force(0.0, 3.0, 1000.0, 500.0), 0.0);
    }

    #[test]
    fn wheel_at_rest_sits_on_its_part_position() {
        let wheels = RaycastWheels::new(config());
        let pose = wheels.wheel_local_pose(2);
        assert_abs_diff_eq!(pose.translation.vector, CoreVec3::new(-0.8, -0.3, 1.3), epsilon = 1e-6);
    }

    #[test]
    fn steering_turns_the_hub_left() {
        let mut wheels = RaycastWheels::new(config());
        wheels.wheels[0].steering = 0.15;
        let forward = wheels.wheel_local_pose(0).rotation * basis::forward();
        assert!(forward.x < 0.0);
        assert_abs_diff_eq!(forward.norm(), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn compressed_wheel_pushes_up() {
        let wheels = RaycastWheels::new(config());
        let rest = wheels.config.suspension.rest_length;
        // Ground a little closer than full rest length.
        let out = wheel_forces(&wheels, 0, &at_rest(), Some(rest + 0.3 - 0.01));

        assert!(out.in_contact);
        assert_abs_diff_eq!(out.suspension_length, rest - 0.01, epsilon = 1e-6);
        let expected = 2000.0 * 1000.0 * 0.01;
        assert_abs_diff_eq!(out.force.y, expected, epsilon = 1.0);
        assert_abs_diff_eq!(out.force.x, 0.0, epsilon = 1e-4);
    }

    #[test]
    fn airborne_wheel_does_nothing() {
        let mut wheels = RaycastWheels::new(config());
        wheels.wheels[2].engine_force = 3000.0;
        let out = wheel_forces(&wheels, 2, &at_rest(), None);

        assert!(!out.in_contact);
        assert_eq!(out.force, CoreVec3::zeros());
        assert_abs_diff_eq!(out.suspension_length, wheels.config.suspension.rest_length);
    }

    #[test]
    fn engine_drives_forward_and_grip_resists_sliding() {
        let mut wheels = RaycastWheels::new(config());
        wheels.wheels[2].engine_force = 3000.0;
        let mut sliding = at_rest();
        sliding.linear_velocity = CoreVec3::new(2.0, 0.0, 0.0);

        let out = wheel_forces(&wheels, 2, &sliding, Some(0.3));

        // Forward is -Z; sliding right (+X) is opposed.
        assert!(out.force.z < -2999.0);
        assert!(out.force.x < 0.0);
    }

    #[test]
    fn brake_opposes_rolling() {
        let mut wheels = RaycastWheels::new(config());
        wheels.wheels[3].brake = 1000.0;
        let mut rolling = at_rest();
        rolling.linear_velocity = CoreVec3::new(0.0, 0.0, -5.0);

        let out = wheel_forces(&wheels, 3, &rolling, Some(0.3));

        assert_abs_diff_eq!(out.rolling_speed, 5.0, epsilon = 1e-5);
        assert_abs_diff_eq!(out.force.z, 1000.0, epsilon = 1e-2);
    }

    #[test]
    fn readback_reports_what_the_constraint_drove() {
        let mut transform =
            Transform::from_xyz(1.0, 0.6, -2.0).with_rotation(Quat::from_rotation_y(0.3));
        let mut lin_vel = LinearVelocity(Vec3::new(0.0, 0.0, -4.0));
        let mut ang_vel = AngularVelocity::default();
        let mut force = ExternalForce::default();
        let mut torque = ExternalTorque::default();
        let mut wheels = RaycastWheels::new(config());

        let mut chassis = ChassisConstraint {
            transform: &mut transform,
            linear_velocity: &mut lin_vel,
            angular_velocity: &mut ang_vel,
            force: &mut force,
            torque: &mut torque,
            wheels: &mut wheels,
        };
        chassis.set_steering_value(0.2, 0);
        chassis.set_steering_value(0.2, 1);
        let driven_pose = chassis.chassis_pose();
        let driven_wheels: Vec<Pose> = (0..4).map(|w| chassis.wheel_world_pose(w)).collect();

        let readback = ChassisReadback {
            transform: &transform,
            linear_velocity: &lin_vel,
            wheels: &wheels,
        };

        assert_eq!(readback.num_wheels(), 4);
        assert_eq!(readback.chassis_pose(), driven_pose);
        for (w, pose) in driven_wheels.iter().enumerate() {
            assert_eq!(readback.wheel_world_pose(w), *pose);
        }
        assert_abs_diff_eq!(readback.linear_velocity(), CoreVec3::new(0.0, 0.0, -4.0));
        // Steering shows up in the front wheel poses only.
        let front = readback.wheel_world_pose(0).rotation;
        let rear = readback.wheel_world_pose(2).rotation;
        assert!(front.angle_to(&rear) > 0.1);
    }
}
