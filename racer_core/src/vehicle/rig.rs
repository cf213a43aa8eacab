// racer_core/src/vehicle/rig.rs

use serde::Deserialize;
use tracing::debug;

use crate::types::{Pose, Vec3};
use crate::vehicle::body::VehicleBody;
use crate::vehicle::control::{ControlState, SteeringState, VehicleTuning};
use crate::vehicle::parts::WheelSlot;

// =========================================================================
// == Physics Contract ==
// =========================================================================

/// Read access to a simulated chassis and its wheels. Wheel indices follow
/// `WheelSlot`.
pub trait VehicleState {
    fn num_wheels(&self) -> usize;

    fn chassis_pose(&self) -> Pose;

    /// The simulated world pose of a wheel, including suspension travel and
    /// steering.
    fn wheel_world_pose(&self, wheel: usize) -> Pose;

    fn linear_velocity(&self) -> Vec3;
}

/// The chassis plus four-wheel raycast constraint owned by the physics
/// engine, as driven by the rig.
pub trait VehicleConstraint: VehicleState {
    fn set_chassis_pose(&mut self, pose: Pose);

    /// Zeroes linear and angular velocity and drops accumulated forces.
    fn clear_motion(&mut self);

    /// Returns every wheel to its rest suspension length.
    fn reset_suspension(&mut self);

    fn apply_engine_force(&mut self, force: f32, wheel: usize);

    fn set_brake(&mut self, force: f32, wheel: usize);

    fn set_steering_value(&mut self, angle: f32, wheel: usize);
}

// =========================================================================
// == Configuration ==
// =========================================================================

/// Spring, damper and chassis constants. Loaded from the car prefab.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct SuspensionTuning {
    pub rest_length: f32,
    pub stiffness: f32,
    pub damping: f32,
    pub compression: f32,
    pub wheel_friction: f32,
    pub roll_influence: f32,
    pub chassis_mass: f32,
    pub linear_damping: f32,
    pub angular_damping: f32,
}

impl Default for SuspensionTuning {
    fn default() -> Self {
        Self {
            rest_length: 0.026,
            stiffness: 1000.0,
            damping: 200.0,
            compression: 500.4,
            wheel_friction: 0.45,
            roll_influence: 0.04,
            chassis_mass: 2000.0,
            linear_damping: 0.2,
            angular_damping: 0.2,
        }
    }
}

/// Everything the physics side needs to build the constraint for one car.
#[derive(Debug, Clone, PartialEq)]
pub struct RigConfig {
    pub wheel_radius: f32,
    pub wheel_width: f32,
    /// Wheel mount points in chassis space, indexed by `WheelSlot`.
    pub connection_points: [Vec3; 4],
    pub chassis_half_extents: Vec3,
    pub center_of_mass_offset: Vec3,
    pub suspension: SuspensionTuning,
}

impl RigConfig {
    pub fn from_body(body: &VehicleBody, suspension: SuspensionTuning) -> Self {
        let (wheel_radius, wheel_width) = body.wheel_dimensions();
        Self {
            wheel_radius,
            wheel_width,
            connection_points: body.wheel_connection_points(),
            chassis_half_extents: body.chassis_half_extents(),
            center_of_mass_offset: body.title().center_of_mass_offset(),
            suspension,
        }
    }
}

// =========================================================================
// == Suspension Rig ==
// =========================================================================

/// Rear-wheel drive, front-wheel steer. Turns latched intents into wheel
/// forces and copies the simulated result back onto the visual body.
#[derive(Debug, Clone)]
pub struct SuspensionRig {
    config: RigConfig,
    tuning: VehicleTuning,
    steering: SteeringState,
}

fn assert_four_wheels<C: VehicleState + ?Sized>(constraint: &C) {
    let count = constraint.num_wheels();
    assert!(
        count == 4,
        "vehicle constraint reports {count} wheels; exactly 4 are supported"
    );
}

impl SuspensionRig {
    pub fn new(config: RigConfig, tuning: VehicleTuning) -> Self {
        Self {
            config,
            tuning,
            steering: SteeringState::default(),
        }
    }

    pub fn config(&self) -> &RigConfig {
        &self.config
    }

    pub fn tuning(&self) -> &VehicleTuning {
        &self.tuning
    }

    pub fn steering(&self) -> &SteeringState {
        &self.steering
    }

    /// Consumes a pending reset, then pushes this tick's engine, brake and
    /// steering commands into the constraint.
    pub fn actuate<C: VehicleConstraint + ?Sized>(
        &mut self,
        control: &mut ControlState,
        constraint: &mut C,
        body: &mut VehicleBody,
    ) {
        assert_four_wheels(constraint);

        if let Some(pose) = control.take_reset() {
            self.reset(pose, constraint, body);
        }

        self.steering.step(control, &self.tuning);

        for slot in WheelSlot::ALL {
            let wheel = slot.index();
            if slot.is_rear() {
                constraint.apply_engine_force(self.steering.engine_force, wheel);
                constraint.set_brake(self.steering.brake_force, wheel);
            } else {
                constraint.set_steering_value(self.steering.angle, wheel);
            }
        }
    }

    /// Reads the simulated chassis and wheels back onto the visual body.
    pub fn tick<C: VehicleState + ?Sized>(&self, constraint: &C, body: &mut VehicleBody) {
        assert_four_wheels(constraint);

        body.follow_chassis(&constraint.chassis_pose());
        for slot in WheelSlot::ALL {
            body.set_wheel_pose(slot, constraint.wheel_world_pose(slot.index()));
        }
    }

    /// Teleports the car and brings it to rest.
    pub fn reset<C: VehicleConstraint + ?Sized>(
        &mut self,
        pose: Pose,
        constraint: &mut C,
        body: &mut VehicleBody,
    ) {
        debug!(
            "Resetting chassis to ({:.2}, {:.2}, {:.2})",
            pose.translation.x, pose.translation.y, pose.translation.z
        );
        constraint.set_chassis_pose(pose);
        constraint.clear_motion();
        constraint.reset_suspension();
        self.steering.clear();
        for slot in WheelSlot::ALL {
            let wheel = slot.index();
            constraint.apply_engine_force(0.0, wheel);
            constraint.set_brake(0.0, wheel);
            constraint.set_steering_value(0.0, wheel);
        }
        self.tick(constraint, body);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::types::{Point, Rotation};
    use crate::vehicle::parts::{MeshGeometry, MeshPart, SourceTitle};
    use approx::assert_abs_diff_eq;
    use nalgebra::Point3;

    /// A constraint that integrates nothing; it records commands and moves
    /// the chassis forward by the net rear engine force each step.
    #[derive(Debug)]
    pub(crate) struct MockConstraint {
        pub wheels: usize,
        pub pose: Pose,
        pub velocity: Vec3,
        pub engine: [f32; 4],
        pub brake: [f32; 4],
        pub steering: [f32; 4],
        pub suspension_resets: usize,
    }

    impl MockConstraint {
        pub fn new() -> Self {
            Self {
                wheels: 4,
                pose: Pose::identity(),
                velocity: Vec3::zeros(),
                engine: [0.0; 4],
                brake: [0.0; 4],
                steering: [0.0; 4],
                suspension_resets: 0,
            }
        }

        pub fn step(&mut self, dt: f32) {
            let force: f32 = self.engine.iter().sum();
            self.velocity += crate::types::basis::forward() * (force / 2000.0) * dt;
            self.pose.translation.vector += self.velocity * dt;
        }
    }

    impl VehicleState for MockConstraint {
        fn num_wheels(&self) -> usize {
            self.wheels
        }
        fn chassis_pose(&self) -> Pose {
            self.pose
        }
        fn wheel_world_pose(&self, wheel: usize) -> Pose {
            self.pose * Pose::translation(wheel as f32, -0.3, 0.0)
        }
        fn linear_velocity(&self) -> Vec3 {
            self.velocity
        }
    }

    impl VehicleConstraint for MockConstraint {
        fn set_chassis_pose(&mut self, pose: Pose) {
            self.pose = pose;
        }
        fn clear_motion(&mut self) {
            self.velocity = Vec3::zeros();
        }
        fn reset_suspension(&mut self) {
            self.suspension_resets += 1;
        }
        fn apply_engine_force(&mut self, force: f32, wheel: usize) {
            self.engine[wheel] = force;
        }
        fn set_brake(&mut self, force: f32, wheel: usize) {
            self.brake[wheel] = force;
        }
        fn set_steering_value(&mut self, angle: f32, wheel: usize) {
            self.steering[wheel] = angle;
        }
    }

    fn boxed(name: &str, at: Vec3) -> MeshPart {
        let geometry = MeshGeometry {
            vertices: vec![Point3::new(-0.1, -0.3, -0.3), Point3::new(0.1, 0.3, 0.3)],
            ..Default::default()
        };
        MeshPart::new(name, geometry, at)
    }

    pub(crate) fn test_body() -> VehicleBody {
        let parts = vec![
            boxed(":HB", Vec3::new(0.0, 0.5, 0.0)),
            boxed(":HLFW", Vec3::new(-0.8, 0.0, -1.4)),
            boxed(":HRFW", Vec3::new(0.8, 0.0, -1.4)),
            boxed(":HLRW", Vec3::new(-0.8, 0.0, 1.3)),
            boxed(":HRRW", Vec3::new(0.8, 0.0, 1.3)),
        ];
        VehicleBody::from_parts(parts, SourceTitle::Nfs4).unwrap()
    }

    fn rig(body: &VehicleBody) -> SuspensionRig {
        SuspensionRig::new(
            RigConfig::from_body(body, SuspensionTuning::default()),
            VehicleTuning::default(),
        )
    }

    #[test]
    fn config_takes_geometry_and_title_offset() {
        let body = test_body();
        let config = RigConfig::from_body(&body, SuspensionTuning::default());
        assert_abs_diff_eq!(config.wheel_radius, 0.3);
        assert_abs_diff_eq!(config.wheel_width, 0.1);
        assert_eq!(config.center_of_mass_offset, Vec3::zeros());
        assert_abs_diff_eq!(config.suspension.rest_length, 0.026);
    }

    #[test]
    fn accelerating_drives_rear_wheels_only() {
        let mut body = test_body();
        let mut rig = rig(&body);
        let mut constraint = MockConstraint::new();
        let mut control = ControlState::default();
        control.apply_acceleration_force(true, false);

        const TICKS: usize = 30;
        for _ in 0..TICKS {
            rig.actuate(&mut control, &mut constraint, &mut body);
            constraint.step(1.0 / 60.0);
            rig.tick(&constraint, &mut body);
        }

        assert_eq!(constraint.engine, [0.0, 0.0, 3000.0, 3000.0]);
        assert_eq!(constraint.brake, [0.0; 4]);
        // Moved along chassis forward (-Z), and the body followed.
        let z = constraint.pose.translation.z;
        assert!(z < 0.0);
        assert_abs_diff_eq!(body.body().pose.translation.z, z);
        assert!(constraint.linear_velocity().norm() > 0.0);
    }

    #[test]
    fn steering_goes_to_front_wheels_only() {
        let mut body = test_body();
        let mut rig = rig(&body);
        let mut constraint = MockConstraint::new();
        let mut control = ControlState::default();
        control.apply_steering_left(true);
        control.apply_braking_force(true);

        for _ in 0..3 {
            rig.actuate(&mut control, &mut constraint, &mut body);
        }

        assert_abs_diff_eq!(constraint.steering[0], 0.03, epsilon = 1e-6);
        assert_abs_diff_eq!(constraint.steering[1], 0.03, epsilon = 1e-6);
        assert_eq!(constraint.steering[2], 0.0);
        assert_eq!(constraint.brake, [0.0, 0.0, 1000.0, 1000.0]);
    }

    #[test]
    fn accelerate_and_reverse_together_accelerates() {
        let mut body = test_body();
        let mut rig = rig(&body);
        let mut constraint = MockConstraint::new();
        let mut control = ControlState::default();
        control.apply_acceleration_force(true, true);

        rig.actuate(&mut control, &mut constraint, &mut body);

        assert_abs_diff_eq!(rig.steering().engine_force, 3000.0);
    }

    #[test]
    fn pending_reset_teleports_and_stops() {
        let mut body = test_body();
        let mut rig = rig(&body);
        let mut constraint = MockConstraint::new();
        constraint.velocity = Vec3::new(0.0, 0.0, -30.0);
        let mut control = ControlState::default();
        control.apply_steering_right(true);
        rig.actuate(&mut control, &mut constraint, &mut body);

        control.apply_steering_right(false);
        control.reset_car(Point::new(5.0, 1.0, 5.0), Rotation::identity());
        rig.actuate(&mut control, &mut constraint, &mut body);

        assert_eq!(constraint.velocity, Vec3::zeros());
        assert_eq!(constraint.suspension_resets, 1);
        assert_abs_diff_eq!(constraint.pose.translation.vector, Vec3::new(5.0, 1.0, 5.0));
        assert_abs_diff_eq!(body.body().pose.translation.vector, Vec3::new(5.0, 1.5, 5.0));
        assert_abs_diff_eq!(
            body.wheel(WheelSlot::RearRight).pose.translation.vector,
            Vec3::new(8.0, 0.7, 5.0)
        );
        // Steering restarts from zero after the reset.
        assert_eq!(rig.steering().angle, 0.0);
    }

    #[test]
    #[should_panic(expected = "exactly 4 are supported")]
    fn six_wheel_constraint_is_rejected() {
        let mut body = test_body();
        let rig = rig(&body);
        let constraint = MockConstraint {
            wheels: 6,
            ..MockConstraint::new()
        };
        rig.tick(&constraint, &mut body);
    }
}
