// racer_core/src/vehicle/control.rs

use serde::Deserialize;

use crate::types::{Point, Pose, Rotation};

// =========================================================================
// == Tuning ==
// =========================================================================

/// Per-vehicle drive limits. Loaded from the car prefab; every field falls
/// back to the stock value when omitted.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct VehicleTuning {
    pub max_engine_force: f32,
    /// Force applied when reversing. Same as `max_engine_force` when unset.
    pub max_reverse_force: Option<f32>,
    pub max_braking_force: f32,
    /// Radians added to or removed from the steering angle per tick.
    pub steering_increment: f32,
    /// Largest steering angle magnitude in radians.
    pub steering_clamp: f32,
}

impl Default for VehicleTuning {
    fn default() -> Self {
        Self {
            max_engine_force: 3000.0,
            max_reverse_force: None,
            max_braking_force: 1000.0,
            steering_increment: 0.01,
            steering_clamp: 0.15,
        }
    }
}

impl VehicleTuning {
    pub fn reverse_force(&self) -> f32 {
        self.max_reverse_force.unwrap_or(self.max_engine_force)
    }
}

// =========================================================================
// == Intents ==
// =========================================================================

/// One tick's worth of driver decisions, as produced by a controller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControlIntents {
    pub accelerate: bool,
    pub reverse: bool,
    pub brake: bool,
    pub left: bool,
    pub right: bool,
}

/// The latched driver input of one vehicle. Setters only record intent; the
/// rig reads it on its next actuation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ControlState {
    accelerate: bool,
    reverse: bool,
    brake: bool,
    steer_left: bool,
    steer_right: bool,
    pending_reset: Option<Pose>,
}

impl ControlState {
    pub fn apply_acceleration_force(&mut self, accelerate: bool, reverse: bool) {
        self.accelerate = accelerate;
        self.reverse = reverse;
    }

    pub fn apply_steering_left(&mut self, apply: bool) {
        self.steer_left = apply;
        if apply {
            self.steer_right = false;
        }
    }

    pub fn apply_steering_right(&mut self, apply: bool) {
        self.steer_right = apply;
        if apply {
            self.steer_left = false;
        }
    }

    pub fn apply_braking_force(&mut self, apply: bool) {
        self.brake = apply;
    }

    /// Requests a teleport. Replaces any reset not yet consumed.
    pub fn reset_car(&mut self, position: Point, orientation: Rotation) {
        self.pending_reset = Some(Pose::from_parts(position.coords.into(), orientation));
    }

    /// Latches a full set of intents at once.
    pub fn apply_intents(&mut self, intents: &ControlIntents) {
        self.apply_acceleration_force(intents.accelerate, intents.reverse);
        self.apply_braking_force(intents.brake);
        // Left is evaluated last so that it wins a left+right conflict.
        self.apply_steering_right(intents.right);
        self.apply_steering_left(intents.left);
    }

    pub fn take_reset(&mut self) -> Option<Pose> {
        self.pending_reset.take()
    }

    pub fn has_pending_reset(&self) -> bool {
        self.pending_reset.is_some()
    }

    pub fn intents(&self) -> ControlIntents {
        ControlIntents {
            accelerate: self.accelerate,
            reverse: self.reverse,
            brake: self.brake,
            left: self.steer_left,
            right: self.steer_right,
        }
    }
}

// =========================================================================
// == Steering State ==
// =========================================================================

/// The forces and steering angle the rig is currently commanding.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SteeringState {
    pub angle: f32,
    pub engine_force: f32,
    pub brake_force: f32,
}

impl SteeringState {
    /// Advances one tick from the latched intents.
    pub fn step(&mut self, control: &ControlState, tuning: &VehicleTuning) {
        self.engine_force = if control.accelerate {
            tuning.max_engine_force
        } else if control.reverse {
            -tuning.reverse_force()
        } else {
            0.0
        };

        self.brake_force = if control.brake {
            tuning.max_braking_force
        } else {
            0.0
        };

        let step = tuning.steering_increment;
        let clamp = tuning.steering_clamp;
        self.angle = if control.steer_left {
            (self.angle + step).min(clamp)
        } else if control.steer_right {
            (self.angle - step).max(-clamp)
        } else if self.angle > 0.0 {
            (self.angle - step).max(0.0)
        } else {
            (self.angle + step).min(0.0)
        };
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
