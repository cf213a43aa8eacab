// racer_core/src/agent/controller.rs

use std::fmt::Debug;

use dyn_clone::DynClone;
use nalgebra::{DMatrix, DVector};
use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::Deserialize;

use crate::error::ControllerError;
use crate::track::TrackLocalization;
use crate::vehicle::control::ControlIntents;

/// Everything a controller gets to see each tick.
#[derive(Debug, Clone, Copy)]
pub struct ControllerInput<'a> {
    /// Flattened rangefinder reading: the forward fan, then up, then down.
    pub ranges: &'a [f32],
    pub localization: TrackLocalization,
    /// Chassis speed in metres per second.
    pub speed: f32,
}

/// The contract for anything that drives a car from its perception.
pub trait DrivingController: Send + Sync + DynClone + Debug {
    fn decide(&mut self, input: &ControllerInput) -> Result<ControlIntents, ControllerError>;

    fn kind(&self) -> &'static str;
}

dyn_clone::clone_trait_object!(DrivingController);

// =========================================================================
// == Network Controller ==
// =========================================================================

/// Output neuron order of `NetworkController`.
const OUTPUTS: usize = 5;

/// A single dense layer with tanh activation. Inputs are the range values
/// followed by the speed; each output above `threshold` switches the matching
/// intent on.
#[derive(Debug, Clone)]
pub struct NetworkController {
    /// `OUTPUTS x (inputs + 1)`, the last column is the bias.
    weights: DMatrix<f32>,
    threshold: f32,
}

impl NetworkController {
    pub const OUTPUTS: usize = OUTPUTS;

    /// Number of network inputs for a reading of `ranges` values.
    pub fn input_size(ranges: usize) -> usize {
        ranges + 1
    }

    /// Builds the layer from row-major weights, one row per output.
    pub fn from_weights(
        inputs: usize,
        weights: &[f32],
        threshold: f32,
    ) -> Result<Self, ControllerError> {
        let cols = inputs + 1;
        if weights.len() != OUTPUTS * cols {
            return Err(ControllerError::WeightShape {
                rows: OUTPUTS,
                cols: weights.len() / OUTPUTS.max(1),
                expected_rows: OUTPUTS,
                expected_cols: cols,
            });
        }
        Ok(Self {
            weights: DMatrix::from_row_slice(OUTPUTS, cols, weights),
            threshold,
        })
    }

    /// Random gaussian weights, used to seed a training population.
    pub fn random<R: Rng + ?Sized>(
        inputs: usize,
        stddev: f32,
        threshold: f32,
        rng: &mut R,
    ) -> Result<Self, ControllerError> {
        let normal = Normal::new(0.0, stddev)
            .map_err(|e| ControllerError::Initialization(e.to_string()))?;
        let weights = DMatrix::from_fn(OUTPUTS, inputs + 1, |_, _| normal.sample(&mut *rng));
        Ok(Self { weights, threshold })
    }

    pub fn inputs(&self) -> usize {
        self.weights.ncols() - 1
    }

    pub fn weights(&self) -> &DMatrix<f32> {
        &self.weights
    }

    /// Raw activations in intent order: accelerate, reverse, brake, left, right.
    pub fn activate(&self, input: &ControllerInput) -> Result<[f32; OUTPUTS], ControllerError> {
        let expected = self.inputs();
        let actual = Self::input_size(input.ranges.len());
        if actual != expected {
            return Err(ControllerError::InputSize { expected, actual });
        }

        let x = DVector::from_iterator(
            expected + 1,
            input
                .ranges
                .iter()
                .copied()
                .chain([input.speed, 1.0]),
        );
        let y = (&self.weights * x).map(f32::tanh);

        let mut out = [0.0; OUTPUTS];
        out.copy_from_slice(y.as_slice());
        Ok(out)
    }
}

impl DrivingController for NetworkController {
    fn decide(&mut self, input: &ControllerInput) -> Result<ControlIntents, ControllerError> {
        let y = self.activate(input)?;
        let on = |v: f32| v > self.threshold;
        Ok(ControlIntents {
            accelerate: on(y[0]),
            reverse: on(y[1]),
            brake: on(y[2]),
            left: on(y[3]),
            right: on(y[4]),
        })
    }

    fn kind(&self) -> &'static str {
        "Network"
    }
}

// =========================================================================
// == Wall Follower ==
// =========================================================================

/// Scripted driver: keeps to the side with more room and backs off when the
/// way ahead is blocked.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct WallFollower {
    /// Center-ray distance below which the car stops accelerating.
    pub brake_distance: f32,
    /// Minimum average range difference between the sides before steering.
    pub steer_margin: f32,
    /// Below this speed a blocked car reverses instead of braking.
    pub creep_speed: f32,
}

impl Default for WallFollower {
    fn default() -> Self {
        Self {
            brake_distance: 1.5,
            steer_margin: 0.25,
            creep_speed: 1.0,
        }
    }
}

fn mean(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f32>() / values.len() as f32
}

impl DrivingController for WallFollower {
    fn decide(&mut self, input: &ControllerInput) -> Result<ControlIntents, ControllerError> {
        // Need at least one fan ray plus up and down.
        if input.ranges.len() < 3 {
            return Err(ControllerError::InputSize {
                expected: 3,
                actual: input.ranges.len(),
            });
        }
        let fan = &input.ranges[..input.ranges.len() - 2];
        let mid = fan.len() / 2;
        let center = fan[mid];
        // The fan runs right to left.
        let right_room = mean(&fan[..mid]);
        let left_room = mean(&fan[mid + 1..]);

        let blocked = center <= self.brake_distance;
        let mut intents = ControlIntents {
            accelerate: !blocked,
            ..Default::default()
        };
        if blocked {
            if input.speed > self.creep_speed {
                intents.brake = true;
            } else {
                intents.reverse = true;
            }
        }

        if left_room - right_room > self.steer_margin {
            intents.left = true;
        } else if right_room - left_room > self.steer_margin {
            intents.right = true;
        }
        Ok(intents)
    }

    fn kind(&self) -> &'static str {
        "WallFollower"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn input(ranges: &[f32], speed: f32) -> ControllerInput<'_> {
        ControllerInput {
            ranges,
            localization: TrackLocalization::default(),
            speed,
        }
    }

    #[test]
    fn network_thresholds_each_output() {
        // Two ranges + speed + bias = 4 columns.
        #[rustfmt::skip]
        let weights = [
            0.0, 0.0, 0.0,  2.0,  // accelerate: bias only
            0.0, 0.0, 0.0, -2.0,  // reverse
            1.0, 0.0, 0.0,  0.0,  // brake follows range 0
            0.0, 1.0, 0.0,  0.0,  // left follows range 1
            0.0, 0.0, -1.0, 0.0,  // right when slow
        ];
        let mut net = NetworkController::from_weights(3, &weights, 0.0).unwrap();

        let y = net.activate(&input(&[0.5, -0.5], 0.0)).unwrap();
        assert_abs_diff_eq!(y[0], 2.0f32.tanh());
        assert_abs_diff_eq!(y[2], 0.5f32.tanh());

        let intents = net.decide(&input(&[0.5, -0.5], 0.0)).unwrap();
        assert_eq!(
            intents,
            ControlIntents {
                accelerate: true,
                reverse: false,
                brake: true,
                left: false,
                right: false,
            }
        );
    }

    #[test]
    fn network_rejects_wrong_shapes() {
        assert!(matches!(
            NetworkController::from_weights(3, &[0.0; 7], 0.0),
            Err(ControllerError::WeightShape { .. })
        ));

        let mut net = NetworkController::from_weights(3, &[0.0; 20], 0.0).unwrap();
        assert_eq!(
            net.decide(&input(&[1.0, 2.0, 3.0], 0.0)).unwrap_err(),
            ControllerError::InputSize {
                expected: 3,
                actual: 4
            }
        );
    }

    #[test]
    fn random_network_is_seeded() {
        let inputs = NetworkController::input_size(21);
        let a = NetworkController::random(inputs, 0.5, 0.0, &mut ChaCha8Rng::seed_from_u64(7)).unwrap();
        let b = NetworkController::random(inputs, 0.5, 0.0, &mut ChaCha8Rng::seed_from_u64(7)).unwrap();
        assert_eq!(a.weights(), b.weights());
        assert_eq!(a.weights().shape(), (5, 23));

        let bad = NetworkController::random(inputs, -1.0, 0.0, &mut ChaCha8Rng::seed_from_u64(7));
        assert!(matches!(bad, Err(ControllerError::Initialization(_))));
    }

    #[test]
    fn wall_follower_steers_toward_open_side() {
        let mut driver = WallFollower::default();
        // Fan of five, right to left, then up and down.
        let ranges = [1.0, 1.0, 5.0, 4.0, 5.0, 5.0, 0.3];

        let intents = driver.decide(&input(&ranges, 10.0)).unwrap();

        assert!(intents.accelerate);
        assert!(intents.left);
        assert!(!intents.right);
    }

    #[test]
    fn wall_follower_brakes_then_reverses_when_blocked() {
        let mut driver = WallFollower::default();
        let ranges = [2.0, 2.0, 0.5, 2.0, 2.0, 5.0, 0.3];

        let fast = driver.decide(&input(&ranges, 8.0)).unwrap();
        assert!(fast.brake && !fast.accelerate && !fast.reverse);

        let slow = driver.decide(&input(&ranges, 0.2)).unwrap();
        assert!(slow.reverse && !slow.brake);
        assert!(!slow.left && !slow.right);
    }

    #[test]
    fn boxed_controllers_clone() {
        let driver: Box<dyn DrivingController> = Box::new(WallFollower::default());
        let mut copy = driver.clone();
        assert_eq!(copy.kind(), "WallFollower");
        assert!(copy.decide(&input(&[5.0, 5.0, 5.0, 5.0, 5.0], 0.0)).unwrap().accelerate);
    }
}
