// racer_core/src/perception/mod.rs

pub mod rangefinder;

use crate::types::{Point, Vec3};

/// A single ray of a scan pattern, in the chassis frame.
#[derive(Debug, Clone)]
pub struct SensorRay {
    pub id: u32,
    /// Unit direction in chassis space.
    pub direction: Vec3,
}

/// The contract for the physics collaborator's ray casting.
///
/// Implementations are expected to only report geometry the sensors are
/// allowed to see (track surfaces and dynamic track objects, never cars).
pub trait RayQuery {
    /// Distance along `direction` to the first hit within `max_distance`, or
    /// `None` when nothing is hit. `direction` is a unit vector in world space.
    fn cast_ray(&self, origin: Point, direction: Vec3, max_distance: f32) -> Option<f32>;
}
