// racer_core/src/perception/rangefinder.rs

use serde::Deserialize;

use crate::perception::{RayQuery, SensorRay};
use crate::types::{basis, Point, Pose, Rotation, Vec3};

/// Layout and range of a car's rangefinder fan.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct RangefinderConfig {
    /// Number of rays fanned across the front half plane.
    pub num_rays: u32,
    pub cast_distance: f32,
    /// Reported for a ray that hits nothing.
    pub far_distance: f32,
    pub down_ray: bool,
}

impl Default for RangefinderConfig {
    fn default() -> Self {
        Self {
            num_rays: 19,
            cast_distance: 5.0,
            far_distance: 5.0,
            down_ray: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeSample {
    pub distance: f32,
    /// World-space end of the ray, at the hit or at full cast length.
    pub endpoint: Point,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RangefinderReading {
    /// Ordered from the right (-90°) to the left (+90°).
    pub forward: Vec<RangeSample>,
    pub up: RangeSample,
    pub down: RangeSample,
}

impl RangefinderReading {
    pub fn len(&self) -> usize {
        self.forward.len() + 2
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// The distances as one vector: forward fan, then up, then down.
    pub fn to_vec(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.len());
        out.extend(self.forward.iter().map(|s| s.distance));
        out.push(self.up.distance);
        out.push(self.down.distance);
        out
    }
}

impl RangefinderConfig {
    /// Number of values in a flattened reading: the fan plus up and down.
    pub fn reading_len(&self) -> usize {
        self.num_rays as usize + 2
    }

    /// Yaw of fan ray `i` around the chassis up axis, in radians. Positive
    /// yaw turns toward the left.
    pub fn ray_angle(&self, i: u32) -> f32 {
        if self.num_rays <= 1 {
            return 0.0;
        }
        let half_fan = std::f32::consts::FRAC_PI_2;
        -half_fan + (i as f32) * (2.0 * half_fan) / (self.num_rays - 1) as f32
    }

    /// The fan in chassis space; ids follow the reading order.
    pub fn generate_rays(&self) -> Vec<SensorRay> {
        (0..self.num_rays)
            .map(|i| {
                let yaw = Rotation::from_axis_angle(&Vec3::y_axis(), self.ray_angle(i));
                SensorRay {
                    id: i,
                    direction: yaw * basis::forward(),
                }
            })
            .collect()
    }

    /// Casts the fan plus the up and down rays from the chassis position.
    pub fn scan<Q: RayQuery + ?Sized>(&self, query: &Q, chassis_pose: &Pose) -> RangefinderReading {
        let origin = Point::from(chassis_pose.translation.vector);
        let cast = |local: Vec3| self.cast(query, origin, chassis_pose.rotation * local);

        let forward = self
            .generate_rays()
            .into_iter()
            .map(|ray| cast(ray.direction))
            .collect();
        let up = cast(basis::up());
        let down = if self.down_ray {
            cast(-basis::up())
        } else {
            self.miss(origin, chassis_pose.rotation * -basis::up())
        };

        RangefinderReading { forward, up, down }
    }

    fn cast<Q: RayQuery + ?Sized>(&self, query: &Q, origin: Point, direction: Vec3) -> RangeSample {
        match query.cast_ray(origin, direction, self.cast_distance) {
            Some(distance) if distance.is_finite() => {
                let distance = distance.clamp(0.0, self.cast_distance);
                RangeSample {
                    distance,
                    endpoint: origin + direction * distance,
                }
            }
            _ => self.miss(origin, direction),
        }
    }

    fn miss(&self, origin: Point, direction: Vec3) -> RangeSample {
        RangeSample {
            distance: self.far_distance,
            endpoint: origin + direction * self.cast_distance,
        }
    }
}
