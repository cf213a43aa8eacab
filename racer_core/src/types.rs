// racer_core/src/types.rs

use nalgebra::{Isometry3, Point3, UnitQuaternion, Vector3};

// --- Core Type Aliases ---
/// A rigid pose in world space. All of the core works in single precision,
/// matching the physics collaborator.
pub type Pose = Isometry3<f32>;
pub type Vec3 = Vector3<f32>;
pub type Point = Point3<f32>;
pub type Rotation = UnitQuaternion<f32>;

// --- Core Identifier ---
/// An opaque handle to a collision body owned by the physics collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BodyHandle(pub u64);

impl BodyHandle {
    // A convenience method for use in the Bevy adapter crate.
    #[cfg(feature = "bevy")] // This will only compile if the "bevy" feature is enabled
    pub fn from_entity(entity: bevy_ecs::prelude::Entity) -> Self {
        Self(entity.to_bits())
    }

    #[cfg(feature = "bevy")]
    pub fn to_entity(self) -> bevy_ecs::prelude::Entity {
        bevy_ecs::prelude::Entity::from_bits(self.0)
    }
}

/// Chassis-space basis. Vehicles face `-Z` with `+Y` up, the convention the
/// exported car meshes use.
pub mod basis {
    use super::Vec3;

    pub fn forward() -> Vec3 {
        Vec3::new(0.0, 0.0, -1.0)
    }

    pub fn up() -> Vec3 {
        Vec3::new(0.0, 1.0, 0.0)
    }

    pub fn right() -> Vec3 {
        Vec3::new(1.0, 0.0, 0.0)
    }
}
