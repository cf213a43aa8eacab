// racer_sim/src/simulation/core/transforms.rs

//! Conversions between the core's nalgebra types and Bevy's math types. Both
//! sides are Y-up with cars facing -Z, so no axis remapping is needed.

use bevy::prelude::{Quat as BevyQuat, Transform as BevyTransform, Vec3 as BevyVec3};
use nalgebra::{Quaternion, Translation3, UnitQuaternion};

use racer_core::prelude::{Pose, Rotation, Vec3};
use racer_core::types::Point;

pub fn vec_to_bevy(v: &Vec3) -> BevyVec3 {
    BevyVec3::new(v.x, v.y, v.z)
}

pub fn vec_from_bevy(v: BevyVec3) -> Vec3 {
    Vec3::new(v.x, v.y, v.z)
}

pub fn point_to_bevy(p: &Point) -> BevyVec3 {
    BevyVec3::new(p.x, p.y, p.z)
}

pub fn point_from_bevy(v: BevyVec3) -> Point {
    Point::new(v.x, v.y, v.z)
}

pub fn quat_to_bevy(q: &Rotation) -> BevyQuat {
    BevyQuat::from_xyzw(q.coords.x, q.coords.y, q.coords.z, q.coords.w)
}

pub fn quat_from_bevy(q: BevyQuat) -> Rotation {
    // nalgebra's Quaternion::new is w, x, y, z.
    UnitQuaternion::from_quaternion(Quaternion::new(q.w, q.x, q.y, q.z))
}

pub fn pose_to_transform(pose: &Pose) -> BevyTransform {
    BevyTransform {
        translation: vec_to_bevy(&pose.translation.vector),
        rotation: quat_to_bevy(&pose.rotation),
        scale: BevyVec3::ONE,
    }
}

/// Scale is dropped.
pub fn transform_to_pose(transform: &BevyTransform) -> Pose {
    Pose::from_parts(
        Translation3::from(vec_from_bevy(transform.translation)),
        quat_from_bevy(transform.rotation),
    )
}
