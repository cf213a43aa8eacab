// racer_core/src/vehicle/parts.rs

use std::fmt;
use std::sync::Arc;

use nalgebra::{Point2, Point3, Vector3};
use serde::Deserialize;

use crate::types::{Rotation, Vec3};

// =========================================================================
// == Source Titles ==
// =========================================================================

/// The game a car was exported from. Every title names and orders its car
/// parts differently, so classification and chassis tuning key off this tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub enum SourceTitle {
    #[serde(rename = "NFS_1")]
    Nfs1,
    #[serde(rename = "NFS_2_PS1")]
    Nfs2Ps1,
    #[serde(rename = "NFS_2_SE")]
    Nfs2Se,
    #[serde(rename = "NFS_2")]
    Nfs2,
    #[serde(rename = "NFS_3_PS1")]
    Nfs3Ps1,
    #[serde(rename = "NFS_3")]
    Nfs3,
    #[serde(rename = "NFS_4")]
    Nfs4,
    #[serde(rename = "NFS_5")]
    Nfs5,
    #[serde(rename = "UNKNOWN")]
    Unknown,
}

impl SourceTitle {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceTitle::Nfs1 => "NFS_1",
            SourceTitle::Nfs2Ps1 => "NFS_2_PS1",
            SourceTitle::Nfs2Se => "NFS_2_SE",
            SourceTitle::Nfs2 => "NFS_2",
            SourceTitle::Nfs3Ps1 => "NFS_3_PS1",
            SourceTitle::Nfs3 => "NFS_3",
            SourceTitle::Nfs4 => "NFS_4",
            SourceTitle::Nfs5 => "NFS_5",
            SourceTitle::Unknown => "UNKNOWN",
        }
    }

    /// Local offset of the chassis collision shape. The exporters disagree on
    /// where a car's origin sits, so the shift is per title.
    pub fn center_of_mass_offset(&self) -> Vec3 {
        match self {
            SourceTitle::Nfs3 | SourceTitle::Nfs4 => Vec3::zeros(),
            SourceTitle::Nfs3Ps1 => Vec3::new(0.0, 0.1, 0.0),
            _ => Vec3::new(0.0, 0.05, 0.0),
        }
    }
}

impl fmt::Display for SourceTitle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =========================================================================
// == Wheel Slots ==
// =========================================================================

/// The four fixed wheel positions. The discriminant is the wheel index used by
/// the physics constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WheelSlot {
    FrontLeft = 0,
    FrontRight = 1,
    RearLeft = 2,
    RearRight = 3,
}

impl WheelSlot {
    pub const ALL: [WheelSlot; 4] = [
        WheelSlot::FrontLeft,
        WheelSlot::FrontRight,
        WheelSlot::RearLeft,
        WheelSlot::RearRight,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Maps a constraint wheel index back to its slot.
    ///
    /// # Panics
    /// The rig is defined for exactly four wheels. Any other index means the
    /// constraint was set up wrong, which is not recoverable.
    pub fn from_index(index: usize) -> Self {
        assert!(
            index < Self::ALL.len(),
            "wheel index {index} out of range: more than 4 wheels are unsupported"
        );
        Self::ALL[index]
    }

    pub fn is_front(self) -> bool {
        matches!(self, WheelSlot::FrontLeft | WheelSlot::FrontRight)
    }

    pub fn is_rear(self) -> bool {
        !self.is_front()
    }

    pub fn short_name(self) -> &'static str {
        match self {
            WheelSlot::FrontLeft => "FL",
            WheelSlot::FrontRight => "FR",
            WheelSlot::RearLeft => "RL",
            WheelSlot::RearRight => "RR",
        }
    }
}

impl fmt::Display for WheelSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

// =========================================================================
// == Mesh Parts ==
// =========================================================================

/// Raw geometry as delivered by the loader. The core only ever asks it for
/// its bounding box; the buffers are carried for the renderer.
#[derive(Debug, Clone, Default)]
pub struct MeshGeometry {
    pub vertices: Vec<Point3<f32>>,
    pub uvs: Vec<Point2<f32>>,
    pub normals: Vec<Vector3<f32>>,
    pub indices: Vec<u32>,
}

impl MeshGeometry {
    /// Axis-aligned bounds as `(min, max)`, or `None` for an empty mesh.
    pub fn bounds(&self) -> Option<(Point3<f32>, Point3<f32>)> {
        let first = *self.vertices.first()?;
        let bounds = self
            .vertices
            .iter()
            .fold((first, first), |(min, max), v| (min.inf(v), max.sup(v)));
        Some(bounds)
    }

    /// Half of the bounding box size along each axis. Zero for an empty mesh.
    pub fn half_extents(&self) -> Vec3 {
        self.bounds()
            .map(|(min, max)| (max - min) * 0.5)
            .unwrap_or_else(Vec3::zeros)
    }
}

/// One named piece of a car model.
#[derive(Debug, Clone)]
pub struct MeshPart {
    pub name: String,
    pub geometry: Arc<MeshGeometry>,
    /// Rest position of the part relative to the car origin.
    pub initial_position: Vec3,
    pub initial_orientation: Rotation,
}

impl MeshPart {
    pub fn new(name: impl Into<String>, geometry: MeshGeometry, initial_position: Vec3) -> Self {
        Self {
            name: name.into(),
            geometry: Arc::new(geometry),
            initial_position,
            initial_orientation: Rotation::identity(),
        }
    }

    /// True when both parts are backed by the same mesh, either the same
    /// buffers or the same exported name.
    pub fn same_mesh(&self, other: &MeshPart) -> bool {
        Arc::ptr_eq(&self.geometry, &other.geometry) || self.name == other.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn cube(half: f32) -> MeshGeometry {
        MeshGeometry {
            vertices: vec![
                Point3::new(-half, -half, -half),
                Point3::new(half, half, half),
                Point3::new(0.0, 0.0, 0.0),
            ],
            ..Default::default()
        }
    }

    #[test]
    fn half_extents_cover_all_vertices() {
        let mut mesh = cube(0.5);
        mesh.vertices.push(Point3::new(0.0, 0.0, 2.5));
        let half = mesh.half_extents();
        assert_abs_diff_eq!(half.x, 0.5);
        assert_abs_diff_eq!(half.y, 0.5);
        assert_abs_diff_eq!(half.z, 1.5);
    }

    #[test]
    fn empty_mesh_has_no_bounds() {
        let mesh = MeshGeometry::default();
        assert!(mesh.bounds().is_none());
        assert_eq!(mesh.half_extents(), Vec3::zeros());
    }

    #[test]
    fn same_mesh_by_buffer_or_name() {
        let a = MeshPart::new("wheel", cube(0.3), Vec3::zeros());
        let shared = MeshPart {
            name: "other".into(),
            ..a.clone()
        };
        let renamed = MeshPart::new("wheel", cube(0.1), Vec3::zeros());
        let unrelated = MeshPart::new("body", cube(0.3), Vec3::zeros());

        assert!(a.same_mesh(&shared));
        assert!(a.same_mesh(&renamed));
        assert!(!a.same_mesh(&unrelated));
    }

    #[test]
    fn wheel_slot_round_trips_index() {
        for slot in WheelSlot::ALL {
            assert_eq!(WheelSlot::from_index(slot.index()), slot);
        }
        assert!(WheelSlot::RearLeft.is_rear());
        assert!(WheelSlot::FrontRight.is_front());
    }

    #[test]
    #[should_panic(expected = "more than 4 wheels")]
    fn fifth_wheel_is_fatal() {
        WheelSlot::from_index(4);
    }

    #[test]
    fn title_offsets_differ() {
        assert_eq!(SourceTitle::Nfs4.center_of_mass_offset(), Vec3::zeros());
        assert_abs_diff_eq!(SourceTitle::Nfs3Ps1.center_of_mass_offset().y, 0.1);
        assert_abs_diff_eq!(SourceTitle::Nfs2.center_of_mass_offset().y, 0.05);
    }
}
