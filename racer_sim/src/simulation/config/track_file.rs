// racer_sim/src/simulation/config/track_file.rs

//! On-disk track description: the localization blocks, the virtual road and
//! any loose objects placed on it.

use std::path::Path;

use serde::Deserialize;

use racer_core::prelude::{Track, TrackBlock, Vec3, VroadSegment};
use racer_core::types::Point;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrackFile {
    pub name: String,
    /// Whether the last vroad segment joins back onto the first.
    #[serde(default = "default_closed")]
    pub closed: bool,
    /// Road slab thickness for the generated colliders.
    #[serde(default = "default_road_thickness")]
    pub road_thickness: f32,
    #[serde(default = "default_wall_height")]
    pub wall_height: f32,
    pub blocks: Vec<BlockEntry>,
    pub vroad: Vec<VroadEntry>,
    #[serde(default)]
    pub objects: Vec<ObjectEntry>,
}

fn default_closed() -> bool {
    true
}

fn default_road_thickness() -> f32 {
    0.5
}

fn default_wall_height() -> f32 {
    1.5
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BlockEntry {
    pub center: [f32; 3],
    pub half_extents: [f32; 3],
    pub first_vroad: usize,
    pub vroad_count: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VroadEntry {
    pub point: [f32; 3],
    pub forward: [f32; 3],
    #[serde(default = "default_normal")]
    pub normal: [f32; 3],
    /// Derived from `forward x normal` when omitted.
    #[serde(default)]
    pub right: Option<[f32; 3]>,
    pub left_wall: f32,
    pub right_wall: f32,
}

fn default_normal() -> [f32; 3] {
    [0.0, 1.0, 0.0]
}

/// A loose prop on the track. Dynamic objects can be pushed around and stay
/// visible to the rangefinders.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ObjectEntry {
    pub center: [f32; 3],
    pub half_extents: [f32; 3],
    #[serde(default)]
    pub dynamic: bool,
    #[serde(default = "default_object_mass")]
    pub mass: f32,
}

fn default_object_mass() -> f32 {
    20.0
}

impl VroadEntry {
    fn to_segment(&self) -> VroadSegment {
        let forward = Vec3::from(self.forward).normalize();
        let normal = Vec3::from(self.normal).normalize();
        let right = self
            .right
            .map(|r| Vec3::from(r).normalize())
            .unwrap_or_else(|| forward.cross(&normal).normalize());
        VroadSegment {
            point: Point::from(self.point),
            forward,
            normal,
            right,
            left_wall: self.left_wall,
            right_wall: self.right_wall,
        }
    }
}

impl TrackFile {
    pub fn from_toml_str(text: &str) -> Result<Self, String> {
        toml::from_str(text).map_err(|e| format!("invalid track file: {e}"))
    }

    pub fn load(path: &Path) -> Result<Self, String> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| format!("cannot read track file {}: {e}", path.display()))?;
        Self::from_toml_str(&text)
    }

    /// Builds the validated core track.
    pub fn to_track(&self) -> Result<Track, String> {
        let blocks = self
            .blocks
            .iter()
            .map(|b| TrackBlock {
                center: Point::from(b.center),
                half_extents: Vec3::from(b.half_extents),
                first_vroad: b.first_vroad,
                vroad_count: b.vroad_count,
            })
            .collect();
        let vroad = self.vroad.iter().map(VroadEntry::to_segment).collect();
        Track::new(self.name.clone(), blocks, vroad).map_err(|e| format!("track '{}': {e}", self.name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const TWO_SEGMENTS: &str = r#"
        name = "stub"
        closed = false

        [[blocks]]
        center = [0.0, 0.0, -2.0]
        half_extents = [5.0, 2.0, 4.0]
        first_vroad = 0
        vroad_count = 2

        [[vroad]]
        point = [0.0, 0.0, 0.0]
        forward = [0.0, 0.0, -2.0]
        left_wall = 4.0
        right_wall = 3.0

        [[vroad]]
        point = [0.0, 0.0, -4.0]
        forward = [0.0, 0.0, -1.0]
        right = [1.0, 0.0, 0.0]
        left_wall = 4.0
        right_wall = 3.0

        [[objects]]
        center = [1.0, 0.5, -3.0]
        half_extents = [0.3, 0.5, 0.3]
        dynamic = true
    "#;

    #[test]
    fn parses_and_builds_track() {
        let file = TrackFile::from_toml_str(TWO_SEGMENTS).unwrap();
        assert!(!file.closed);
        assert_eq!(file.objects.len(), 1);
        assert_abs_diff_eq!(file.objects[0].mass, 20.0);

        let track = file.to_track().unwrap();
        assert_eq!(track.name(), "stub");
        assert_eq!(track.vroad().len(), 2);

        let first = &track.vroad()[0];
        assert_abs_diff_eq!(first.forward, Vec3::new(0.0, 0.0, -1.0));
        // Derived right points along +X for a road heading down -Z.
        assert_abs_diff_eq!(first.right, Vec3::x(), epsilon = 1e-6);
        assert_abs_diff_eq!(first.normal, Vec3::y());
    }

    #[test]
    fn invalid_block_range_is_reported() {
        let broken = TWO_SEGMENTS.replace("vroad_count = 2", "vroad_count = 3");
        let err = TrackFile::from_toml_str(&broken)
            .unwrap()
            .to_track()
            .unwrap_err();
        assert!(err.contains("stub"));
    }

    #[test]
    fn unknown_keys_fail_to_parse() {
        let typo = TWO_SEGMENTS.replace("dynamic = true", "dynamik = true");
        assert!(TrackFile::from_toml_str(&typo).is_err());
    }
}
