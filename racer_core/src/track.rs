// racer_core/src/track.rs

//! Track geometry as seen by the agents: coarse blocks for localization and
//! the virtual road ("vroad"), a polyline of center points with a local frame
//! and wall distances.

use crate::error::TrackError;
use crate::types::{Point, Pose, Rotation, Vec3};

#[derive(Debug, Clone, PartialEq)]
pub struct TrackBlock {
    pub center: Point,
    pub half_extents: Vec3,
    /// Range of vroad segments that run through this block.
    pub first_vroad: usize,
    pub vroad_count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VroadSegment {
    pub point: Point,
    pub forward: Vec3,
    pub normal: Vec3,
    pub right: Vec3,
    /// Distance from `point` to the left wall, measured along `-right`.
    pub left_wall: f32,
    /// Distance from `point` to the right wall, measured along `right`.
    pub right_wall: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TrackLocalization {
    pub nearest_block: usize,
    pub nearest_vroad: usize,
    /// Whether the position lies inside the nearest block's bounding volume.
    pub on_track: bool,
}

#[derive(Debug, Clone)]
pub struct Track {
    name: String,
    blocks: Vec<TrackBlock>,
    vroad: Vec<VroadSegment>,
}

impl Track {
    /// # Errors
    /// The track needs at least one block and one vroad segment, and every
    /// block's vroad range must lie within the vroad.
    pub fn new(
        name: impl Into<String>,
        blocks: Vec<TrackBlock>,
        vroad: Vec<VroadSegment>,
    ) -> Result<Self, TrackError> {
        if blocks.is_empty() {
            return Err(TrackError::NoBlocks);
        }
        if vroad.is_empty() {
            return Err(TrackError::NoVroad);
        }
        for (i, block) in blocks.iter().enumerate() {
            let end = block.first_vroad + block.vroad_count;
            if end > vroad.len() || block.first_vroad >= vroad.len() {
                return Err(TrackError::BlockVroadOutOfRange {
                    block: i,
                    first: block.first_vroad,
                    end,
                    count: vroad.len(),
                });
            }
        }
        Ok(Self {
            name: name.into(),
            blocks,
            vroad,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn blocks(&self) -> &[TrackBlock] {
        &self.blocks
    }

    pub fn vroad(&self) -> &[VroadSegment] {
        &self.vroad
    }

    pub fn block(&self, index: usize) -> Result<&TrackBlock, TrackError> {
        self.blocks.get(index).ok_or(TrackError::BlockIndexOutOfRange {
            index,
            count: self.blocks.len(),
        })
    }

    pub fn segment(&self, index: usize) -> Result<&VroadSegment, TrackError> {
        self.vroad.get(index).ok_or(TrackError::VroadIndexOutOfRange {
            index,
            count: self.vroad.len(),
        })
    }

    pub fn nearest_block(&self, position: &Point) -> usize {
        nearest_index(self.blocks.iter().map(|b| &b.center), position)
    }

    pub fn nearest_vroad(&self, position: &Point) -> usize {
        nearest_index(self.vroad.iter().map(|v| &v.point), position)
    }

    /// Whether `position` lies inside the axis-aligned volume of a block.
    /// Out-of-range indices contain nothing.
    pub fn block_contains(&self, index: usize, position: &Point) -> bool {
        self.blocks.get(index).is_some_and(|block| {
            let d = position - block.center;
            d.x.abs() <= block.half_extents.x
                && d.y.abs() <= block.half_extents.y
                && d.z.abs() <= block.half_extents.z
        })
    }

    pub fn locate(&self, position: &Point) -> TrackLocalization {
        let nearest_block = self.nearest_block(position);
        TrackLocalization {
            nearest_block,
            nearest_vroad: self.nearest_vroad(position),
            on_track: self.block_contains(nearest_block, position),
        }
    }

    /// The vroad index of position `pos_index` within a block, clamped to the
    /// block's own segments.
    pub fn block_vroad_index(&self, block: usize, pos_index: usize) -> Result<usize, TrackError> {
        let block = self.block(block)?;
        let within = pos_index.min(block.vroad_count.saturating_sub(1));
        Ok(block.first_vroad + within)
    }

    /// A spawn pose on a vroad segment: `offset` metres to the right of the
    /// center line, `height` metres above it, facing along the road.
    pub fn vroad_pose(&self, index: usize, offset: f32, height: f32) -> Result<Pose, TrackError> {
        let segment = self.segment(index)?;
        let position = segment.point + segment.right * offset + segment.normal * height;
        Ok(Pose::from_parts(
            position.coords.into(),
            orientation_along(&segment.forward, &segment.normal),
        ))
    }
}

/// Rotation taking the chassis forward (`-Z`) onto `forward` and `+Y` onto
/// `normal`. Falls back to identity for degenerate frames.
fn orientation_along(forward: &Vec3, normal: &Vec3) -> Rotation {
    if forward.norm_squared() < f32::EPSILON || forward.cross(normal).norm_squared() < f32::EPSILON {
        return Rotation::identity();
    }
    Rotation::face_towards(&-forward, normal)
}

/// Index of the point closest to `position`; the first one wins a tie.
fn nearest_index<'a>(points: impl Iterator<Item = &'a Point>, position: &Point) -> usize {
    let mut best = 0;
    let mut best_distance = f32::INFINITY;
    for (i, p) in points.enumerate() {
        let d = (p - position).norm_squared();
        if d < best_distance {
            best = i;
            best_distance = d;
        }
    }
    best
}

/// Nearest block and vroad segment of `position` on `track`.
pub fn locate(position: &Point, track: &Track) -> TrackLocalization {
    track.locate(position)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::types::basis;
    use approx::assert_abs_diff_eq;

    /// A straight road running from the origin toward `-Z`, one block per
    /// ten metres with five vroad segments each.
    pub(crate) fn straight_track(blocks: usize) -> Track {
        let vroad = (0..blocks * 5)
            .map(|i| VroadSegment {
                point: Point::new(0.0, 0.0, -(i as f32) * 2.0),
                forward: Vec3::new(0.0, 0.0, -1.0),
                normal: Vec3::y(),
                right: Vec3::x(),
                left_wall: 4.0,
                right_wall: 4.0,
            })
            .collect();
        let blocks = (0..blocks)
            .map(|b| TrackBlock {
                center: Point::new(0.0, 0.0, -(b as f32) * 10.0 - 4.0),
                half_extents: Vec3::new(5.0, 3.0, 5.0),
                first_vroad: b * 5,
                vroad_count: 5,
            })
            .collect();
        Track::new("straight", blocks, vroad).unwrap()
    }

    #[test]
    fn empty_tracks_are_rejected() {
        let full = straight_track(1);
        assert_eq!(
            Track::new("x", vec![], full.vroad().to_vec()).unwrap_err(),
            TrackError::NoBlocks
        );
        assert_eq!(
            Track::new("x", full.blocks().to_vec(), vec![]).unwrap_err(),
            TrackError::NoVroad
        );
    }

    #[test]
    fn block_range_must_fit_vroad() {
        let full = straight_track(2);
        let mut blocks = full.blocks().to_vec();
        blocks[1].vroad_count = 6;
        let err = Track::new("x", blocks, full.vroad().to_vec()).unwrap_err();
        assert!(matches!(err, TrackError::BlockVroadOutOfRange { block: 1, .. }));
    }

    #[test]
    fn locate_finds_nearest() {
        let track = straight_track(3);
        let loc = locate(&Point::new(1.0, 0.5, -13.1), &track);
        assert_eq!(loc.nearest_block, 1);
        assert_eq!(loc.nearest_vroad, 7);
        assert!(loc.on_track);
    }

    #[test]
    fn locate_far_away_stays_in_bounds() {
        let track = straight_track(3);
        let loc = track.locate(&Point::new(1e6, -1e6, 1e6));
        assert!(loc.nearest_block < track.blocks().len());
        assert!(loc.nearest_vroad < track.vroad().len());
        assert!(!loc.on_track);

        let behind = track.locate(&Point::new(0.0, 0.0, 500.0));
        assert_eq!(behind.nearest_block, 0);
        assert_eq!(behind.nearest_vroad, 0);
    }

    #[test]
    fn ties_go_to_lowest_index() {
        let track = straight_track(2);
        // Exactly halfway between vroad 0 and 1.
        let loc = track.locate(&Point::new(0.0, 0.0, -1.0));
        assert_eq!(loc.nearest_vroad, 0);
    }

    #[test]
    fn block_position_is_clamped_into_block() {
        let track = straight_track(3);
        assert_eq!(track.block_vroad_index(1, 2).unwrap(), 7);
        assert_eq!(track.block_vroad_index(1, 40).unwrap(), 9);
        assert!(track.block_vroad_index(3, 0).is_err());
    }

    #[test]
    fn vroad_pose_faces_down_the_road() {
        let track = straight_track(1);
        let pose = track.vroad_pose(2, 1.5, 0.2).unwrap();

        assert_abs_diff_eq!(pose.translation.vector, Vec3::new(1.5, 0.2, -4.0), epsilon = 1e-6);
        assert_abs_diff_eq!(pose.rotation * basis::forward(), Vec3::new(0.0, 0.0, -1.0), epsilon = 1e-5);
        assert_abs_diff_eq!(pose.rotation * basis::up(), Vec3::y(), epsilon = 1e-5);
        assert!(track.vroad_pose(99, 0.0, 0.0).is_err());
    }

    #[test]
    fn vroad_pose_follows_a_turned_segment() {
        let segment = VroadSegment {
            point: Point::origin(),
            forward: Vec3::x(),
            normal: Vec3::y(),
            right: Vec3::z(),
            left_wall: 3.0,
            right_wall: 3.0,
        };
        let block = TrackBlock {
            center: Point::origin(),
            half_extents: Vec3::repeat(5.0),
            first_vroad: 0,
            vroad_count: 1,
        };
        let track = Track::new("turn", vec![block], vec![segment]).unwrap();

        let pose = track.vroad_pose(0, -1.0, 0.0).unwrap();

        assert_abs_diff_eq!(pose.rotation * basis::forward(), Vec3::x(), epsilon = 1e-5);
        assert_abs_diff_eq!(pose.translation.vector, Vec3::new(0.0, 0.0, -1.0), epsilon = 1e-6);
    }
}
