// racer_sim/src/simulation/plugins/sensors/rangefinder.rs

use avian3d::prelude::{SpatialQuery, SpatialQueryFilter};

use crate::prelude::*;
use crate::simulation::core::layers::sensor_mask;
use crate::simulation::core::transforms::{point_to_bevy, transform_to_pose, vec_to_bevy};
use racer_core::prelude::{RayQuery, Vec3 as CoreVec3};
use racer_core::types::Point;

// =========================================================================
// == Components & Plugin ==
// =========================================================================

/// The car's fan of distance sensors and its latest reading. The reading is
/// `None` until the first scan after the agent is placed.
#[derive(Component, Debug, Clone)]
pub struct Rangefinder {
    pub config: RangefinderConfig,
    pub reading: Option<RangefinderReading>,
}

impl Rangefinder {
    /// The flattened distances, or every ray at its far value before the
    /// first scan.
    pub fn distances(&self) -> Vec<f32> {
        match &self.reading {
            Some(reading) => reading.to_vec(),
            None => vec![self.config.far_distance; self.config.reading_len()],
        }
    }
}

pub struct RangefinderPlugin;

impl Plugin for RangefinderPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            OnEnter(AppState::SceneBuilding),
            spawn_rangefinders.in_set(SceneBuildSet::ProcessSensors),
        )
        .add_systems(FixedUpdate, scan_rangefinders.in_set(SimulationSet::Sensors));
    }
}

/// Answers ray queries against the track through avian, ignoring the car
/// doing the casting.
pub struct SpatialRayQuery<'a, 'w, 's> {
    pub spatial_query: &'a SpatialQuery<'w, 's>,
    pub filter: SpatialQueryFilter,
}

impl RayQuery for SpatialRayQuery<'_, '_, '_> {
    fn cast_ray(&self, origin: Point, direction: CoreVec3, max_distance: f32) -> Option<f32> {
        let dir = Dir3::new(vec_to_bevy(&direction)).ok()?;
        self.spatial_query
            .cast_ray(point_to_bevy(&origin), dir, max_distance, true, &self.filter)
            .map(|hit| hit.distance)
    }
}

// =========================================================================
// == Spawning System ==
// =========================================================================

fn spawn_rangefinders(
    mut commands: Commands,
    request_query: Query<(Entity, &Name, &SpawnAgentConfigRequest)>,
) {
    for (entity, name, request) in &request_query {
        let config = request.config.rangefinder.clone();
        debug!(
            "  -> '{}': rangefinder with {} rays out to {:.1} m",
            name.as_str(),
            config.num_rays,
            config.cast_distance
        );
        commands.entity(entity).insert(Rangefinder {
            config,
            reading: None,
        });
    }
}

// =========================================================================
// == Runtime System ==
// =========================================================================

fn scan_rangefinders(
    spatial_query: SpatialQuery,
    mut query: Query<(Entity, &Transform, &mut Rangefinder), With<RacerAgent>>,
) {
    for (entity, transform, mut rangefinder) in &mut query {
        let rays = SpatialRayQuery {
            spatial_query: &spatial_query,
            filter: SpatialQueryFilter::from_mask(sensor_mask()).with_excluded_entities([entity]),
        };
        let reading = rangefinder.config.scan(&rays, &transform_to_pose(transform));
        rangefinder.reading = Some(reading);
    }
}
