// racer_sim/src/simulation/plugins/world/track.rs

use avian3d::prelude::*;
use bevy::ecs::system::EntityCommands;

use crate::cli::Cli;
use crate::prelude::*;
use crate::simulation::config::track_file::ObjectEntry;
use crate::simulation::config::{LoadedTrack, TrackFile};
use crate::simulation::core::layers::{dynamic_track_layers, track_layers};
use crate::simulation::core::transforms::{point_from_bevy, point_to_bevy, vec_to_bevy};
use racer_core::prelude::{BodyHandle, CollisionEntity, CollisionRegistry};

/// Thickness of the generated side walls.
const WALL_THICKNESS: f32 = 0.3;
/// Road pieces are stretched by this much so consecutive slabs overlap.
const SEGMENT_OVERLAP: f32 = 0.1;

/// Maps avian entities back to the agents, track blocks and props they
/// belong to.
#[derive(Resource, Debug, Default)]
pub struct CollisionIndex(pub CollisionRegistry);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PieceKind {
    Road,
    Wall,
}

/// One box collider generated from a vroad segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackPiece {
    pub transform: Transform,
    /// Full extents along the piece's local right, up and backward axes.
    pub size: Vec3,
    pub block: usize,
    pub kind: PieceKind,
}

pub struct TrackPlugin;

impl Plugin for TrackPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<CollisionIndex>()
            .add_systems(
                OnEnter(AppState::SceneBuilding),
                (
                    spawn_lighting_and_camera,
                    spawn_track_geometry.in_set(SceneBuildSet::Physics),
                ),
            )
            .add_systems(
                FixedUpdate,
                log_collisions.in_set(SimulationSet::Progress),
            );
    }
}

// =========================================================================
// == Geometry ==
// =========================================================================

/// Lays a road slab and two walls along every vroad segment. A closed track
/// also joins the last point back to the first.
pub fn road_pieces(file: &TrackFile, track: &Track) -> Vec<TrackPiece> {
    let vroad = track.vroad();
    let count = vroad.len();
    let spans = if file.closed { count } else { count.saturating_sub(1) };
    let mut pieces = Vec::with_capacity(spans * 3);

    for i in 0..spans {
        let segment = &vroad[i];
        let start = point_to_bevy(&segment.point);
        let end = point_to_bevy(&vroad[(i + 1) % count].point);
        let Some(forward) = (end - start).try_normalize() else {
            continue;
        };
        let up = vec_to_bevy(&segment.normal);
        let Some(right) = forward.cross(up).try_normalize() else {
            continue;
        };
        let up = right.cross(forward);

        let length = start.distance(end) + SEGMENT_OVERLAP;
        let mid = (start + end) * 0.5;
        let block = owning_block(track, i, mid);
        let oriented = |center: Vec3| Transform::from_translation(center).looking_to(forward, up);

        let width = segment.left_wall + segment.right_wall;
        let road_center = mid + right * (segment.right_wall - segment.left_wall) * 0.5
            - up * file.road_thickness * 0.5;
        pieces.push(TrackPiece {
            transform: oriented(road_center),
            size: Vec3::new(width + 2.0 * WALL_THICKNESS, file.road_thickness, length),
            block,
            kind: PieceKind::Road,
        });

        let wall_size = Vec3::new(WALL_THICKNESS, file.wall_height, length);
        let wall_lift = up * file.wall_height * 0.5;
        let right_wall = mid + right * (segment.right_wall + WALL_THICKNESS * 0.5) + wall_lift;
        let left_wall = mid - right * (segment.left_wall + WALL_THICKNESS * 0.5) + wall_lift;
        for center in [right_wall, left_wall] {
            pieces.push(TrackPiece {
                transform: oriented(center),
                size: wall_size,
                block,
                kind: PieceKind::Wall,
            });
        }
    }
    pieces
}

fn owning_block(track: &Track, vroad_index: usize, mid: Vec3) -> usize {
    track
        .blocks()
        .iter()
        .position(|b| (b.first_vroad..b.first_vroad + b.vroad_count).contains(&vroad_index))
        .unwrap_or_else(|| track.nearest_block(&point_from_bevy(mid)))
}

// =========================================================================
// == Spawning Systems ==
// =========================================================================

fn spawn_lighting_and_camera(mut commands: Commands, cli: Option<Res<Cli>>) {
    if cli.is_some_and(|cli| cli.headless) {
        return;
    }
    commands.spawn((
        DirectionalLight {
            shadows_enabled: true,
            illuminance: 15_000.0,
            ..default()
        },
        Transform::from_xyz(0.0, 50.0, 0.0).looking_at(Vec3::new(0.3, 0.0, 0.2), Vec3::Y),
    ));

    let camera_transform =
        Transform::from_xyz(-60.0, 80.0, 60.0).looking_at(Vec3::ZERO, Vec3::Y);
    commands.spawn((Camera3d::default(), camera_transform));
}

fn spawn_track_geometry(
    mut commands: Commands,
    loaded: Res<LoadedTrack>,
    cli: Option<Res<Cli>>,
    meshes: Option<ResMut<Assets<Mesh>>>,
    materials: Option<ResMut<Assets<StandardMaterial>>>,
    mut collisions: ResMut<CollisionIndex>,
) {
    let pieces = road_pieces(&loaded.file, &loaded.track);
    info!(
        "[SCENE] Spawning {} track pieces and {} objects for '{}'",
        pieces.len(),
        loaded.file.objects.len(),
        loaded.track.name()
    );

    let headless = cli.is_some_and(|cli| cli.headless);
    let mut visuals = match (meshes, materials) {
        (Some(meshes), Some(mut materials)) if !headless => {
            let road = materials.add(Color::srgb(0.3, 0.3, 0.32));
            let wall = materials.add(Color::srgb(0.85, 0.85, 0.8));
            let prop = materials.add(Color::srgb(0.9, 0.5, 0.1));
            Some((meshes, road, wall, prop))
        }
        _ => None,
    };

    for (i, piece) in pieces.iter().enumerate() {
        let name = match piece.kind {
            PieceKind::Road => format!("road_{i}"),
            PieceKind::Wall => format!("wall_{i}"),
        };
        let mut entity = commands.spawn((
            Name::new(name),
            piece.transform,
            RigidBody::Static,
            Collider::cuboid(piece.size.x, piece.size.y, piece.size.z),
            track_layers(),
        ));
        if let Some((meshes, road, wall, _)) = visuals.as_mut() {
            let material = match piece.kind {
                PieceKind::Road => road.clone(),
                PieceKind::Wall => wall.clone(),
            };
            entity.insert((
                Mesh3d(meshes.add(Cuboid::from_size(piece.size))),
                MeshMaterial3d(material),
            ));
        }
        collisions.0.register(
            BodyHandle::from_entity(entity.id()),
            CollisionEntity::TrackGeometry { block: piece.block },
        );
    }

    for (i, object) in loaded.file.objects.iter().enumerate() {
        let size = Vec3::from_array(object.half_extents) * 2.0;
        let mut entity = commands.spawn((
            Name::new(format!("object_{i}")),
            Transform::from_translation(Vec3::from_array(object.center)),
            Collider::cuboid(size.x, size.y, size.z),
        ));
        insert_object_body(&mut entity, object);
        if let Some((meshes, _, _, prop)) = visuals.as_mut() {
            entity.insert((
                Mesh3d(meshes.add(Cuboid::from_size(size))),
                MeshMaterial3d(prop.clone()),
            ));
        }
        collisions.0.register(
            BodyHandle::from_entity(entity.id()),
            CollisionEntity::StaticObject,
        );
    }
}

fn insert_object_body(entity: &mut EntityCommands, object: &ObjectEntry) {
    if object.dynamic {
        entity.insert((
            RigidBody::Dynamic,
            Mass(object.mass),
            dynamic_track_layers(),
        ));
    } else {
        entity.insert((RigidBody::Static, track_layers()));
    }
}

// =========================================================================
// == Runtime Systems ==
// =========================================================================

fn log_collisions(mut started: EventReader<CollisionStarted>, collisions: Res<CollisionIndex>) {
    for CollisionStarted(a, b) in started.read() {
        let resolve = |e: Entity| collisions.0.resolve(BodyHandle::from_entity(e));
        match (resolve(*a), resolve(*b)) {
            (Some(CollisionEntity::Vehicle { agent: x }), Some(CollisionEntity::Vehicle { agent: y })) => {
                debug!("[COLLISION] agents {} and {} collided", x, y);
            }
            (Some(CollisionEntity::Vehicle { agent }), Some(other))
            | (Some(other), Some(CollisionEntity::Vehicle { agent })) => {
                trace!("[COLLISION] agent {} hit {:?}", agent, other);
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OVAL: &str = r#"
name = "square"

[[blocks]]
center = [0.0, 0.0, 0.0]
half_extents = [30.0, 5.0, 30.0]
first_vroad = 0
vroad_count = 2

[[blocks]]
center = [0.0, 0.0, -40.0]
half_extents = [30.0, 5.0, 30.0]
first_vroad = 2
vroad_count = 2

[[vroad]]
point = [0.0, 0.0, 0.0]
forward = [0.0, 0.0, -1.0]
left_wall = 4.0
right_wall = 6.0

[[vroad]]
point = [0.0, 0.0, -20.0]
forward = [1.0, 0.0, 0.0]
left_wall = 4.0
right_wall = 6.0

[[vroad]]
point = [20.0, 0.0, -20.0]
forward = [0.0, 0.0, 1.0]
left_wall = 4.0
right_wall = 6.0

[[vroad]]
point = [20.0, 0.0, 0.0]
forward = [-1.0, 0.0, 0.0]
left_wall = 4.0
right_wall = 6.0
"#;

    fn load(text: &str) -> (TrackFile, Track) {
        let file = TrackFile::from_toml_str(text).unwrap();
        let track = file.to_track().unwrap();
        (file, track)
    }

    #[test]
    fn closed_track_has_three_pieces_per_point() {
        let (file, track) = load(OVAL);
        let pieces = road_pieces(&file, &track);
        assert_eq!(pieces.len(), 12);
        assert_eq!(
            pieces.iter().filter(|p| p.kind == PieceKind::Road).count(),
            4
        );
    }

    #[test]
    fn open_track_does_not_wrap() {
        let (file, track) = load(&OVAL.replacen("name = \"square\"", "name = \"square\"\nclosed = false", 1));
        assert_eq!(road_pieces(&file, &track).len(), 9);
    }

    #[test]
    fn road_slab_sits_under_the_vroad() {
        let (file, track) = load(OVAL);
        let road = road_pieces(&file, &track)[0];

        // First segment runs from the origin toward -Z; right is +X.
        let expected = Vec3::new(1.0, -0.25, -10.0);
        assert!(road.transform.translation.abs_diff_eq(expected, 1e-4));
        assert!(road.transform.forward().as_vec3().abs_diff_eq(Vec3::NEG_Z, 1e-5));
        assert!(road.transform.right().as_vec3().abs_diff_eq(Vec3::X, 1e-5));
        assert!((road.size.x - (10.0 + 2.0 * WALL_THICKNESS)).abs() < 1e-5);
        assert!((road.size.z - (20.0 + SEGMENT_OVERLAP)).abs() < 1e-5);
        assert_eq!(road.block, 0);
    }

    #[test]
    fn walls_bound_the_road() {
        let (file, track) = load(OVAL);
        let pieces = road_pieces(&file, &track);
        let (right, left) = (pieces[1], pieces[2]);

        assert_eq!(right.kind, PieceKind::Wall);
        assert!((right.transform.translation.x - (6.0 + WALL_THICKNESS * 0.5)).abs() < 1e-4);
        assert!((left.transform.translation.x + (4.0 + WALL_THICKNESS * 0.5)).abs() < 1e-4);
        assert!((right.transform.translation.y - file.wall_height * 0.5).abs() < 1e-4);
    }

    #[test]
    fn closing_segment_belongs_to_last_block() {
        let (file, track) = load(OVAL);
        let pieces = road_pieces(&file, &track);
        assert!(pieces[9..].iter().all(|p| p.block == 1));
    }
}
