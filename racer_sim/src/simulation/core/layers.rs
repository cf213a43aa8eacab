// racer_sim/src/simulation/core/layers.rs

use avian3d::prelude::{CollisionLayers, LayerMask, PhysicsLayer};

#[derive(PhysicsLayer, Clone, Copy, Debug, Default)]
pub enum GameLayer {
    #[default]
    Default,
    Vehicle,
    /// Road slabs and walls.
    Track,
    /// Props that can be pushed around.
    DynamicTrack,
}

/// What rangefinders and suspension rays are allowed to hit.
pub fn sensor_mask() -> LayerMask {
    LayerMask::from([GameLayer::Track, GameLayer::DynamicTrack])
}

pub fn vehicle_layers() -> CollisionLayers {
    CollisionLayers::new(
        GameLayer::Vehicle,
        [GameLayer::Vehicle, GameLayer::Track, GameLayer::DynamicTrack],
    )
}

pub fn track_layers() -> CollisionLayers {
    CollisionLayers::new(
        GameLayer::Track,
        [GameLayer::Vehicle, GameLayer::DynamicTrack],
    )
}

pub fn dynamic_track_layers() -> CollisionLayers {
    CollisionLayers::new(
        GameLayer::DynamicTrack,
        [GameLayer::Vehicle, GameLayer::Track, GameLayer::DynamicTrack],
    )
}
