// racer_sim/src/simulation/config/structs.rs

use std::path::{Path, PathBuf};

use bevy::prelude::Resource;
use figment::{
    providers::{Format, Toml},
    value::Value,
    Figment,
};
use nalgebra::Point3;
use serde::Deserialize;

use racer_core::perception::rangefinder::RangefinderConfig;
use racer_core::prelude::{
    AgentRole, MeshGeometry, MeshPart, SourceTitle, SpawnPoint, SuspensionTuning, Vec3,
    VehicleTuning, WallFollower,
};

// =========================================================================
// == Top-Level Scenario ==
// =========================================================================

/// The root of a scenario file. Agents stay raw `Value`s until they have been
/// resolved against the prefab catalog.
#[derive(Resource, Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    #[serde(default)]
    pub simulation: SimulationConfig,
    pub world: WorldConfig,
    #[serde(default)]
    pub agents: Vec<Value>,
}

impl ScenarioConfig {
    /// Reads a scenario from disk. A missing file is an error, not an empty
    /// scenario.
    pub fn load(path: &Path) -> Result<Self, figment::Error> {
        if !path.exists() {
            return Err(figment::Error::from(format!(
                "scenario file {} does not exist",
                path.display()
            )));
        }
        Figment::new().merge(Toml::file(path)).extract()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct SimulationConfig {
    pub seed: Option<u64>,
    pub tick_rate_hz: f64,
    /// Ticks without progress before a training agent is respawned; 0 never.
    pub stall_ticks: u64,
    pub gravity: [f32; 3],
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: None,
            tick_rate_hz: 60.0,
            stall_ticks: 600,
            gravity: [0.0, -9.81, 0.0],
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorldConfig {
    pub track_file: PathBuf,
}

// =========================================================================
// == Agents ==
// =========================================================================

/// A fully resolved agent, ready for the spawn pipeline.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    pub name: String,
    pub role: AgentRole,
    pub car: CarConfig,
    pub spawn: SpawnPoint,
    #[serde(default)]
    pub controller: ControllerConfig,
    #[serde(default)]
    pub rangefinder: RangefinderConfig,
}

/// How an agent's decisions are made. Player agents always drive from the
/// keyboard, whatever is configured here.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "PascalCase")]
pub enum ControllerConfig {
    Network {
        /// Row-major layer weights. Randomly initialized from `stddev` when
        /// absent.
        #[serde(default)]
        weights: Option<Vec<f32>>,
        #[serde(default = "default_weight_stddev")]
        stddev: f32,
        #[serde(default)]
        threshold: f32,
    },
    WallFollower(WallFollower),
    Keyboard,
}

fn default_weight_stddev() -> f32 {
    0.5
}

impl Default for ControllerConfig {
    fn default() -> Self {
        ControllerConfig::WallFollower(WallFollower::default())
    }
}

// =========================================================================
// == Car Prefabs ==
// =========================================================================

/// A car as exported from one of the source titles: its named parts with box
/// geometry, plus driving and suspension tuning.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CarConfig {
    pub title: SourceTitle,
    #[serde(default = "default_spawn_height")]
    pub spawn_height: f32,
    #[serde(default)]
    pub tuning: VehicleTuning,
    #[serde(default)]
    pub suspension: SuspensionTuning,
    pub parts: Vec<PartConfig>,
}

fn default_spawn_height() -> f32 {
    0.6
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PartConfig {
    pub name: String,
    pub half_extents: [f32; 3],
    /// Rest position in chassis space.
    #[serde(default)]
    pub position: [f32; 3],
}

impl PartConfig {
    pub fn to_mesh_part(&self) -> MeshPart {
        MeshPart::new(
            self.name.clone(),
            box_geometry(Vec3::from(self.half_extents)),
            Vec3::from(self.position),
        )
    }
}

impl CarConfig {
    /// Builds the loader-side mesh parts in file order.
    pub fn mesh_parts(&self) -> Vec<MeshPart> {
        self.parts.iter().map(PartConfig::to_mesh_part).collect()
    }
}

/// An axis-aligned box centered on the part origin, as a closed triangle mesh.
pub fn box_geometry(half: Vec3) -> MeshGeometry {
    let vertices = (0..8)
        .map(|i| {
            Point3::new(
                if i & 1 == 0 { -half.x } else { half.x },
                if i & 2 == 0 { -half.y } else { half.y },
                if i & 4 == 0 { -half.z } else { half.z },
            )
        })
        .collect();
    #[rustfmt::skip]
    let indices = vec![
        0, 2, 1, 1, 2, 3, // -z
        4, 5, 6, 5, 7, 6, // +z
        0, 1, 4, 1, 5, 4, // -y
        2, 6, 3, 3, 6, 7, // +y
        0, 4, 2, 2, 4, 6, // -x
        1, 3, 5, 3, 7, 5, // +x
    ];
    MeshGeometry {
        vertices,
        indices,
        ..Default::default()
    }
}
