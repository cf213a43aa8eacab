// racer_sim/src/prelude.rs

// Re-export the entire Bevy prelude for convenience.
pub use bevy::prelude::*;

// Core types that do not clash with Bevy's math and transform names. Use
// `racer_core::prelude` directly for `Pose`, `Rotation` and `Vec3`.
pub use racer_core::prelude::{
    Agent, AgentRole, DrivingController, NetworkController, PartInstance, RangefinderConfig,
    RangefinderReading, RigConfig, SourceTitle, SpawnPoint, SuspensionRig, Track, VehicleBody,
    WallFollower, WheelSlot,
};

// Common simulation-specific types.
pub use crate::simulation::config::structs::*;
pub use crate::simulation::core::app_state::{AppState, SceneBuildSet, SimulationSet};
pub use crate::simulation::core::components::{AgentId, RacerAgent};
pub use crate::simulation::core::spawn_requests::SpawnAgentConfigRequest;
