// racer_sim/src/simulation/core/app_state.rs

use bevy::{ecs::schedule::SystemSet, prelude::States};

/// Defines the major phases of the application's lifecycle.
#[derive(States, Debug, Clone, Eq, PartialEq, Hash, Default)]
pub enum AppState {
    /// Configuration, catalog and track are read from disk.
    #[default]
    AssetLoading,

    /// Track colliders and agents are spawned from the loaded configuration.
    SceneBuilding,

    /// The fixed-rate race loop is running.
    Running,
}

/// Passes of the agent spawn pipeline, run once on entering `SceneBuilding`.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum SceneBuildSet {
    /// Pass 1: Agent shells carrying their request.
    CreateRequests,

    /// Pass 2: Classify the car parts and build body and suspension rig.
    ProcessVehicle,

    /// Pass 3: Rangefinders.
    ProcessSensors,

    /// Pass 4: Decision controllers.
    ProcessControllers,

    /// Pass 5: Rigid body, collider and raycast wheels.
    Physics,

    /// Pass 6: Assemble the agent and queue its first placement.
    Finalize,

    /// Pass 7: Remove all temporary request components.
    Cleanup,
}

// =========================================================================
// == Main Simulation Sets ==
// =========================================================================

/// One race tick, in order. Avian's own sets run between `Actuation` and
/// `StateSync`.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum SimulationSet {
    /// Controllers and the keyboard latch this tick's intents.
    Decision,
    /// Intents become wheel forces and steering; pending resets are applied.
    Actuation,
    /// Chassis and wheel poses are read back onto the vehicle bodies.
    StateSync,
    /// Rangefinder scans.
    Sensors,
    /// Nearest block and vroad lookup.
    Localization,
    /// Fitness, stall detection and respawns.
    Progress,
}
