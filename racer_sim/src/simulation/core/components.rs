// racer_sim/src/simulation/core/components.rs

use bevy::prelude::Component;
use racer_core::prelude::Agent;

// --- Wrapper Components for Core Types ---

/// A car on the track with its classified body, rig, controller and race
/// bookkeeping. Lives on the chassis entity.
#[derive(Component, Debug)]
pub struct RacerAgent(pub Agent);

/// The agent's position in the scenario, used as its collision identity.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AgentId(pub usize);
