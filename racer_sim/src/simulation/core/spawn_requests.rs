// racer_sim/src/simulation/core/spawn_requests.rs

use bevy::prelude::Component;

use crate::prelude::AgentConfig;

/// Carries an agent's resolved configuration through the spawn pipeline.
#[derive(Component, Clone)]
pub struct SpawnAgentConfigRequest {
    /// Position in the scenario's agent list; doubles as the collision id.
    pub index: usize,
    pub config: AgentConfig,
}
