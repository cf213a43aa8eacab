// racer_sim/src/simulation/config/mod.rs

//! Loading, resolving and validating everything the simulation reads from
//! disk: the scenario, the prefab catalog and the track.

mod catalog;
mod resolver;

pub mod structs;
pub mod track_file;

use bevy::prelude::*;

use crate::prelude::AppState;
use catalog::load_catalog_from_disk;
pub use catalog::{CatalogRoot, PrefabCatalog};
use racer_core::prelude::Track;
pub use structs::{AgentConfig, ScenarioConfig};
pub use track_file::TrackFile;

/// Expects a `ScenarioConfig` resource to be present before the app runs.
pub struct ConfigPlugin;

impl Plugin for ConfigPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ResolvedAgents>()
            .init_resource::<PrefabCatalog>()
            .init_resource::<CatalogRoot>()
            .add_systems(
                OnEnter(AppState::AssetLoading),
                (
                    load_catalog_from_disk,
                    resolve_scenario_agents,
                    load_track,
                    transition_to_scene_building,
                )
                    .chain(),
            );
    }
}

#[derive(Resource, Default, Debug)]
pub struct ResolvedAgents(pub Vec<AgentConfig>);

/// The track both as loaded from disk (for collider generation) and as the
/// validated core structure (for localization and placement).
#[derive(Resource, Debug, Clone)]
pub struct LoadedTrack {
    pub file: TrackFile,
    pub track: Track,
}

fn resolve_scenario_agents(
    scenario: Res<ScenarioConfig>,
    catalog: Res<PrefabCatalog>,
    mut resolved_agents: ResMut<ResolvedAgents>,
) {
    for agent_value in &scenario.agents {
        let resolved = match resolver::resolve_agent_value(agent_value, &catalog) {
            Ok(v) => v,
            Err(e) => {
                error!("Failed to resolve agent config: {}. Skipping agent.", e);
                continue;
            }
        };
        match resolved.deserialize::<AgentConfig>() {
            Ok(agent_config) => {
                info!("Resolved agent '{}'", agent_config.name);
                resolved_agents.0.push(agent_config);
            }
            Err(e) => {
                error!(
                    "Failed to deserialize resolved agent config: {}. Value was: {:?}. Skipping agent.",
                    e, resolved
                );
            }
        }
    }

    if resolved_agents.0.is_empty() {
        warn!("Scenario defines no usable agents; the track will be empty.");
    }
}

fn load_track(
    mut commands: Commands,
    scenario: Res<ScenarioConfig>,
    mut exit: EventWriter<AppExit>,
) {
    let path = &scenario.world.track_file;
    info!("Loading track from {}", path.display());

    let loaded = TrackFile::load(path).and_then(|file| {
        let track = file.to_track()?;
        Ok(LoadedTrack { file, track })
    });
    match loaded {
        Ok(loaded) => {
            info!(
                "Track '{}': {} blocks, {} vroad segments",
                loaded.track.name(),
                loaded.track.blocks().len(),
                loaded.track.vroad().len()
            );
            commands.insert_resource(loaded);
        }
        Err(e) => {
            error!("{}", e);
            exit.write(AppExit::error());
        }
    }
}

fn transition_to_scene_building(
    track: Option<Res<LoadedTrack>>,
    mut next_state: ResMut<NextState<AppState>>,
) {
    if track.is_none() {
        return;
    }
    info!("Configuration loaded. Transitioning to SceneBuilding.");
    next_state.set(AppState::SceneBuilding);
}
