// racer_sim/src/simulation/plugins/agents/progress.rs

use crate::prelude::*;
use crate::simulation::config::LoadedTrack;
use crate::simulation::core::simulation_setup::RaceClock;
use crate::simulation::core::transforms::point_from_bevy;

/// How often the standings are written to the log, in race ticks.
const STANDINGS_INTERVAL: u64 = 600;

pub struct ProgressPlugin;

impl Plugin for ProgressPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            FixedUpdate,
            (
                localize_agents.in_set(SimulationSet::Localization),
                (track_progress, log_standings)
                    .chain()
                    .in_set(SimulationSet::Progress),
            ),
        );
    }
}

fn localize_agents(track: Res<LoadedTrack>, mut query: Query<(&Transform, &mut RacerAgent)>) {
    for (transform, mut agent) in &mut query {
        agent
            .0
            .localize(&track.track, &point_from_bevy(transform.translation));
    }
}

/// Scores this tick and puts stalled training agents back at their spawn.
fn track_progress(
    track: Res<LoadedTrack>,
    scenario: Option<Res<ScenarioConfig>>,
    mut query: Query<&mut RacerAgent>,
) {
    let stall_ticks = scenario.map_or(SimulationConfig::default().stall_ticks, |s| {
        s.simulation.stall_ticks
    });
    for mut agent in &mut query {
        if !agent.0.record_progress(stall_ticks) {
            continue;
        }
        let fitness = agent.0.progress.fitness;
        match agent.0.respawn(&track.track) {
            Ok(_) => debug!(
                "[PROGRESS] '{}' respawned, episode {} (last fitness {:.2})",
                agent.0.name, agent.0.progress.episodes, fitness
            ),
            Err(e) => warn!("[PROGRESS] '{}' cannot respawn: {}", agent.0.name, e),
        }
    }
}

fn log_standings(clock: Res<RaceClock>, query: Query<(&AgentId, &RacerAgent)>) {
    if clock.ticks == 0 || clock.ticks % STANDINGS_INTERVAL != 0 {
        return;
    }
    let mut standings: Vec<_> = query.iter().collect();
    standings.sort_by_key(|(id, _)| id.0);
    for (id, agent) in standings {
        let progress = &agent.0.progress;
        info!(
            "[STANDINGS] tick {} #{} '{}': vroad {}, fitness {:.2} (best {:.2}), episode {}",
            clock.ticks,
            id.0,
            agent.0.name,
            progress.furthest_vroad,
            progress.fitness,
            progress.best_fitness,
            progress.episodes
        );
    }
}
