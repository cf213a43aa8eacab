// racer_core/src/agent/progress.rs

use crate::track::TrackLocalization;

/// Fitness lost per tick spent outside the track blocks.
const OFF_TRACK_PENALTY: f32 = 0.01;

/// Per-episode bookkeeping of how far an agent has come.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RaceProgress {
    pub ticks_alive: u64,
    /// Highest vroad index reached this episode.
    pub furthest_vroad: usize,
    pub ticks_since_progress: u64,
    pub off_track_ticks: u64,
    pub fitness: f32,
    /// Best fitness over all episodes.
    pub best_fitness: f32,
    pub episodes: u32,
}

impl RaceProgress {
    /// Starts counting from the vroad the agent spawned on.
    pub fn starting_at(vroad: usize) -> Self {
        Self {
            furthest_vroad: vroad,
            ..Default::default()
        }
    }

    /// Records one tick at `localization`. Progress means reaching a vroad
    /// index past the furthest so far; time off the track costs fitness.
    pub fn record(&mut self, localization: &TrackLocalization) {
        self.ticks_alive += 1;
        if localization.nearest_vroad > self.furthest_vroad {
            self.furthest_vroad = localization.nearest_vroad;
            self.ticks_since_progress = 0;
        } else {
            self.ticks_since_progress += 1;
        }

        if !localization.on_track {
            self.off_track_ticks += 1;
        }
        self.fitness =
            self.furthest_vroad as f32 - OFF_TRACK_PENALTY * self.off_track_ticks as f32;
        self.best_fitness = self.best_fitness.max(self.fitness);
    }

    pub fn is_stalled(&self, stall_ticks: u64) -> bool {
        stall_ticks > 0 && self.ticks_since_progress >= stall_ticks
    }

    /// Ends the episode and starts a fresh one from `vroad`.
    pub fn restart(&mut self, vroad: usize) {
        *self = Self {
            best_fitness: self.best_fitness,
            episodes: self.episodes + 1,
            ..Self::starting_at(vroad)
        };
    }
}
