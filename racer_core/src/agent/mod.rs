// racer_core/src/agent/mod.rs

pub mod controller;
pub mod progress;

use serde::Deserialize;
use tracing::debug;

use crate::agent::controller::{ControllerInput, DrivingController};
use crate::agent::progress::RaceProgress;
use crate::error::{ControllerError, TrackError};
use crate::track::{Track, TrackLocalization};
use crate::types::{Point, Pose};
use crate::vehicle::body::VehicleBody;
use crate::vehicle::control::{ControlIntents, ControlState};
use crate::vehicle::rig::{SuspensionRig, VehicleConstraint, VehicleState};

/// Who is behind the wheel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub enum AgentRole {
    /// A learning agent; put back at its spawn whenever it stops making progress.
    Training,
    Racing,
    /// Driven from the keyboard.
    Player,
}

/// Where an agent starts and respawns.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(tag = "type", deny_unknown_fields)]
pub enum SpawnPoint {
    Vroad {
        index: usize,
        #[serde(default)]
        offset: f32,
    },
    TrackBlock {
        block: usize,
        #[serde(default)]
        position: usize,
        #[serde(default)]
        offset: f32,
    },
}

/// One car on the track together with whatever drives it.
#[derive(Debug, Clone)]
pub struct Agent {
    pub name: String,
    pub role: AgentRole,
    pub body: VehicleBody,
    pub rig: SuspensionRig,
    pub control: ControlState,
    /// `None` for player cars, whose intents come from outside.
    controller: Option<Box<dyn DrivingController>>,
    pub localization: TrackLocalization,
    pub progress: RaceProgress,
    pub spawn: SpawnPoint,
    /// Height above the road surface at which the car is dropped.
    pub spawn_height: f32,
}

impl Agent {
    pub fn new(
        name: impl Into<String>,
        role: AgentRole,
        body: VehicleBody,
        rig: SuspensionRig,
        controller: Option<Box<dyn DrivingController>>,
        spawn: SpawnPoint,
        spawn_height: f32,
    ) -> Self {
        Self {
            name: name.into(),
            role,
            body,
            rig,
            control: ControlState::default(),
            controller,
            localization: TrackLocalization::default(),
            progress: RaceProgress::default(),
            spawn,
            spawn_height,
        }
    }

    pub fn controller_kind(&self) -> &'static str {
        self.controller.as_ref().map_or("Keyboard", |c| c.kind())
    }

    // --- Decision ---

    /// Runs the controller on this tick's perception and latches its intents.
    /// Returns `None` for agents without a controller.
    pub fn decide(
        &mut self,
        ranges: &[f32],
        speed: f32,
    ) -> Result<Option<ControlIntents>, ControllerError> {
        let Some(controller) = self.controller.as_mut() else {
            return Ok(None);
        };
        let input = ControllerInput {
            ranges,
            localization: self.localization,
            speed,
        };
        let intents = controller.decide(&input)?;
        self.control.apply_intents(&intents);
        Ok(Some(intents))
    }

    /// Latches externally produced intents.
    pub fn drive(&mut self, intents: &ControlIntents) {
        self.control.apply_intents(intents);
    }

    // --- Physics ---

    pub fn actuate<C: VehicleConstraint + ?Sized>(&mut self, constraint: &mut C) {
        self.rig.actuate(&mut self.control, constraint, &mut self.body);
    }

    pub fn sync<C: VehicleState + ?Sized>(&mut self, constraint: &C) {
        self.rig.tick(constraint, &mut self.body);
    }

    // --- Placement ---

    /// Requests a reset onto vroad segment `index`, `offset` metres right of
    /// the center line.
    pub fn reset_to_vroad(
        &mut self,
        track: &Track,
        index: usize,
        offset: f32,
    ) -> Result<Pose, TrackError> {
        let pose = track.vroad_pose(index, offset, self.spawn_height)?;
        self.control
            .reset_car(Point::from(pose.translation.vector), pose.rotation);
        Ok(pose)
    }

    /// Requests a reset onto the `pos_index`th vroad segment of a block.
    pub fn reset_to_trackblock(
        &mut self,
        track: &Track,
        block: usize,
        pos_index: usize,
        offset: f32,
    ) -> Result<Pose, TrackError> {
        let index = track.block_vroad_index(block, pos_index)?;
        self.reset_to_vroad(track, index, offset)
    }

    pub fn spawn_vroad(&self, track: &Track) -> Result<usize, TrackError> {
        match self.spawn {
            SpawnPoint::Vroad { index, .. } => track.segment(index).map(|_| index),
            SpawnPoint::TrackBlock {
                block, position, ..
            } => track.block_vroad_index(block, position),
        }
    }

    /// Puts the agent back at its spawn and starts a new episode.
    pub fn respawn(&mut self, track: &Track) -> Result<Pose, TrackError> {
        let pose = match self.spawn {
            SpawnPoint::Vroad { index, offset } => self.reset_to_vroad(track, index, offset)?,
            SpawnPoint::TrackBlock {
                block,
                position,
                offset,
            } => self.reset_to_trackblock(track, block, position, offset)?,
        };
        let vroad = self.spawn_vroad(track)?;
        self.progress.restart(vroad);
        self.localization = track.locate(&Point::from(pose.translation.vector));
        Ok(pose)
    }

    // --- Bookkeeping ---

    pub fn localize(&mut self, track: &Track, position: &Point) {
        self.localization = track.locate(position);
    }

    /// Records this tick's progress. Returns true when a training agent has
    /// stalled and should be respawned.
    pub fn record_progress(&mut self, stall_ticks: u64) -> bool {
        self.progress.record(&self.localization);
        let stalled = self.role == AgentRole::Training && self.progress.is_stalled(stall_ticks);
        if stalled {
            debug!(
                "{} stalled at vroad {} after {} ticks (fitness {:.2})",
                self.name,
                self.progress.furthest_vroad,
                self.progress.ticks_alive,
                self.progress.fitness
            );
        }
        stalled
    }
}
