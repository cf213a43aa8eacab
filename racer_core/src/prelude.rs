// racer_core/src/prelude.rs

// --- Contracts implemented by the physics side ---
pub use crate::perception::RayQuery;
pub use crate::vehicle::rig::{VehicleConstraint, VehicleState};

// --- Vehicle ---
pub use crate::vehicle::body::{world_transform, PartInstance, VehicleBody};
pub use crate::vehicle::classify::{classify, VehicleSkeleton};
pub use crate::vehicle::control::{ControlIntents, ControlState, VehicleTuning};
pub use crate::vehicle::parts::{MeshGeometry, MeshPart, SourceTitle, WheelSlot};
pub use crate::vehicle::rig::{RigConfig, SuspensionRig, SuspensionTuning};

// --- Perception & Track ---
pub use crate::perception::rangefinder::{RangefinderConfig, RangefinderReading};
pub use crate::track::{Track, TrackBlock, TrackLocalization, VroadSegment};

// --- Agents ---
pub use crate::agent::controller::{ControllerInput, DrivingController, NetworkController, WallFollower};
pub use crate::agent::progress::RaceProgress;
pub use crate::agent::{Agent, AgentRole, SpawnPoint};

pub use crate::collision::{CollisionEntity, CollisionRegistry};
pub use crate::error::{ClassifyError, ControllerError, TrackError};
pub use crate::types::{BodyHandle, Pose, Rotation, Vec3};
