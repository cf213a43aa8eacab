// racer_core/src/collision.rs

use std::collections::HashMap;

use crate::types::BodyHandle;

/// What a collision body belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollisionEntity {
    /// The chassis of the agent with this index.
    Vehicle { agent: usize },
    TrackGeometry { block: usize },
    StaticObject,
}

impl CollisionEntity {
    /// Whether rangefinders are allowed to see this body.
    pub fn is_sensor_visible(&self) -> bool {
        !matches!(self, CollisionEntity::Vehicle { .. })
    }
}

/// Maps physics body handles back to the game objects that own them.
#[derive(Debug, Clone, Default)]
pub struct CollisionRegistry {
    entries: HashMap<BodyHandle, CollisionEntity>,
}

impl CollisionRegistry {
    pub fn register(&mut self, handle: BodyHandle, entity: CollisionEntity) -> Option<CollisionEntity> {
        self.entries.insert(handle, entity)
    }

    pub fn unregister(&mut self, handle: BodyHandle) -> Option<CollisionEntity> {
        self.entries.remove(&handle)
    }

    pub fn resolve(&self, handle: BodyHandle) -> Option<CollisionEntity> {
        self.entries.get(&handle).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Handles of every registered vehicle chassis.
    pub fn vehicles(&self) -> impl Iterator<Item = (BodyHandle, usize)> + '_ {
        self.entries.iter().filter_map(|(h, e)| match e {
            CollisionEntity::Vehicle { agent } => Some((*h, *agent)),
            _ => None,
        })
    }
}
