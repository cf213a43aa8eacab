// racer_core/src/vehicle/mod.rs

pub mod body;
pub mod classify;
pub mod control;
pub mod parts;
pub mod rig;
