// racer_sim/src/simulation/plugins/mod.rs

pub mod agents;
pub mod sensors;
pub mod vehicles;
pub mod world;
