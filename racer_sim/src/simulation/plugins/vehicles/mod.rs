// racer_sim/src/simulation/plugins/vehicles/mod.rs

pub mod car;
pub mod raycast_wheels;
