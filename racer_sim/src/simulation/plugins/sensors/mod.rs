// racer_sim/src/simulation/plugins/sensors/mod.rs

pub mod rangefinder;
