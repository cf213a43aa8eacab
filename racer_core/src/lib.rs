// racer_core/src/lib.rs

pub mod agent;
pub mod collision;
pub mod error;
pub mod perception;
pub mod prelude;
pub mod track;
pub mod types;
pub mod vehicle;
