//! Simulation driver: checkpointed time-marching over a prepared grid.

mod runner;

pub use runner::{Checkpoint, RunConfig, RunOutput, RunReport, Simulation};
