//! # runoff-rs
//!
//! Adaptive-timestep shallow-water overland flow over raster
//! watersheds.
//!
//! This crate provides the core building blocks of a rainfall-runoff
//! simulation:
//! - Raster grid topology with per-node boundary status
//! - Mutable flow state (per-node depth, per-link discharge)
//! - Step-function rainfall forcing
//! - de Almeida-style explicit integrator with an adaptive,
//!   CFL-bounded timestep
//! - Outlet discharge sampling into an append-only hydrograph
//! - A checkpointed driver loop with caller-controlled cancellation
//! - Stability accounting (timestep floors, depth clamps) with
//!   configurable escalation
//!
//! DEM acquisition, watershed delineation, and visualization are
//! external collaborators: the grid arrives ready-made and checkpoint
//! snapshots leave through an opaque callback.
//!
//! # Example
//!
//! ```
//! use runoff_rs::forcing::RainfallSchedule;
//! use runoff_rs::grid::RasterGrid;
//! use runoff_rs::simulation::{RunConfig, Simulation};
//! use runoff_rs::solver::{FlowState, OverlandFlowConfig};
//! use runoff_rs::types::NodeIndex;
//!
//! // A small tilted plane draining toward an outlet in the corner.
//! let rows = 6;
//! let cols = 6;
//! let z: Vec<f64> = (0..rows * cols)
//!     .map(|i| (i / cols + i % cols) as f64 * 0.1)
//!     .collect();
//! let mut grid = RasterGrid::new(rows, cols, 10.0, z).unwrap();
//! let outlet = NodeIndex::new(cols + 1);
//! grid.set_outlet(outlet).unwrap();
//!
//! let sim = Simulation::new(&grid, outlet, RunConfig::new(120.0, 30.0))
//!     .unwrap()
//!     .with_rainfall(RainfallSchedule::storm(60.0, 1e-5).unwrap());
//!
//! let config = OverlandFlowConfig::default();
//! let mut state = FlowState::new(&grid, config.h_init);
//! let output = sim.run_to_completion(&mut state).unwrap();
//!
//! assert_eq!(output.report.checkpoints_completed, 4);
//! assert_eq!(output.discharge.len(), output.report.n_steps);
//! ```

pub mod analysis;
pub mod error;
pub mod forcing;
pub mod grid;
pub mod simulation;
pub mod solver;
pub mod types;

// Re-export main types for convenience
pub use analysis::{
    DischargeSeries, HydrographMetrics, OutletSampler, SeriesPoint, StabilityMonitor,
    StabilityThresholds,
};
pub use error::SimulationError;
pub use forcing::{ForcingError, RainInterval, RainfallSchedule};
pub use grid::{GridError, Link, NodeStatus, RasterGrid};
pub use simulation::{Checkpoint, RunConfig, RunOutput, RunReport, Simulation};
pub use solver::{
    advance, compute_timestep, FlowState, OverlandFlowConfig, StepDiagnostics, Timestep,
};
pub use types::{Depth, LinkIndex, NodeIndex};
