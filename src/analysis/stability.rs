//! Stability accounting for the explicit flow scheme.
//!
//! The integrator recovers from two kinds of numerical trouble
//! locally: a degenerate timestep (replaced by the floor) and a
//! negative depth (clamped to zero). Both are legitimate one-off
//! events in the reference formulation, but a run that keeps hitting
//! them has diverged. The monitor counts occurrences and escalates to
//! a fatal error when the configured budgets are exceeded.

use tracing::warn;

use crate::error::SimulationError;
use crate::solver::{StepDiagnostics, Timestep};
use crate::types::NodeIndex;

/// Escalation thresholds for stability accounting.
#[derive(Clone, Copy, Debug)]
pub struct StabilityThresholds {
    /// Consecutive floored timesteps before the run is declared
    /// unstable.
    pub max_consecutive_dt_floors: usize,
    /// Total negative-depth clamps before the run is declared
    /// diverged.
    pub max_depth_clamps: u64,
}

impl Default for StabilityThresholds {
    fn default() -> Self {
        Self {
            max_consecutive_dt_floors: 5,
            max_depth_clamps: 10_000,
        }
    }
}

impl StabilityThresholds {
    /// Set the consecutive floored-timestep budget.
    pub fn with_max_consecutive_dt_floors(mut self, n: usize) -> Self {
        self.max_consecutive_dt_floors = n;
        self
    }

    /// Set the total negative-depth clamp budget.
    pub fn with_max_depth_clamps(mut self, n: u64) -> Self {
        self.max_depth_clamps = n;
        self
    }
}

/// Tracks recovered numerical issues across a run.
#[derive(Clone, Debug)]
pub struct StabilityMonitor {
    thresholds: StabilityThresholds,
    consecutive_dt_floors: usize,
    total_dt_floors: u64,
    total_clamps: u64,
    clamped_volume: f64,
    last_clamped: Option<NodeIndex>,
}

impl StabilityMonitor {
    /// Create a monitor with the given thresholds.
    pub fn new(thresholds: StabilityThresholds) -> Self {
        Self {
            thresholds,
            consecutive_dt_floors: 0,
            total_dt_floors: 0,
            total_clamps: 0,
            clamped_volume: 0.0,
            last_clamped: None,
        }
    }

    /// The thresholds in use.
    pub fn thresholds(&self) -> &StabilityThresholds {
        &self.thresholds
    }

    /// Total timestep floor substitutions so far.
    pub fn total_dt_floors(&self) -> u64 {
        self.total_dt_floors
    }

    /// Total negative-depth clamps so far.
    pub fn total_clamps(&self) -> u64 {
        self.total_clamps
    }

    /// Cumulative water volume discarded by clamping (m³).
    ///
    /// This is the conservation error the reference scheme accepts;
    /// it is tracked for observability, not corrected.
    pub fn clamped_volume(&self) -> f64 {
        self.clamped_volume
    }

    /// Record a timestep computation; errors once the consecutive
    /// floor budget is exhausted.
    pub fn record_timestep(&mut self, ts: &Timestep, time: f64) -> Result<(), SimulationError> {
        if ts.floored {
            self.consecutive_dt_floors += 1;
            self.total_dt_floors += 1;
            if self.consecutive_dt_floors >= self.thresholds.max_consecutive_dt_floors {
                return Err(SimulationError::UnstableTimestep {
                    time,
                    consecutive: self.consecutive_dt_floors,
                });
            }
        } else {
            self.consecutive_dt_floors = 0;
        }
        Ok(())
    }

    /// Record a completed sub-step; errors once the clamp budget is
    /// exhausted.
    pub fn record_step(
        &mut self,
        diag: &StepDiagnostics,
        time: f64,
    ) -> Result<(), SimulationError> {
        if diag.clamped_nodes > 0 {
            self.total_clamps += diag.clamped_nodes as u64;
            self.clamped_volume += diag.clamped_volume;
            if diag.last_clamped.is_some() {
                self.last_clamped = diag.last_clamped;
            }
            if self.total_clamps > self.thresholds.max_depth_clamps {
                let node = self.last_clamped.unwrap_or(NodeIndex::ZERO);
                warn!(
                    total_clamps = self.total_clamps,
                    clamped_volume = self.clamped_volume,
                    "negative-depth clamp budget exhausted"
                );
                return Err(SimulationError::DepthDiverged {
                    time,
                    node,
                    clamped: self.total_clamps,
                });
            }
        }
        Ok(())
    }
}
