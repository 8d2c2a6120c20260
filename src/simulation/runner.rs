//! Checkpointed simulation driver.
//!
//! The driver is an explicit two-phase state machine. In `Running` it
//! sub-steps the integrator until the elapsed time reaches the next
//! checkpoint target; in `CheckpointReached` it hands a state snapshot
//! and the accumulated hydrograph to the caller's checkpoint sink,
//! then either resumes or finishes. Checkpoints are visited in
//! strictly increasing target-time order and are never skipped, even
//! when a single sub-step jumps past several targets.

use std::ops::ControlFlow;
use std::time::Instant;

use tracing::{info, warn};

use crate::analysis::{DischargeSeries, OutletSampler, StabilityMonitor, StabilityThresholds};
use crate::error::SimulationError;
use crate::forcing::RainfallSchedule;
use crate::grid::RasterGrid;
use crate::solver::{advance, compute_timestep, FlowState, OverlandFlowConfig};
use crate::types::NodeIndex;

/// Run duration and checkpoint cadence.
#[derive(Clone, Copy, Debug)]
pub struct RunConfig {
    /// Total simulated duration (s).
    pub model_run_time: f64,
    /// Interval between checkpoint callbacks (s).
    pub time_step: f64,
}

impl RunConfig {
    /// Create a run configuration.
    pub fn new(model_run_time: f64, time_step: f64) -> Self {
        Self {
            model_run_time,
            time_step,
        }
    }
}

/// Phase of the driver state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum RunPhase {
    /// Sub-stepping toward the next checkpoint target.
    Running,
    /// Target reached; the checkpoint sink runs next.
    CheckpointReached,
    /// All checkpoints processed or the caller cancelled.
    Finished,
}

/// Snapshot handed to the checkpoint sink.
///
/// The driver does not know or care what the sink does with it
/// (plotting, export); both references are read-only views of the
/// live run.
#[derive(Debug)]
pub struct Checkpoint<'a> {
    /// Checkpoint target time (s): `index * time_step`.
    pub time: f64,
    /// Actual elapsed simulated time, `>= time` (the last sub-step may
    /// overshoot the target by at most one dt).
    pub elapsed: f64,
    /// 1-based checkpoint number.
    pub index: usize,
    /// Sub-steps executed so far.
    pub n_steps: usize,
    /// Current flow state.
    pub state: &'a FlowState,
    /// Hydrograph accumulated so far.
    pub discharge: &'a DischargeSeries,
}

/// Statistics from a finished (or cancelled) run.
#[derive(Clone, Debug)]
pub struct RunReport {
    /// Elapsed simulated time when the run ended (s).
    pub final_time: f64,
    /// Total sub-steps executed.
    pub n_steps: usize,
    /// Smallest sub-step used (s); zero if no sub-step ran.
    pub dt_min: f64,
    /// Largest sub-step used (s).
    pub dt_max: f64,
    /// Wall-clock duration of the run (s), cosmetic only.
    pub wall_time: f64,
    /// Checkpoints completed before the run ended.
    pub checkpoints_completed: usize,
    /// Whether the caller cancelled at a checkpoint.
    pub cancelled: bool,
}

/// A finished run: statistics plus the full outlet hydrograph.
#[derive(Debug)]
pub struct RunOutput {
    /// Run statistics.
    pub report: RunReport,
    /// The complete discharge series, one sample per sub-step.
    pub discharge: DischargeSeries,
}

/// Checkpointed overland-flow simulation over a prepared grid.
///
/// # Example
///
/// ```
/// use runoff_rs::forcing::RainfallSchedule;
/// use runoff_rs::grid::RasterGrid;
/// use runoff_rs::simulation::{RunConfig, Simulation};
/// use runoff_rs::solver::{FlowState, OverlandFlowConfig};
/// use runoff_rs::types::NodeIndex;
///
/// let mut grid = RasterGrid::flat(5, 5, 10.0).unwrap();
/// grid.set_outlet(NodeIndex::new(6)).unwrap();
///
/// let sim = Simulation::new(&grid, NodeIndex::new(6), RunConfig::new(60.0, 30.0))
///     .unwrap()
///     .with_rainfall(RainfallSchedule::storm(30.0, 1e-5).unwrap());
///
/// let config = OverlandFlowConfig::default();
/// let mut state = FlowState::new(&grid, config.h_init);
/// let output = sim.run_to_completion(&mut state).unwrap();
/// assert_eq!(output.report.checkpoints_completed, 2);
/// ```
pub struct Simulation<'g> {
    grid: &'g RasterGrid,
    outlet: NodeIndex,
    run: RunConfig,
    flow: OverlandFlowConfig,
    schedule: RainfallSchedule,
    thresholds: StabilityThresholds,
}

impl<'g> Simulation<'g> {
    /// Create a simulation over a prepared grid.
    ///
    /// Fails fast, before any sub-step, if the run configuration is
    /// unusable or the grid's boundary configuration has no valid
    /// outlet.
    pub fn new(
        grid: &'g RasterGrid,
        outlet: NodeIndex,
        run: RunConfig,
    ) -> Result<Self, SimulationError> {
        if !run.model_run_time.is_finite()
            || !run.time_step.is_finite()
            || run.model_run_time <= 0.0
            || run.time_step <= 0.0
            || run.time_step > run.model_run_time
        {
            return Err(SimulationError::InvalidRunConfig {
                model_run_time: run.model_run_time,
                time_step: run.time_step,
            });
        }
        // Validates outlet existence, range, and status up front.
        OutletSampler::new(grid, outlet)?;

        Ok(Self {
            grid,
            outlet,
            run,
            flow: OverlandFlowConfig::default(),
            schedule: RainfallSchedule::none(),
            thresholds: StabilityThresholds::default(),
        })
    }

    /// Set the integrator configuration.
    pub fn with_flow_config(mut self, flow: OverlandFlowConfig) -> Self {
        self.flow = flow;
        self
    }

    /// Set the rainfall schedule.
    pub fn with_rainfall(mut self, schedule: RainfallSchedule) -> Self {
        self.schedule = schedule;
        self
    }

    /// Set the stability escalation thresholds.
    pub fn with_thresholds(mut self, thresholds: StabilityThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// The integrator configuration in use.
    pub fn flow_config(&self) -> &OverlandFlowConfig {
        &self.flow
    }

    /// Run to completion with no checkpoint sink.
    pub fn run_to_completion(&self, state: &mut FlowState) -> Result<RunOutput, SimulationError> {
        self.run(state, |_| ControlFlow::Continue(()))
    }

    /// Run the simulation, invoking `on_checkpoint` at every target.
    ///
    /// Returning `ControlFlow::Break(())` from the sink cancels the
    /// run cleanly: the output still carries the hydrograph and the
    /// number of checkpoints completed.
    ///
    /// # Errors
    /// Fatal instability (non-finite values, exhausted floor or clamp
    /// budgets) aborts the run with the simulated time and the
    /// node/link at fault.
    pub fn run<F>(
        &self,
        state: &mut FlowState,
        mut on_checkpoint: F,
    ) -> Result<RunOutput, SimulationError>
    where
        F: FnMut(&Checkpoint<'_>) -> ControlFlow<()>,
    {
        let wall_start = Instant::now();

        let mut sampler = OutletSampler::new(self.grid, self.outlet)?;
        let mut monitor = StabilityMonitor::new(self.thresholds);

        let n_checkpoints =
            ((self.run.model_run_time / self.run.time_step) + 1e-9).floor() as usize;

        let mut n_steps = 0usize;
        let mut dt_min = f64::INFINITY;
        let mut dt_max: f64 = 0.0;
        let mut checkpoints_completed = 0usize;
        let mut cancelled = false;

        let mut phase = RunPhase::Running;
        let mut index = 1usize;

        loop {
            match phase {
                RunPhase::Running => {
                    if index > n_checkpoints {
                        phase = RunPhase::Finished;
                        continue;
                    }
                    let target = index as f64 * self.run.time_step;
                    while state.elapsed < target {
                        let ts = compute_timestep(self.grid, state, &self.flow);
                        monitor.record_timestep(&ts, state.elapsed)?;
                        state.dt = ts.dt;
                        dt_min = dt_min.min(ts.dt);
                        dt_max = dt_max.max(ts.dt);

                        let rain = self.schedule.intensity_at(state.elapsed);
                        let diag = advance(self.grid, state, rain, &self.flow)?;
                        monitor.record_step(&diag, state.elapsed)?;

                        sampler.sample(self.grid, state);
                        n_steps += 1;
                    }
                    phase = RunPhase::CheckpointReached;
                }
                RunPhase::CheckpointReached => {
                    let target = index as f64 * self.run.time_step;
                    let outlet_q = sampler.series().last().map_or(0.0, |p| p.discharge);
                    info!(
                        checkpoint = index,
                        t = target,
                        elapsed = state.elapsed,
                        steps = n_steps,
                        outlet_discharge = outlet_q,
                        "checkpoint reached"
                    );

                    let checkpoint = Checkpoint {
                        time: target,
                        elapsed: state.elapsed,
                        index,
                        n_steps,
                        state,
                        discharge: sampler.series(),
                    };
                    checkpoints_completed = index;

                    if on_checkpoint(&checkpoint).is_break() {
                        warn!(
                            checkpoint = index,
                            t = target,
                            "run cancelled by checkpoint sink"
                        );
                        cancelled = true;
                        phase = RunPhase::Finished;
                    } else {
                        index += 1;
                        phase = RunPhase::Running;
                    }
                }
                RunPhase::Finished => break,
            }
        }

        let report = RunReport {
            final_time: state.elapsed,
            n_steps,
            dt_min: if n_steps == 0 { 0.0 } else { dt_min },
            dt_max,
            wall_time: wall_start.elapsed().as_secs_f64(),
            checkpoints_completed,
            cancelled,
        };
        Ok(RunOutput {
            report,
            discharge: sampler.into_series(),
        })
    }
}
