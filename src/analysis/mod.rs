//! Discharge time series, outlet sampling, and hydrograph summaries.
//!
//! The sampler records the discharge arriving at the watershed outlet
//! after every sub-step, producing the hydrograph that downstream
//! visualization consumes at each checkpoint. Summary metrics (peak,
//! time to peak, runoff volume) are computed from the finished series.

mod stability;

pub use stability::{StabilityMonitor, StabilityThresholds};

use crate::error::SimulationError;
use crate::grid::RasterGrid;
use crate::solver::FlowState;
use crate::types::NodeIndex;

/// A single sample of the outlet hydrograph.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SeriesPoint {
    /// Elapsed simulated time (s).
    pub time: f64,
    /// Discharge arriving at the outlet (m³/s).
    pub discharge: f64,
}

/// Append-only discharge time series at a fixed outlet node.
///
/// Entries are appended once per sub-step in simulation order, so the
/// series is monotonically non-decreasing in time and never reordered.
#[derive(Clone, Debug)]
pub struct DischargeSeries {
    outlet: NodeIndex,
    points: Vec<SeriesPoint>,
}

impl DischargeSeries {
    /// Create an empty series for the given outlet node.
    pub fn new(outlet: NodeIndex) -> Self {
        Self {
            outlet,
            points: Vec::new(),
        }
    }

    /// The outlet node this series is keyed to.
    pub fn outlet(&self) -> NodeIndex {
        self.outlet
    }

    /// Append a sample. Time must not move backwards.
    pub fn push(&mut self, time: f64, discharge: f64) {
        debug_assert!(
            self.points.last().map_or(true, |p| time >= p.time),
            "discharge series time went backwards"
        );
        self.points.push(SeriesPoint { time, discharge });
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if the series has no samples yet.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The most recent sample.
    pub fn last(&self) -> Option<SeriesPoint> {
        self.points.last().copied()
    }

    /// All samples in append order.
    pub fn points(&self) -> &[SeriesPoint] {
        &self.points
    }

    /// Sample times as a vector.
    pub fn times(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.time).collect()
    }

    /// Sample values as a vector.
    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.discharge).collect()
    }
}

/// Records outlet discharge after every sub-step.
///
/// The sampled value is the net volume flux arriving at the outlet
/// node through its incident links (m³/s).
#[derive(Clone, Debug)]
pub struct OutletSampler {
    outlet: NodeIndex,
    series: DischargeSeries,
}

impl OutletSampler {
    /// Create a sampler for the grid's outlet.
    ///
    /// # Errors
    /// - `NoOutlet` if the grid has no fixed-value node
    /// - `OutletOutOfRange` / `OutletNotFixedValue` if the requested
    ///   node cannot serve as the outlet
    pub fn new(grid: &RasterGrid, outlet: NodeIndex) -> Result<Self, SimulationError> {
        if grid.fixed_value_nodes().is_empty() {
            return Err(SimulationError::NoOutlet);
        }
        if outlet.get() >= grid.n_nodes() {
            return Err(SimulationError::OutletOutOfRange {
                node: outlet,
                n_nodes: grid.n_nodes(),
            });
        }
        if !grid.status(outlet).is_fixed_value() {
            return Err(SimulationError::OutletNotFixedValue { node: outlet });
        }
        Ok(Self {
            outlet,
            series: DischargeSeries::new(outlet),
        })
    }

    /// Net discharge currently arriving at the outlet (m³/s).
    pub fn outlet_discharge(&self, grid: &RasterGrid, state: &FlowState) -> f64 {
        let width = grid.face_width();
        grid.node_links(self.outlet)
            .iter()
            .map(|&(l, sign)| sign * state.discharge[l] * width)
            .sum()
    }

    /// Record one sample at the state's elapsed time.
    pub fn sample(&mut self, grid: &RasterGrid, state: &FlowState) {
        let q = self.outlet_discharge(grid, state);
        self.series.push(state.elapsed, q);
    }

    /// The series accumulated so far.
    pub fn series(&self) -> &DischargeSeries {
        &self.series
    }

    /// Consume the sampler, returning the finished series.
    pub fn into_series(self) -> DischargeSeries {
        self.series
    }
}

/// Summary of a simulated hydrograph.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HydrographMetrics {
    /// Largest sampled discharge (m³/s).
    pub peak_discharge: f64,
    /// Time of the peak sample (s).
    pub time_to_peak: f64,
    /// Time-integrated discharge over the whole series (m³),
    /// trapezoidal rule.
    pub runoff_volume: f64,
}

impl HydrographMetrics {
    /// Compute summary metrics; `None` for an empty series.
    pub fn from_series(series: &DischargeSeries) -> Option<Self> {
        let points = series.points();
        let first = points.first()?;

        let mut peak_discharge = first.discharge;
        let mut time_to_peak = first.time;
        let mut runoff_volume = 0.0;

        for pair in points.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            runoff_volume += 0.5 * (a.discharge + b.discharge) * (b.time - a.time);
            if b.discharge > peak_discharge {
                peak_discharge = b.discharge;
                time_to_peak = b.time;
            }
        }

        Some(Self {
            peak_discharge,
            time_to_peak,
            runoff_volume,
        })
    }
}
