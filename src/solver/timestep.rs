//! Adaptive timestep computation.
//!
//! Explicit-scheme stability bound for the de Almeida update:
//!
//! ```text
//! dt = alpha * dx / sqrt(g * h_max)
//! ```
//!
//! The timestep shrinks as the flow deepens and grows toward `dt_max`
//! as the domain drains. A non-finite or non-positive result is
//! replaced by the configured floor and flagged so the caller's
//! stability accounting can escalate repeated substitutions.

use tracing::warn;

use crate::grid::RasterGrid;

use super::state::FlowState;
use super::OverlandFlowConfig;

/// Result of a timestep computation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Timestep {
    /// The stable timestep to use (s). Always finite and positive.
    pub dt: f64,
    /// Whether the stability bound produced an unusable value and the
    /// floor was substituted.
    pub floored: bool,
}

/// Compute the largest stable timestep for the current state.
///
/// Pure function of the grid, state, and configuration: calling it
/// twice without advancing the state returns the same value.
pub fn compute_timestep(
    grid: &RasterGrid,
    state: &FlowState,
    config: &OverlandFlowConfig,
) -> Timestep {
    let (h_max, _) = state.max_depth(grid);

    // sqrt(g * 0) = 0 makes the raw bound infinite on a dry domain;
    // the dt_max clamp turns that into the configured ceiling. min()
    // would silently discard a NaN bound, so that case is checked
    // explicitly.
    let celerity = (config.g * h_max).sqrt();
    let raw = config.alpha * grid.spacing() / celerity;
    let dt = raw.min(config.dt_max);

    if raw.is_nan() || !dt.is_finite() || dt <= 0.0 {
        warn!(
            dt = dt,
            h_max = h_max,
            floor = config.dt_floor,
            "stability bound produced unusable timestep, substituting floor"
        );
        return Timestep {
            dt: config.dt_floor,
            floored: true,
        };
    }

    Timestep { dt, floored: false }
}
