//! Per-node depth update by mass conservation.
//!
//! Each core node's depth changes by the net discharge through its
//! cell faces plus rainfall. Depths are clamped at zero; the volume
//! removed by clamping is accounted, because the reference scheme
//! accepts this conservation error rather than fixing it.

use tracing::debug;

use crate::error::SimulationError;
use crate::grid::RasterGrid;
use crate::types::NodeIndex;

use super::state::FlowState;
use super::{OverlandFlowConfig, StepDiagnostics};

/// Update every node's depth in place.
///
/// - core nodes: mass balance over incident links, plus rainfall
/// - fixed-value nodes: re-pinned to the prescribed depth
/// - closed nodes: held at zero
pub(crate) fn update_depth(
    grid: &RasterGrid,
    state: &mut FlowState,
    dt: f64,
    rainfall_intensity: f64,
    config: &OverlandFlowConfig,
) -> Result<StepDiagnostics, SimulationError> {
    let area = grid.cell_area();
    let width = grid.face_width();
    let mut diag = StepDiagnostics::default();

    for node in NodeIndex::iter(grid.n_nodes()) {
        let status = grid.status(node);
        if status.is_core() {
            // Net inflow in m³/s: positive link sign means the node is
            // the link tail, where positive discharge arrives.
            let net_inflow: f64 = grid
                .node_links(node)
                .iter()
                .map(|&(l, sign)| sign * state.discharge[l] * width)
                .sum();

            let h = state.depth[node] + dt * (net_inflow / area + rainfall_intensity);
            if !h.is_finite() {
                return Err(SimulationError::NonFiniteDepth {
                    time: state.elapsed,
                    node,
                });
            }
            if h < 0.0 {
                diag.clamped_nodes += 1;
                diag.clamped_volume += -h * area;
                diag.last_clamped = Some(node);
                state.depth[node] = 0.0;
            } else {
                state.depth[node] = h;
            }
        } else if status.is_fixed_value() {
            state.depth[node] = config.h_init.meters();
        } else {
            state.depth[node] = 0.0;
        }
    }

    if diag.clamped_nodes > 0 {
        debug!(
            clamped_nodes = diag.clamped_nodes,
            clamped_volume = diag.clamped_volume,
            t = state.elapsed,
            "clamped negative depths"
        );
    }

    Ok(diag)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Depth, LinkIndex};

    fn setup() -> (RasterGrid, FlowState, OverlandFlowConfig) {
        let mut grid = RasterGrid::flat(3, 4, 2.0).unwrap();
        grid.set_outlet(NodeIndex::new(4)).unwrap();
        let state = FlowState::new(&grid, Depth::new(1e-4));
        let config = OverlandFlowConfig::default();
        (grid, state, config)
    }

    #[test]
    fn test_rainfall_raises_core_depth() {
        let (grid, mut state, config) = setup();
        let rain = 1e-5;
        let diag = update_depth(&grid, &mut state, 10.0, rain, &config).unwrap();

        assert_eq!(diag.clamped_nodes, 0);
        // Core nodes gain exactly rain * dt
        assert!((state.depth[5] - (1e-4 + 1e-4)).abs() < 1e-15);
        assert!((state.depth[6] - (1e-4 + 1e-4)).abs() < 1e-15);
        // Closed nodes stay dry, outlet stays pinned
        assert_eq!(state.depth[0], 0.0);
        assert_eq!(state.depth[4], 1e-4);
    }

    #[test]
    fn test_discharge_moves_volume_between_nodes() {
        let (grid, mut state, config) = setup();
        // Link 4 joins node 5 (head) to node 6 (tail); positive q
        // carries water from 5 to 6.
        state.discharge[LinkIndex::new(4)] = 1e-4;
        let dt = 1.0;
        update_depth(&grid, &mut state, dt, 0.0, &config).unwrap();

        // q * width / area * dt = 1e-4 * 2 / 4 * 1 = 5e-5
        assert!((state.depth[6] - (1e-4 + 5e-5)).abs() < 1e-15);
        assert!((state.depth[5] - (1e-4 - 5e-5)).abs() < 1e-15);
    }

    #[test]
    fn test_negative_depth_clamped_and_counted() {
        let (grid, mut state, config) = setup();
        // Outflow far larger than the stored volume
        state.discharge[LinkIndex::new(4)] = 1.0;
        let diag = update_depth(&grid, &mut state, 1.0, 0.0, &config).unwrap();

        assert_eq!(state.depth[5], 0.0);
        assert_eq!(diag.clamped_nodes, 1);
        assert_eq!(diag.last_clamped, Some(NodeIndex::new(5)));
        assert!(diag.clamped_volume > 0.0);
    }

    #[test]
    fn test_depths_never_negative() {
        let (grid, mut state, config) = setup();
        for (i, q) in state.discharge.iter_mut().enumerate() {
            *q = if i % 2 == 0 { 0.5 } else { -0.7 };
        }
        update_depth(&grid, &mut state, 2.0, 0.0, &config).unwrap();
        assert!(state.depth.iter().all(|&h| h >= 0.0));
    }

    #[test]
    fn test_non_finite_depth_is_fatal() {
        let (grid, mut state, config) = setup();
        state.discharge[LinkIndex::new(4)] = f64::INFINITY;
        let err = update_depth(&grid, &mut state, 1.0, 0.0, &config).unwrap_err();
        assert!(matches!(err, SimulationError::NonFiniteDepth { .. }));
    }
}
