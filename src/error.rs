//! Simulation error types.
//!
//! Per-sub-step numerical trouble (a floored timestep, a clamped
//! depth) is recovered locally and counted; these errors surface only
//! when the accounting crosses a configured threshold, or when the
//! state is structurally unusable (non-finite values, no outlet).
//! Every runtime variant names the elapsed simulated time and the
//! node or link at fault.

use thiserror::Error;

use crate::types::{LinkIndex, NodeIndex};

/// Fatal simulation errors.
#[derive(Debug, Error)]
pub enum SimulationError {
    /// The adaptive timestep fell back to its floor for too many
    /// consecutive sub-steps; the explicit scheme has lost stability.
    #[error(
        "timestep floored for {consecutive} consecutive sub-steps at t={time:.3}s; \
         simulation is unstable"
    )]
    UnstableTimestep { time: f64, consecutive: usize },

    /// Negative-depth clamping occurred more often than the configured
    /// budget allows; the explicit scheme has diverged.
    #[error(
        "negative depth clamped {clamped} times (last at node {node}) by t={time:.3}s; \
         simulation has diverged"
    )]
    DepthDiverged {
        time: f64,
        node: NodeIndex,
        clamped: u64,
    },

    /// A water depth became NaN or infinite.
    #[error("non-finite water depth at node {node}, t={time:.3}s")]
    NonFiniteDepth { time: f64, node: NodeIndex },

    /// A link discharge became NaN or infinite.
    #[error("non-finite discharge on link {link}, t={time:.3}s")]
    NonFiniteDischarge { time: f64, link: LinkIndex },

    /// The grid has no fixed-value outlet node at all.
    #[error("grid has no fixed-value outlet node")]
    NoOutlet,

    /// The requested outlet index does not name a grid node.
    #[error("outlet node {node} out of range for grid with {n_nodes} nodes")]
    OutletOutOfRange { node: NodeIndex, n_nodes: usize },

    /// The requested outlet exists but is not a fixed-value boundary.
    #[error("outlet node {node} is not a fixed-value boundary")]
    OutletNotFixedValue { node: NodeIndex },

    /// Run durations must be positive and the checkpoint cadence must
    /// fit inside the run.
    #[error(
        "invalid run configuration: model_run_time={model_run_time}s, \
         time_step={time_step}s"
    )]
    InvalidRunConfig { model_run_time: f64, time_step: f64 },
}

impl SimulationError {
    /// Check whether this error was raised at initialization (boundary
    /// or run configuration) rather than during time stepping.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            SimulationError::NoOutlet
                | SimulationError::OutletOutOfRange { .. }
                | SimulationError::OutletNotFixedValue { .. }
                | SimulationError::InvalidRunConfig { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_classification() {
        assert!(SimulationError::NoOutlet.is_configuration());
        assert!(SimulationError::InvalidRunConfig {
            model_run_time: 0.0,
            time_step: 30.0
        }
        .is_configuration());
        assert!(!SimulationError::UnstableTimestep {
            time: 1.0,
            consecutive: 5
        }
        .is_configuration());
        assert!(!SimulationError::NonFiniteDepth {
            time: 1.0,
            node: NodeIndex::new(3)
        }
        .is_configuration());
    }

    #[test]
    fn test_error_messages_name_location() {
        let err = SimulationError::NonFiniteDischarge {
            time: 42.5,
            link: LinkIndex::new(17),
        };
        let msg = err.to_string();
        assert!(msg.contains("L17"));
        assert!(msg.contains("42.5"));
    }
}
