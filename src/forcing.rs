//! Rainfall forcing schedules.
//!
//! A schedule is a step function of elapsed simulated time: a list of
//! non-overlapping intervals, each with a uniform intensity, and zero
//! intensity everywhere else. `intensity_at` is a pure function, so
//! forcing is exactly reproducible in tests.

use thiserror::Error;

/// Error type for rainfall schedule construction.
#[derive(Debug, Error)]
pub enum ForcingError {
    /// Intensities must be non-negative and finite.
    #[error("invalid rainfall intensity {0} m/s")]
    InvalidIntensity(f64),

    /// An interval must satisfy 0 <= start < end < inf.
    #[error("invalid rainfall interval [{start}, {end})")]
    InvalidInterval { start: f64, end: f64 },

    /// Intervals must be sorted and non-overlapping.
    #[error("rainfall interval {index} overlaps its predecessor")]
    OverlappingIntervals { index: usize },
}

/// A single rainfall pulse: uniform intensity over `[start, end)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RainInterval {
    /// Start of the pulse (s), inclusive.
    pub start: f64,
    /// End of the pulse (s), exclusive.
    pub end: f64,
    /// Rainfall intensity (m/s).
    pub intensity: f64,
}

/// Step-function rainfall schedule over a finite horizon.
///
/// # Example
///
/// ```
/// use runoff_rs::forcing::RainfallSchedule;
///
/// // 600 s storm at 59.2/(100*3600) m/s
/// let schedule = RainfallSchedule::storm(600.0, 59.2 / (100.0 * 3600.0)).unwrap();
/// assert!(schedule.intensity_at(10.0) > 0.0);
/// assert_eq!(schedule.intensity_at(600.0), 0.0);
/// ```
#[derive(Clone, Debug, Default)]
pub struct RainfallSchedule {
    intervals: Vec<RainInterval>,
}

impl RainfallSchedule {
    /// A schedule with no rainfall at all.
    pub fn none() -> Self {
        Self {
            intervals: Vec::new(),
        }
    }

    /// Single storm starting at t = 0.
    ///
    /// # Arguments
    /// * `duration` - storm duration (s)
    /// * `intensity` - rainfall intensity (m/s)
    pub fn storm(duration: f64, intensity: f64) -> Result<Self, ForcingError> {
        Self::from_intervals(vec![RainInterval {
            start: 0.0,
            end: duration,
            intensity,
        }])
    }

    /// Build a schedule from explicit intervals.
    ///
    /// Intervals must be sorted by start time and non-overlapping
    /// (an interval may begin exactly where the previous one ends).
    pub fn from_intervals(intervals: Vec<RainInterval>) -> Result<Self, ForcingError> {
        for (i, iv) in intervals.iter().enumerate() {
            if !iv.intensity.is_finite() || iv.intensity < 0.0 {
                return Err(ForcingError::InvalidIntensity(iv.intensity));
            }
            if !iv.start.is_finite() || !iv.end.is_finite() || iv.start < 0.0 || iv.end <= iv.start
            {
                return Err(ForcingError::InvalidInterval {
                    start: iv.start,
                    end: iv.end,
                });
            }
            if i > 0 && iv.start < intervals[i - 1].end {
                return Err(ForcingError::OverlappingIntervals { index: i });
            }
        }
        Ok(Self { intervals })
    }

    /// Rainfall intensity at elapsed time `t` (m/s).
    ///
    /// Pure function: intervals are half-open, so the step down at the
    /// end of a pulse happens exactly at `end`.
    pub fn intensity_at(&self, t: f64) -> f64 {
        for iv in &self.intervals {
            if t >= iv.start && t < iv.end {
                return iv.intensity;
            }
            if t < iv.start {
                break;
            }
        }
        0.0
    }

    /// End of the last pulse (s); zero for an empty schedule.
    pub fn horizon(&self) -> f64 {
        self.intervals.last().map_or(0.0, |iv| iv.end)
    }

    /// Total rainfall depth delivered by the whole schedule (m).
    pub fn total_depth(&self) -> f64 {
        self.intervals
            .iter()
            .map(|iv| iv.intensity * (iv.end - iv.start))
            .sum()
    }

    /// The configured intervals.
    pub fn intervals(&self) -> &[RainInterval] {
        &self.intervals
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storm_step_function() {
        let intensity = 59.2 / (100.0 * 3600.0);
        let schedule = RainfallSchedule::storm(600.0, intensity).unwrap();

        // Exact equality inside and outside the pulse
        assert_eq!(schedule.intensity_at(0.0), intensity);
        assert_eq!(schedule.intensity_at(599.999), intensity);
        assert_eq!(schedule.intensity_at(600.0), 0.0);
        assert_eq!(schedule.intensity_at(1200.0), 0.0);
    }

    #[test]
    fn test_empty_schedule() {
        let schedule = RainfallSchedule::none();
        assert_eq!(schedule.intensity_at(0.0), 0.0);
        assert_eq!(schedule.horizon(), 0.0);
        assert_eq!(schedule.total_depth(), 0.0);
    }

    #[test]
    fn test_multiple_pulses() {
        let schedule = RainfallSchedule::from_intervals(vec![
            RainInterval {
                start: 0.0,
                end: 100.0,
                intensity: 1e-5,
            },
            RainInterval {
                start: 200.0,
                end: 300.0,
                intensity: 2e-5,
            },
        ])
        .unwrap();

        assert_eq!(schedule.intervals().len(), 2);
        assert_eq!(schedule.intensity_at(50.0), 1e-5);
        assert_eq!(schedule.intensity_at(150.0), 0.0);
        assert_eq!(schedule.intensity_at(250.0), 2e-5);
        assert_eq!(schedule.horizon(), 300.0);
        assert!((schedule.total_depth() - (1e-3 + 2e-3)).abs() < 1e-15);
    }

    #[test]
    fn test_adjacent_pulses_allowed() {
        let schedule = RainfallSchedule::from_intervals(vec![
            RainInterval {
                start: 0.0,
                end: 100.0,
                intensity: 1e-5,
            },
            RainInterval {
                start: 100.0,
                end: 200.0,
                intensity: 3e-5,
            },
        ])
        .unwrap();
        assert_eq!(schedule.intensity_at(100.0), 3e-5);
    }

    #[test]
    fn test_rejects_overlap() {
        let result = RainfallSchedule::from_intervals(vec![
            RainInterval {
                start: 0.0,
                end: 100.0,
                intensity: 1e-5,
            },
            RainInterval {
                start: 50.0,
                end: 200.0,
                intensity: 1e-5,
            },
        ]);
        assert!(matches!(
            result,
            Err(ForcingError::OverlappingIntervals { index: 1 })
        ));
    }

    #[test]
    fn test_rejects_negative_intensity() {
        assert!(matches!(
            RainfallSchedule::storm(100.0, -1.0),
            Err(ForcingError::InvalidIntensity(_))
        ));
    }

    #[test]
    fn test_rejects_degenerate_interval() {
        assert!(matches!(
            RainfallSchedule::storm(0.0, 1e-5),
            Err(ForcingError::InvalidInterval { .. })
        ));
    }
}
