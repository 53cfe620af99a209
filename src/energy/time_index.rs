use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use serde::Serialize;

/// Equally spaced timestamps discretizing every flow of a model.
///
/// The index is the single source of truth for the horizon length: profiles,
/// flow variables, and exported sequences are all aligned 1:1 with it.
///
/// # Examples
///
/// ```
/// use district_planner::energy::time_index::TimeIndex;
///
/// let index = TimeIndex::hourly_from_2019(3);
/// let hours: Vec<String> = index.timestamps().map(|t| t.format("%H:%M").to_string()).collect();
/// assert_eq!(hours, vec!["00:00", "01:00", "02:00"]);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeIndex {
    /// First timestamp of the horizon.
    start: NaiveDateTime,
    /// Spacing between consecutive timestamps, in minutes.
    step_minutes: u32,
    /// Number of timesteps.
    len: usize,
}

impl TimeIndex {
    /// Creates an index of `len` timestamps starting at `start`.
    ///
    /// # Panics
    ///
    /// Panics if `step_minutes` is zero.
    pub fn new(start: NaiveDateTime, step_minutes: u32, len: usize) -> Self {
        assert!(step_minutes > 0, "step_minutes must be > 0");
        Self {
            start,
            step_minutes,
            len,
        }
    }

    /// Hourly index starting at 2019-01-01 00:00, the reference weather year.
    pub fn hourly_from_2019(len: usize) -> Self {
        let start = NaiveDate::from_ymd_opt(2019, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap_or_default();
        Self::new(start, 60, len)
    }

    /// Number of timesteps in the horizon.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    /// Duration of one timestep in hours.
    pub fn step_hours(&self) -> f64 {
        f64::from(self.step_minutes) / 60.0
    }

    /// Timestamp of step `t`, or `None` past the horizon.
    pub fn timestamp(&self, t: usize) -> Option<NaiveDateTime> {
        if t >= self.len {
            return None;
        }
        let offset = TimeDelta::minutes(i64::from(self.step_minutes) * t as i64);
        Some(self.start + offset)
    }

    /// Iterates over all timestamps in order.
    pub fn timestamps(&self) -> impl Iterator<Item = NaiveDateTime> + '_ {
        (0..self.len).filter_map(|t| self.timestamp(t))
    }

    /// Iterates over the step indices `0..len`.
    pub fn steps(&self) -> std::ops::Range<usize> {
        0..self.len
    }
}
