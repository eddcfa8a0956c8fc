//! Rolling in-memory history of the most recent samples.

use std::collections::VecDeque;

use crate::data::record::SensorRecord;

pub const DEFAULT_MAX_POINTS: usize = 1000;

/// One index-aligned (time, pressure, temperature) entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistorySample {
    pub t: f64,
    pub pressure: f64,
    pub temperature: f64,
}

impl From<&SensorRecord> for HistorySample {
    fn from(r: &SensorRecord) -> Self {
        Self {
            t: r.relative_time_s,
            pressure: r.pressure_kpa,
            temperature: r.temperature_c,
        }
    }
}

/// Ring buffer of samples capped at `max_points`.
///
/// Storing one struct per sample keeps the time, pressure and temperature
/// sequences the same length and index-aligned by construction. The deque is
/// allocated once at full capacity; eviction is `pop_front`.
#[derive(Debug, Clone)]
pub struct RollingHistory {
    samples: VecDeque<HistorySample>,
    max_points: usize,
}

impl RollingHistory {
    pub fn new(max_points: usize) -> Self {
        let max_points = max_points.max(1);
        Self {
            samples: VecDeque::with_capacity(max_points),
            max_points,
        }
    }

    pub fn max_points(&self) -> usize {
        self.max_points
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Append a sample, evicting the oldest once the cap is reached.
    pub fn push(&mut self, sample: HistorySample) {
        if self.samples.len() == self.max_points {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    pub fn push_record(&mut self, record: &SensorRecord) {
        self.push(record.into());
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn first(&self) -> Option<&HistorySample> {
        self.samples.front()
    }

    pub fn last(&self) -> Option<&HistorySample> {
        self.samples.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &HistorySample> + '_ {
        self.samples.iter()
    }

    pub fn times(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().map(|s| s.t)
    }

    pub fn pressures(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().map(|s| s.pressure)
    }

    pub fn temperatures(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().map(|s| s.temperature)
    }

    /// Pressure curve as `[t, kPa]` points.
    pub fn pressure_points(&self) -> Vec<[f64; 2]> {
        self.samples.iter().map(|s| [s.t, s.pressure]).collect()
    }

    /// Temperature curve as `[t, °C]` points.
    pub fn temperature_points(&self) -> Vec<[f64; 2]> {
        self.samples.iter().map(|s| [s.t, s.temperature]).collect()
    }
}
