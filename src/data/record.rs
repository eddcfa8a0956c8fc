//! Sensor record types produced by the parser and consumed by the log and the plot.

use std::fmt;
use std::str::FromStr;

/// Breathing phase reported by the sensor firmware in the optional fifth field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RespiratoryState {
    Inhale,
    Exhale,
    Peak,
    Trough,
}

impl FromStr for RespiratoryState {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "INHALE" => Ok(RespiratoryState::Inhale),
            "EXHALE" => Ok(RespiratoryState::Exhale),
            "PEAK" => Ok(RespiratoryState::Peak),
            "TROUGH" => Ok(RespiratoryState::Trough),
            _ => Err(()),
        }
    }
}

impl fmt::Display for RespiratoryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RespiratoryState::Inhale => "Inhale",
            RespiratoryState::Exhale => "Exhale",
            RespiratoryState::Peak => "Peak",
            RespiratoryState::Trough => "Trough",
        };
        f.write_str(s)
    }
}

/// One validated telemetry sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorRecord {
    /// Seconds since the first accepted record of this process.
    pub relative_time_s: f64,
    pub pressure_kpa: f64,
    pub temperature_c: f64,
    /// Valve opening as a ratio of the maximum (0.0 ..= 1.0), if sent.
    pub valve_opening: Option<f64>,
    pub state: Option<RespiratoryState>,
}
