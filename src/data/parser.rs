//! Line parser for the comma-separated sensor protocol.
//!
//! Wire format (one record per line):
//!   `<identifier>,<pressure kPa>,<temperature °C>[,<valve opening>[,<state>]]`
//!
//! The identifier is kept verbatim for the log but otherwise ignored. Pressure
//! and temperature are mandatory; the trailing fields are parsed leniently.

use chrono::{DateTime, Local};

use crate::data::record::{RespiratoryState, SensorRecord};
use crate::error::ParseError;

pub const FIELD_DELIMITER: char = ',';
pub const MIN_FIELDS: usize = 3;

/// Start instant of the session, fixed by the first accepted record.
#[derive(Debug, Default, Clone)]
pub struct SessionClock {
    start: Option<DateTime<Local>>,
}

impl SessionClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&self) -> Option<DateTime<Local>> {
        self.start
    }

    /// Seconds elapsed between the session start and `arrival`.
    ///
    /// The first call starts the session and returns `0.0`. A wall clock that
    /// steps backwards yields `0.0` rather than a negative time.
    pub fn relative_secs(&mut self, arrival: DateTime<Local>) -> f64 {
        let start = *self.start.get_or_insert(arrival);
        let micros = (arrival - start).num_microseconds().unwrap_or(i64::MAX);
        (micros as f64 / 1e6).max(0.0)
    }
}

/// An accepted line: the record plus what the log needs to persist it.
#[derive(Debug, Clone)]
pub struct ParsedRecord {
    pub record: SensorRecord,
    /// All input fields, untrimmed, in wire order.
    pub fields: Vec<String>,
    pub arrival: DateTime<Local>,
}

/// Turns raw lines into [`SensorRecord`]s, stamping them against a shared [`SessionClock`].
#[derive(Debug, Default)]
pub struct RecordParser {
    clock: SessionClock,
}

impl RecordParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clock(&self) -> &SessionClock {
        &self.clock
    }

    /// Parse one line received at `arrival`.
    ///
    /// Only an accepted line touches the session clock, so a stream that
    /// starts with garbage does not shift time zero.
    pub fn parse(
        &mut self,
        line: &str,
        arrival: DateTime<Local>,
    ) -> Result<ParsedRecord, ParseError> {
        let fields: Vec<&str> = line.split(FIELD_DELIMITER).collect();
        if fields.len() < MIN_FIELDS {
            return Err(ParseError::TooFewFields {
                expected: MIN_FIELDS,
                found: fields.len(),
            });
        }

        let pressure_kpa = parse_number(&fields, 1, "pressure")?;
        let temperature_c = parse_number(&fields, 2, "temperature")?;
        let valve_opening = fields.get(3).and_then(|s| s.trim().parse::<f64>().ok());
        let state = fields
            .get(4)
            .and_then(|s| s.parse::<RespiratoryState>().ok());

        let relative_time_s = self.clock.relative_secs(arrival);
        Ok(ParsedRecord {
            record: SensorRecord {
                relative_time_s,
                pressure_kpa,
                temperature_c,
                valve_opening,
                state,
            },
            fields: fields.into_iter().map(str::to_string).collect(),
            arrival,
        })
    }
}

fn parse_number(fields: &[&str], index: usize, name: &'static str) -> Result<f64, ParseError> {
    let raw = fields[index];
    raw.trim()
        .parse::<f64>()
        .map_err(|_| ParseError::InvalidNumber {
            index,
            name,
            value: raw.to_string(),
        })
}
