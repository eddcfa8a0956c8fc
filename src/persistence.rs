//! Append-only CSV log of every accepted record.
//!
//! The first row of an empty file is a fixed header. Each data row is the
//! local arrival time followed by the raw input fields exactly as received,
//! so rows may be shorter or longer than the header.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use crate::error::LogError;

pub const LOG_HEADER: [&str; 5] = [
    "timestamp",
    "pressure(kPa)",
    "temperature(°C)",
    "valve-opening",
    "respiratory-state",
];

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Row writer for the log. `W` is the file in normal use; any [`Write`] sink works.
pub struct CsvLog<W: Write = File> {
    path: PathBuf,
    writer: csv::Writer<W>,
    rows_written: u64,
}

impl CsvLog<File> {
    /// Open `path` for appending, creating it if needed, and write the header if it is empty.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, LogError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| LogError::Open {
                path: path.clone(),
                source,
            })?;
        let is_empty = file.metadata()?.len() == 0;
        if is_empty {
            tracing::info!(path = %path.display(), "created log file with header");
        } else {
            tracing::info!(path = %path.display(), "appending to existing log file");
        }
        Self::from_writer(path, file, is_empty)
    }
}

impl<W: Write> CsvLog<W> {
    /// Log into `inner`, labelled `path` in messages. The header goes out only if `write_header`.
    pub fn from_writer(
        path: impl Into<PathBuf>,
        inner: W,
        write_header: bool,
    ) -> Result<Self, LogError> {
        let mut writer = csv::WriterBuilder::new()
            .flexible(true)
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(inner);
        if write_header {
            writer.write_record(LOG_HEADER)?;
            writer.flush()?;
        }
        Ok(Self {
            path: path.into(),
            writer,
            rows_written: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rows appended through this handle (header excluded).
    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    /// Append one row and flush it to the file.
    pub fn append<S: AsRef<str>>(
        &mut self,
        arrival: DateTime<Local>,
        fields: &[S],
    ) -> Result<(), LogError> {
        let stamp = arrival.format(TIMESTAMP_FORMAT).to_string();
        let row = std::iter::once(stamp.as_str()).chain(fields.iter().map(|f| f.as_ref()));
        self.writer.write_record(row)?;
        self.writer.flush()?;
        self.rows_written += 1;
        Ok(())
    }
}
