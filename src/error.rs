//! Error types for the monitor.
//!
//! Each pipeline stage has its own error enum so callers can tell a recoverable
//! failure (a malformed line, a failed row write) from a fatal one (the
//! listening socket could not be bound):
//!
//! - **`ParseError`**: a received line was rejected by the record parser.
//! - **`LogError`**: the CSV log could not be opened or a row could not be written.
//! - **`IngestError`**: the ingest loop could not start or its thread misbehaved.
//! - **`ConfigError`**: the configuration file could not be read or holds invalid values.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("expected at least {expected} comma-separated fields, got {found}")]
    TooFewFields { expected: usize, found: usize },

    #[error("field {index} ({name}) is not a number: {value:?}")]
    InvalidNumber {
        index: usize,
        name: &'static str,
        value: String,
    },
}

#[derive(Error, Debug)]
pub enum LogError {
    #[error("failed to open log file {path:?}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write log row: {0}")]
    Write(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to configure listener on {addr}: {source}")]
    Listener {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Log(#[from] LogError),

    #[error("failed to spawn ingest thread: {0}")]
    Spawn(std::io::Error),

    #[error("ingest thread did not stop within {0:?}")]
    ShutdownTimeout(Duration),

    #[error("ingest thread panicked")]
    Panicked,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
