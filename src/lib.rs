//! breathplot crate root: re-exports and module wiring.
//!
//! A live monitor for a respiratory sensor that streams comma-separated
//! records over TCP. The pipeline is:
//!
//! ```text
//! socket -> ingest (parse) -> { CSV log, bounded queue } -> render tick -> plots
//! ```
//!
//! Modules:
//! - `data`: records, line parser, bounded queue, rolling history, axis fitting
//! - `persistence`: append-only CSV log
//! - `ingest`: TCP accept/receive loop on a background thread
//! - `controllers`: stop flag and ingest status shared with the UI
//! - `config`: startup configuration (YAML file + CLI overrides)
//! - `app` / `plot`: eframe window and egui_plot rendering

pub mod app;
pub mod config;
pub mod controllers;
pub mod data;
pub mod error;
pub mod ingest;
pub mod persistence;
pub mod plot;

// Public re-exports for a compact external API
pub use app::{run_monitor, MonitorApp, MonitorView};
pub use config::MonitorConfig;
pub use controllers::{IngestController, IngestStatus};
pub use data::parser::{ParsedRecord, RecordParser, SessionClock};
pub use data::queue::{BoundedQueue, SampleQueue};
pub use data::record::{RespiratoryState, SensorRecord};
pub use ingest::{spawn_ingest, ConnectionState, IngestHandle, IngestLoop};
pub use persistence::CsvLog;
