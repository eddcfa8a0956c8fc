//! Configuration for the monitor: listener, log file, queue and plot behaviour.
//!
//! Everything is fixed at startup. Values come from [`MonitorConfig::default`],
//! optionally overlaid by a YAML file ([`MonitorConfig::load_from_path`]) and
//! finally by command-line flags in `main`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::data::history::DEFAULT_MAX_POINTS;
use crate::data::queue::DEFAULT_QUEUE_CAPACITY;
use crate::data::scope::ViewSettings;
use crate::error::ConfigError;

// ─────────────────────────────────────────────────────────────────────────────
// Listener
// ─────────────────────────────────────────────────────────────────────────────

/// TCP listener settings for the ingest loop.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListenConfig {
    /// Interface to bind. Default: `0.0.0.0` (all interfaces).
    pub host: String,
    /// Port to bind. Default: `8080`. `0` lets the OS pick one.
    pub port: u16,
    /// Maximum bytes read per receive call. Default: `4096`.
    pub recv_buffer_size: usize,
    /// Accept/receive poll timeout in milliseconds; bounds stop latency. Default: `100`.
    pub poll_timeout_ms: u64,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            recv_buffer_size: 4096,
            poll_timeout_ms: 100,
        }
    }
}

impl ListenConfig {
    /// `host:port` string passed to the socket bind.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Log file
// ─────────────────────────────────────────────────────────────────────────────

/// CSV log settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Append-only CSV file. Default: `respiratory_data.csv`.
    pub path: PathBuf,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("respiratory_data.csv"),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Rendering
// ─────────────────────────────────────────────────────────────────────────────

/// Plot refresh and auto-scaling settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Maximum number of points kept in the rolling history. Default: `1000`.
    pub max_points: usize,
    /// Render tick period in milliseconds. Default: `50`.
    pub period_ms: u64,
    /// Maximum records drained from the queue per tick. Default: `10`.
    pub batch_limit: usize,
    /// Width of the trailing time window in seconds. Default: `30.0`.
    pub x_window_secs: f64,
    /// Space right of the newest sample in seconds. Default: `1.0`.
    pub x_margin_secs: f64,
    /// Relative Y padding on each end. Default: `0.01`.
    pub y_margin_ratio: f64,
    /// History length above which the sliding window applies. Default: `5`.
    pub min_points_for_window: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        let view = ViewSettings::default();
        Self {
            max_points: DEFAULT_MAX_POINTS,
            period_ms: 50,
            batch_limit: 10,
            x_window_secs: view.x_window_secs,
            x_margin_secs: view.x_margin_secs,
            y_margin_ratio: view.y_margin_ratio,
            min_points_for_window: view.min_points_for_window,
        }
    }
}

impl RenderConfig {
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }

    pub fn view_settings(&self) -> ViewSettings {
        ViewSettings {
            x_window_secs: self.x_window_secs,
            x_margin_secs: self.x_margin_secs,
            y_margin_ratio: self.y_margin_ratio,
            min_points_for_window: self.min_points_for_window,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// MonitorConfig
// ─────────────────────────────────────────────────────────────────────────────

/// Top-level configuration.
///
/// | Field                 | Purpose |
/// |-----------------------|---------|
/// | `listen`              | TCP bind address and socket timeouts |
/// | `log`                 | CSV log location |
/// | `render`              | History cap, tick period, axis auto-scaling |
/// | `queue_capacity`      | Slots between ingest and render |
/// | `shutdown_timeout_ms` | How long to wait for the ingest thread on exit |
/// | `title`               | Native window title |
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub listen: ListenConfig,
    pub log: LogConfig,
    pub render: RenderConfig,
    pub queue_capacity: usize,
    pub shutdown_timeout_ms: u64,
    pub title: String,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            listen: ListenConfig::default(),
            log: LogConfig::default(),
            render: RenderConfig::default(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            shutdown_timeout_ms: 2000,
            title: "Respiratory Sensor Monitor".to_string(),
        }
    }
}

impl MonitorConfig {
    /// Read a YAML config file. Missing keys keep their defaults.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let s = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&s).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_yaml_str(s: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(s)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let checks: [(bool, &str); 6] = [
            (self.queue_capacity == 0, "queue_capacity must be at least 1"),
            (self.render.max_points == 0, "render.max_points must be at least 1"),
            (self.render.batch_limit == 0, "render.batch_limit must be at least 1"),
            (self.render.period_ms == 0, "render.period_ms must be at least 1"),
            (
                self.listen.recv_buffer_size == 0,
                "listen.recv_buffer_size must be at least 1",
            ),
            (
                self.listen.poll_timeout_ms == 0,
                "listen.poll_timeout_ms must be at least 1",
            ),
        ];
        if let Some((_, msg)) = checks.iter().find(|(bad, _)| *bad) {
            return Err(ConfigError::Invalid(msg.to_string()));
        }
        if !(self.render.x_window_secs > 0.0) {
            return Err(ConfigError::Invalid(
                "render.x_window_secs must be positive".to_string(),
            ));
        }
        if !(self.render.y_margin_ratio >= 0.0) {
            return Err(ConfigError::Invalid(
                "render.y_margin_ratio must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}
