//! Command-line entry point: start the ingest thread, open the monitor window,
//! and stop the ingest thread when the window closes.
//!
//! ```bash
//! breathplot --port 8080 --log-file respiratory_data.csv
//! breathplot --config monitor.yaml -v
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use breathplot::config::MonitorConfig;
use breathplot::controllers::IngestController;
use breathplot::data::queue::SampleQueue;
use breathplot::ingest::spawn_ingest;
use breathplot::run_monitor;

#[derive(Parser, Debug)]
#[command(name = "breathplot")]
#[command(about = "Receive respiratory sensor records over TCP, log them to CSV and plot them live", long_about = None)]
struct Cli {
    /// YAML configuration file; flags below override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Interface to listen on
    #[arg(long)]
    host: Option<String>,

    /// TCP port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// CSV log file (appended to)
    #[arg(short, long)]
    log_file: Option<PathBuf>,

    /// Maximum number of points kept on screen
    #[arg(long)]
    max_points: Option<usize>,

    /// Bytes read per receive call
    #[arg(long)]
    recv_buffer_size: Option<usize>,

    /// Accept/receive poll timeout in milliseconds
    #[arg(long)]
    poll_timeout_ms: Option<u64>,

    /// Increase log verbosity (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn into_config(self) -> Result<MonitorConfig> {
        let mut cfg = match &self.config {
            Some(path) => MonitorConfig::load_from_path(path)?,
            None => MonitorConfig::default(),
        };
        if let Some(host) = self.host {
            cfg.listen.host = host;
        }
        if let Some(port) = self.port {
            cfg.listen.port = port;
        }
        if let Some(path) = self.log_file {
            cfg.log.path = path;
        }
        if let Some(n) = self.max_points {
            cfg.render.max_points = n;
        }
        if let Some(n) = self.recv_buffer_size {
            cfg.listen.recv_buffer_size = n;
        }
        if let Some(ms) = self.poll_timeout_ms {
            cfg.listen.poll_timeout_ms = ms;
        }
        cfg.validate()?;
        Ok(cfg)
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let config = cli.into_config()?;

    let queue = Arc::new(SampleQueue::new(config.queue_capacity));
    let ctrl = IngestController::new();
    let ingest = spawn_ingest(&config, Arc::clone(&queue), ctrl.clone())
        .context("failed to start ingest thread")?;

    let ui_result = run_monitor(&config, queue, ctrl);

    info!("window closed, stopping ingest");
    if let Err(e) = ingest.shutdown(config.shutdown_timeout()) {
        warn!(error = %e, "ingest thread ended with an error");
    }
    ui_result.map_err(|e| anyhow::anyhow!("UI error: {e}"))?;
    info!("exited cleanly");
    Ok(())
}
