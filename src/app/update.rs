//! Per-tick data ingestion for the monitor window.
//!
//! [`MonitorView`] is the render loop without any drawing: it drains a bounded
//! batch from the queue, grows the rolling history and recomputes the curves
//! and axis bounds. It only touches egui-free types so it can run in tests.

use std::sync::Arc;

use crate::config::RenderConfig;
use crate::data::history::RollingHistory;
use crate::data::queue::SampleQueue;
use crate::data::record::SensorRecord;
use crate::data::scope::{ScopeView, ViewSettings};

pub struct MonitorView {
    queue: Arc<SampleQueue>,
    history: RollingHistory,
    scope: ScopeView,
    settings: ViewSettings,
    batch_limit: usize,
    // Cached curves, rebuilt only when a tick drained something.
    pressure_curve: Vec<[f64; 2]>,
    temperature_curve: Vec<[f64; 2]>,
    latest: Option<SensorRecord>,
    redraws: u64,
}

impl MonitorView {
    pub fn new(queue: Arc<SampleQueue>, render: &RenderConfig) -> Self {
        Self {
            queue,
            history: RollingHistory::new(render.max_points),
            scope: ScopeView::default(),
            settings: render.view_settings(),
            batch_limit: render.batch_limit.max(1),
            pressure_curve: Vec::new(),
            temperature_curve: Vec::new(),
            latest: None,
            redraws: 0,
        }
    }

    /// Drain up to `batch_limit` records and refresh the view if any arrived.
    ///
    /// Returns the number of records drained; zero means nothing changed.
    pub fn tick(&mut self) -> usize {
        let batch = self.queue.drain_batch(self.batch_limit);
        if batch.is_empty() {
            return 0;
        }
        for record in &batch {
            self.history.push_record(record);
        }
        self.latest = batch.last().copied();

        self.pressure_curve = self.history.pressure_points();
        self.temperature_curve = self.history.temperature_points();
        self.scope.fit(&self.history, &self.settings);
        self.redraws += 1;
        batch.len()
    }

    pub fn history(&self) -> &RollingHistory {
        &self.history
    }

    pub fn scope(&self) -> &ScopeView {
        &self.scope
    }

    pub fn pressure_curve(&self) -> &[[f64; 2]] {
        &self.pressure_curve
    }

    pub fn temperature_curve(&self) -> &[[f64; 2]] {
        &self.temperature_curve
    }

    /// Most recent record taken from the queue.
    pub fn latest(&self) -> Option<&SensorRecord> {
        self.latest.as_ref()
    }

    /// Number of ticks that refreshed the curves.
    pub fn redraws(&self) -> u64 {
        self.redraws
    }
}
