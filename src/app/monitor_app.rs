//! Standalone eframe application for the monitor.
//!
//! [`MonitorApp`] drives [`MonitorView::tick`] at the configured render period,
//! draws the pressure and temperature plots stacked in the central panel and
//! shows the ingest status in a bottom bar.

use std::time::{Duration, Instant};

use eframe::egui;
use egui_phosphor::regular::{GAUGE, PLUGS, PLUGS_CONNECTED, THERMOMETER, WARNING};

use crate::controllers::{IngestController, IngestStatus};
use crate::ingest::ConnectionState;
use crate::plot::{ChannelPlot, PRESSURE_COLOR, TEMPERATURE_COLOR};

use super::MonitorView;

pub struct MonitorApp {
    pub view: MonitorView,
    pub ctrl: IngestController,
    period: Duration,
    last_tick: Option<Instant>,
}

impl MonitorApp {
    pub fn new(view: MonitorView, ctrl: IngestController, period: Duration) -> Self {
        Self {
            view,
            ctrl,
            period,
            last_tick: None,
        }
    }

    /// Run a render tick if a full period has passed since the previous one.
    fn maybe_tick(&mut self) {
        let due = self
            .last_tick
            .map_or(true, |t| t.elapsed() >= self.period);
        if due {
            self.view.tick();
            self.last_tick = Some(Instant::now());
        }
    }

    fn render_status_bar(&self, ui: &mut egui::Ui, status: &IngestStatus) {
        ui.horizontal(|ui| {
            if let Some(msg) = &status.fatal {
                ui.colored_label(
                    egui::Color32::LIGHT_RED,
                    format!("{WARNING} Not receiving: {msg}"),
                );
            } else {
                match (status.state, status.peer) {
                    (ConnectionState::Connected, Some(peer)) => {
                        ui.label(format!("{PLUGS_CONNECTED} Connected to {peer}"));
                    }
                    _ => {
                        let addr = status
                            .local_addr
                            .map(|a| a.to_string())
                            .unwrap_or_else(|| "...".to_string());
                        ui.label(format!("{PLUGS} Listening on {addr}"));
                    }
                }
            }
            ui.separator();
            ui.label(format!("Records: {}", status.records));
            ui.label(format!("Parse errors: {}", status.parse_errors));
            ui.label(format!("Dropped: {}", status.evicted));
            if status.log_errors > 0 {
                ui.colored_label(
                    egui::Color32::LIGHT_RED,
                    format!("Log errors: {}", status.log_errors),
                );
            }

            if let Some(r) = self.view.latest() {
                ui.separator();
                ui.label(format!("{GAUGE} {:.2} kPa", r.pressure_kpa));
                ui.label(format!("{THERMOMETER} {:.1} °C", r.temperature_c));
                if let Some(v) = r.valve_opening {
                    ui.label(format!("Valve {:.0}%", v * 100.0));
                }
                if let Some(s) = r.state {
                    ui.label(s.to_string());
                }
            }
        });
    }
}

impl eframe::App for MonitorApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.maybe_tick();

        let status = self.ctrl.status();
        egui::TopBottomPanel::bottom("monitor_status").show(ctx, |ui| {
            self.render_status_bar(ui, &status);
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            let spacing = ui.spacing().item_spacing.y;
            let height = ((ui.available_height() - spacing) / 2.0).max(50.0);
            let scope = self.view.scope();

            ChannelPlot {
                id: "pressure_plot",
                name: "Pressure (kPa)",
                points: self.view.pressure_curve(),
                x_axis: &scope.x_axis,
                y_axis: &scope.pressure_axis,
                color: PRESSURE_COLOR,
            }
            .show(ui, height);

            ChannelPlot {
                id: "temperature_plot",
                name: "Temperature (°C)",
                points: self.view.temperature_curve(),
                x_axis: &scope.x_axis,
                y_axis: &scope.temperature_axis,
                color: TEMPERATURE_COLOR,
            }
            .show(ui, height);
        });

        // Wake up for the next render tick even without user input.
        ctx.request_repaint_after(self.period);
    }
}
