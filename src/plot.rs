//! Plot rendering for the monitor window.
//!
//! Each channel gets its own plot sharing the time axis. Bounds are always
//! taken from the [`ScopeView`](crate::data::scope::ScopeView) computed on the
//! last tick; interactive zoom and pan are disabled so the view keeps
//! following the data.

use egui::Color32;
use egui_plot::{Legend, Line, Plot};

use crate::data::scope::AxisSettings;

pub const PRESSURE_COLOR: Color32 = Color32::from_rgb(66, 133, 244);
pub const TEMPERATURE_COLOR: Color32 = Color32::from_rgb(219, 68, 55);

/// One curve and the axes to draw it against.
pub struct ChannelPlot<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub points: &'a [[f64; 2]],
    pub x_axis: &'a AxisSettings,
    pub y_axis: &'a AxisSettings,
    pub color: Color32,
}

impl ChannelPlot<'_> {
    pub fn show(&self, ui: &mut egui::Ui, height: f32) {
        let unit = self.y_axis.unit.clone();
        let plot = Plot::new(self.id)
            .height(height)
            .allow_scroll(false)
            .allow_zoom(false)
            .allow_drag(false)
            .allow_boxed_zoom(false)
            .legend(Legend::default())
            .x_axis_label(self.x_axis.label())
            .y_axis_label(self.y_axis.label())
            .y_axis_formatter(move |y, _range| format!("{:.2} {}", y.value, unit));

        let (x_min, x_max) = self.x_axis.bounds;
        let (y_min, y_max) = self.y_axis.bounds;
        plot.show(ui, |plot_ui| {
            plot_ui.set_plot_bounds_x(x_min..=x_max);
            plot_ui.set_plot_bounds_y(y_min..=y_max);
            let line = Line::new(self.name, self.points.to_vec())
                .color(self.color)
                .width(1.5);
            plot_ui.line(line);
        });
    }
}
