//! Axis state and auto-scaling for the two monitor plots.

use crate::data::history::{HistorySample, RollingHistory};

/// Name, unit and current bounds of one plot axis.
#[derive(Debug, Clone, PartialEq)]
pub struct AxisSettings {
    pub name: String,
    pub unit: String,
    pub bounds: (f64, f64),
}

impl AxisSettings {
    pub fn new(name: &str, unit: &str) -> Self {
        Self {
            name: name.to_string(),
            unit: unit.to_string(),
            bounds: (0.0, 1.0),
        }
    }

    pub fn label(&self) -> String {
        format!("{} [{}]", self.name, self.unit)
    }
}

/// How the view follows incoming data.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewSettings {
    /// Width of the trailing time window, in seconds.
    pub x_window_secs: f64,
    /// Space kept to the right of the newest sample, in seconds.
    pub x_margin_secs: f64,
    /// Relative Y padding applied to each end of the visible range.
    pub y_margin_ratio: f64,
    /// The sliding X window only kicks in once the history holds more points than this.
    pub min_points_for_window: usize,
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            x_window_secs: 30.0,
            x_margin_secs: 1.0,
            y_margin_ratio: 0.01,
            min_points_for_window: 5,
        }
    }
}

/// Axes of the stacked pressure and temperature plots. Both share the time axis.
#[derive(Debug, Clone, PartialEq)]
pub struct ScopeView {
    pub x_axis: AxisSettings,
    pub pressure_axis: AxisSettings,
    pub temperature_axis: AxisSettings,
}

impl Default for ScopeView {
    fn default() -> Self {
        Self {
            x_axis: AxisSettings::new("Time", "s"),
            pressure_axis: AxisSettings::new("Pressure", "kPa"),
            temperature_axis: AxisSettings::new("Temperature", "°C"),
        }
    }
}

impl ScopeView {
    /// Recompute all bounds from the history. Leaves bounds untouched when the history is empty.
    pub fn fit(&mut self, history: &RollingHistory, settings: &ViewSettings) {
        let Some(x_bounds) = x_window(history, settings) else {
            return;
        };
        self.x_axis.bounds = x_bounds;
        if let Some(b) = y_window(history.iter(), x_bounds, settings.y_margin_ratio, |s| s.pressure) {
            self.pressure_axis.bounds = b;
        }
        if let Some(b) = y_window(
            history.iter(),
            x_bounds,
            settings.y_margin_ratio,
            |s| s.temperature,
        ) {
            self.temperature_axis.bounds = b;
        }
    }
}

/// Sliding time window ending just after the newest sample.
///
/// With more than `min_points_for_window` samples the window is the last
/// `x_window_secs` seconds (never before zero) plus the right margin. Before
/// that it simply spans all data.
pub fn x_window(history: &RollingHistory, settings: &ViewSettings) -> Option<(f64, f64)> {
    let first = history.first()?.t;
    let last = history.last()?.t;
    let upper = last + settings.x_margin_secs;
    if history.len() > settings.min_points_for_window {
        Some(((last - settings.x_window_secs).max(0.0), upper))
    } else {
        Some((first.min(last), upper))
    }
}

/// Tight Y range over the samples inside `x_bounds`, padded by `margin_ratio`.
///
/// Each end moves outward by `margin_ratio` of its own magnitude, which keeps
/// the padding outward for negative values too. A flat signal gets a fixed
/// half-unit of padding so the axis never collapses.
pub fn y_window<'a, I, F>(
    samples: I,
    x_bounds: (f64, f64),
    margin_ratio: f64,
    value: F,
) -> Option<(f64, f64)>
where
    I: Iterator<Item = &'a HistorySample>,
    F: Fn(&HistorySample) -> f64,
{
    let mut min_y = f64::INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    for s in samples {
        if s.t < x_bounds.0 || s.t > x_bounds.1 {
            continue;
        }
        let y = value(s);
        if !y.is_finite() {
            continue;
        }
        min_y = min_y.min(y);
        max_y = max_y.max(y);
    }
    if min_y > max_y {
        return None;
    }
    let lo = min_y - min_y.abs() * margin_ratio;
    let hi = max_y + max_y.abs() * margin_ratio;
    if hi - lo <= f64::EPSILON {
        return Some((lo - 0.5, hi + 0.5));
    }
    Some((lo, hi))
}
