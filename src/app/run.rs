//! Top-level entry point for running the monitor as a native window.

use std::sync::Arc;

use eframe::egui;

use crate::config::MonitorConfig;
use crate::controllers::IngestController;
use crate::data::queue::SampleQueue;

use super::{MonitorApp, MonitorView};

/// Open the monitor window and block until it is closed.
///
/// The ingest side is not started here; `queue` and `ctrl` must be the ones
/// handed to [`spawn_ingest`](crate::ingest::spawn_ingest).
pub fn run_monitor(
    config: &MonitorConfig,
    queue: Arc<SampleQueue>,
    ctrl: IngestController,
) -> eframe::Result<()> {
    let view = MonitorView::new(queue, &config.render);
    let app = MonitorApp::new(view, ctrl, config.render.period());

    let mut viewport = egui::ViewportBuilder::default()
        .with_title(config.title.clone())
        .with_inner_size(egui::vec2(1000.0, 600.0));
    if let Some(icon) = load_app_icon_svg() {
        viewport = viewport.with_icon(icon);
    }
    let opts = eframe::NativeOptions {
        viewport,
        ..Default::default()
    };

    eframe::run_native(
        &config.title,
        opts,
        Box::new(|cc| {
            let mut fonts = egui::FontDefinitions::default();
            egui_phosphor::add_to_fonts(&mut fonts, egui_phosphor::Variant::Regular);
            cc.egui_ctx.set_fonts(fonts);
            Ok(Box::new(app))
        }),
    )
}

/// Window icon, embedded at compile time.
const ICON_SVG: &[u8] = include_bytes!("../../icon.svg");
/// Edge length in pixels of the rasterized window icon.
const ICON_EDGE: u32 = 64;

/// Rasterize [`ICON_SVG`] into a square `ICON_EDGE` icon, scaling the SVG to fit.
fn load_app_icon_svg() -> Option<egui::IconData> {
    let tree = match usvg::Tree::from_data(ICON_SVG, &usvg::Options::default()) {
        Ok(tree) => tree,
        Err(e) => {
            tracing::warn!(error = %e, "window icon is not valid SVG, using the default");
            return None;
        }
    };
    let svg_size = tree.size();
    let scale = ICON_EDGE as f32 / svg_size.width().max(svg_size.height());
    if !scale.is_finite() {
        return None;
    }

    let mut pixmap = tiny_skia::Pixmap::new(ICON_EDGE, ICON_EDGE)?;
    resvg::render(
        &tree,
        tiny_skia::Transform::from_scale(scale, scale),
        &mut pixmap.as_mut(),
    );
    Some(egui::IconData {
        rgba: pixmap.take(),
        width: ICON_EDGE,
        height: ICON_EDGE,
    })
}
