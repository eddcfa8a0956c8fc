//! Monitor window: render loop state, eframe wrapper and launcher.
//!
//! | Sub-module      | Responsibility |
//! | --------------- | -------------- |
//! | [`update`]      | [`MonitorView`]: per-tick queue draining, history and axis fitting |
//! | [`monitor_app`] | [`MonitorApp`]: eframe application, plots and status bar |
//! | [`run`]         | [`run_monitor()`] entry point and icon loading |

mod monitor_app;
mod run;
mod update;

pub use monitor_app::MonitorApp;
pub use run::run_monitor;
pub use update::MonitorView;
