//! GUI module - Dashboard window, control panel and page viewer

mod app;
mod chart_viewer;
mod control_panel;

pub use app::DashboardApp;
pub use chart_viewer::ChartViewer;
pub use control_panel::{Comparison, ControlPanel, ControlPanelAction, Page, UserSettings};
