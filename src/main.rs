//! Educação ES - School census dashboard
//!
//! Desktop dashboard over the INEP school census for Espírito Santo.

use anyhow::{anyhow, Context, Result};
use eframe::egui;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use edu_dashboard::config::PipelineConfig;
use edu_dashboard::gui::DashboardApp;
use edu_dashboard::service::TableCache;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = PipelineConfig::from_env().context("loading pipeline config")?;
    let cache = Arc::new(TableCache::from_config(config));

    // Configure native options
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 850.0])
            .with_min_inner_size([1100.0, 700.0])
            .with_title("Educação ES - Censo Escolar"),
        ..Default::default()
    };

    eframe::run_native(
        "Educação ES",
        options,
        Box::new(move |cc| Ok(Box::new(DashboardApp::new(cc, cache)))),
    )
    .map_err(|e| anyhow!("dashboard window failed: {e}"))
}
