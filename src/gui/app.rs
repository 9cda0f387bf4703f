//! Dashboard Main Application
//! Main window with control panel and page viewer. Tables load in a
//! background thread so the window opens immediately.

use egui::SidePanel;
use std::sync::mpsc::{channel, Receiver};
use std::sync::Arc;
use std::thread;
use tracing::{error, info};

use crate::data::TableName;
use crate::export::ExportFormat;
use crate::gui::{ChartViewer, ControlPanel, ControlPanelAction};
use crate::service::{DataOrigin, DataService, TableCache};

/// Table loading result from background thread
enum LoadResult {
    Complete {
        origin: DataOrigin,
        tables: usize,
    },
}

/// Main application window.
pub struct DashboardApp {
    service: DataService,
    control_panel: ControlPanel,
    chart_viewer: ChartViewer,
    load_rx: Option<Receiver<LoadResult>>,
}

impl DashboardApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, cache: Arc<TableCache>) -> Self {
        let mut app = Self {
            service: DataService::new(cache.clone()),
            control_panel: ControlPanel::new(),
            chart_viewer: ChartViewer::new(),
            load_rx: None,
        };
        app.start_loading(cache);
        app
    }

    /// Populate the cache off the UI thread.
    fn start_loading(&mut self, cache: Arc<TableCache>) {
        let (tx, rx) = channel();
        self.load_rx = Some(rx);

        thread::spawn(move || {
            let tables = cache.tables().len();
            let origin = cache.origin().clone();
            let _ = tx.send(LoadResult::Complete { origin, tables });
        });
    }

    /// Check for loading results
    fn check_load_results(&mut self) {
        let Some(rx) = self.load_rx.take() else {
            return;
        };

        match rx.try_recv() {
            Ok(LoadResult::Complete { origin, tables }) => {
                let status = match &origin {
                    DataOrigin::Census => format!("{tables} tabelas carregadas"),
                    DataOrigin::Fallback(_) => format!("{tables} tabelas simuladas"),
                };
                info!(tables, fallback = origin.is_fallback(), "dashboard data ready");
                self.control_panel.set_origin(origin);
                self.control_panel.set_status(&status);
                self.chart_viewer.set_service(self.service.clone());
            }
            Err(std::sync::mpsc::TryRecvError::Empty) => self.load_rx = Some(rx),
            Err(std::sync::mpsc::TryRecvError::Disconnected) => {
                error!("loader thread exited without a result");
                self.control_panel.set_status("Erro: carregamento interrompido");
            }
        }
    }

    /// Export the selected table through a save dialog.
    fn handle_export(&mut self, format: ExportFormat) {
        let table: TableName = self.control_panel.settings.selected_table;
        let file_name = format!("{}.{}", table, format.extension());

        let Some(path) = rfd::FileDialog::new()
            .add_filter(format.extension().to_uppercase(), &[format.extension()])
            .set_file_name(file_name)
            .save_file()
        else {
            return; // User cancelled
        };

        match self.service.export_data(table.as_str(), format, &path) {
            Ok(()) => self
                .control_panel
                .set_status(&format!("Exportado: {}", path.display())),
            Err(e) => {
                error!(table = %table, error = %e, "export failed");
                self.control_panel.set_status(&format!("Erro: {e}"));
            }
        }
    }
}

impl eframe::App for DashboardApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.check_load_results();

        if self.load_rx.is_some() {
            ctx.request_repaint();
        }

        // Left panel - Control Panel
        SidePanel::left("control_panel")
            .min_width(280.0)
            .max_width(340.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    match self.control_panel.show(ui) {
                        ControlPanelAction::Export(format) => self.handle_export(format),
                        ControlPanelAction::None => {}
                    }
                });
            });

        // Central panel - Page viewer
        egui::CentralPanel::default().show(ctx, |ui| {
            self.chart_viewer.show(ui, &self.control_panel.settings);
        });
    }
}
