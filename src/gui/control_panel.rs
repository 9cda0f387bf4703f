//! Control Panel Widget
//! Left side panel with page navigation, comparison settings and data status.

use egui::{Color32, ComboBox, RichText};

use crate::data::schema::{COUNT_ESCOLAS, SUM_MATRICULAS, SUM_PROFESSORES, SUM_TURMAS};
use crate::data::{Diagnostic, TableName};
use crate::export::ExportFormat;
use crate::service::DataOrigin;

/// Dashboard pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Page {
    #[default]
    Painel,
    Comparativos,
    Cursos,
    BasesDeDados,
}

impl Page {
    pub const ALL: [Page; 4] = [Page::Painel, Page::Comparativos, Page::Cursos, Page::BasesDeDados];

    pub fn title(self) -> &'static str {
        match self {
            Page::Painel => "🏠 Painel",
            Page::Comparativos => "📊 Comparativos",
            Page::Cursos => "🔧 Cursos Técnicos",
            Page::BasesDeDados => "🗄 Bases de Dados",
        }
    }
}

/// Summary table shown on the comparison page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Comparison {
    #[default]
    Municipios,
    Dependencia,
    Localizacao,
}

impl Comparison {
    pub const ALL: [Comparison; 3] = [
        Comparison::Municipios,
        Comparison::Dependencia,
        Comparison::Localizacao,
    ];

    pub fn table(self) -> TableName {
        match self {
            Comparison::Municipios => TableName::Municipios,
            Comparison::Dependencia => TableName::Dependencia,
            Comparison::Localizacao => TableName::Localizacao,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Comparison::Municipios => "Municípios",
            Comparison::Dependencia => "Dependência administrativa",
            Comparison::Localizacao => "Localização",
        }
    }
}

/// Metrics a school summary can be compared by.
pub const METRICS: [&str; 4] = [SUM_PROFESSORES, SUM_MATRICULAS, SUM_TURMAS, COUNT_ESCOLAS];

/// User selections shared with the chart viewer.
#[derive(Debug, Clone)]
pub struct UserSettings {
    pub page: Page,
    pub comparison: Comparison,
    pub metric: &'static str,
    pub top_n: usize,
    pub selected_table: TableName,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            page: Page::default(),
            comparison: Comparison::default(),
            metric: SUM_PROFESSORES,
            top_n: 10,
            selected_table: TableName::Municipios,
        }
    }
}

/// Left side control panel.
pub struct ControlPanel {
    pub settings: UserSettings,
    pub origin: Option<DataOrigin>,
    pub status: String,
}

impl Default for ControlPanel {
    fn default() -> Self {
        Self {
            settings: UserSettings::default(),
            origin: None,
            status: "Carregando dados...".to_string(),
        }
    }
}

impl ControlPanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_status(&mut self, status: &str) {
        self.status = status.to_string();
    }

    pub fn set_origin(&mut self, origin: DataOrigin) {
        self.origin = Some(origin);
    }

    fn loaded(&self) -> bool {
        self.origin.is_some()
    }

    /// Draw the control panel
    pub fn show(&mut self, ui: &mut egui::Ui) -> ControlPanelAction {
        let mut action = ControlPanelAction::None;

        ui.vertical_centered(|ui| {
            ui.add_space(5.0);
            ui.label(
                RichText::new("📊 Educação ES")
                    .size(22.0)
                    .color(Color32::from_rgb(100, 149, 237)),
            );
            ui.label(
                RichText::new("Censo Escolar 2024")
                    .size(11.0)
                    .color(Color32::GRAY),
            );
        });
        ui.add_space(10.0);
        ui.separator();
        ui.add_space(5.0);

        // ===== Navigation =====
        ui.label(RichText::new("🧭 Páginas").size(14.0).strong());
        ui.add_space(5.0);
        for page in Page::ALL {
            ui.selectable_value(&mut self.settings.page, page, page.title());
        }

        ui.add_space(15.0);
        ui.separator();
        ui.add_space(10.0);

        // ===== Page settings =====
        let label_width = 90.0;
        let combo_width = 170.0;

        match self.settings.page {
            Page::Comparativos => {
                ui.label(RichText::new("🔍 Comparação").size(14.0).strong());
                ui.add_space(8.0);
                ui.horizontal(|ui| {
                    ui.add_sized([label_width, 20.0], egui::Label::new("Agrupar por:"));
                    ComboBox::from_id_salt("comparison")
                        .width(combo_width)
                        .selected_text(self.settings.comparison.label())
                        .show_ui(ui, |ui| {
                            for comparison in Comparison::ALL {
                                ui.selectable_value(
                                    &mut self.settings.comparison,
                                    comparison,
                                    comparison.label(),
                                );
                            }
                        });
                });
                ui.add_space(5.0);
                ui.horizontal(|ui| {
                    ui.add_sized([label_width, 20.0], egui::Label::new("Indicador:"));
                    ComboBox::from_id_salt("metric")
                        .width(combo_width)
                        .selected_text(self.settings.metric.replace('_', " "))
                        .show_ui(ui, |ui| {
                            for metric in METRICS {
                                ui.selectable_value(
                                    &mut self.settings.metric,
                                    metric,
                                    metric.replace('_', " "),
                                );
                            }
                        });
                });
                ui.add_space(5.0);
                ui.add(egui::Slider::new(&mut self.settings.top_n, 3..=30).text("primeiros"));
            }
            Page::Cursos => {
                ui.label(RichText::new("🔧 Cursos").size(14.0).strong());
                ui.add_space(8.0);
                ui.add(egui::Slider::new(&mut self.settings.top_n, 3..=30).text("primeiros"));
            }
            Page::BasesDeDados => {
                ui.label(RichText::new("🗄 Tabela").size(14.0).strong());
                ui.add_space(8.0);
                ComboBox::from_id_salt("table")
                    .width(combo_width + label_width)
                    .selected_text(self.settings.selected_table.as_str())
                    .show_ui(ui, |ui| {
                        for table in TableName::ALL {
                            ui.selectable_value(
                                &mut self.settings.selected_table,
                                table,
                                table.as_str(),
                            );
                        }
                    });

                ui.add_space(10.0);
                ui.add_enabled_ui(self.loaded(), |ui| {
                    ui.horizontal(|ui| {
                        if ui.button("💾 Exportar CSV").clicked() {
                            action = ControlPanelAction::Export(ExportFormat::Csv);
                        }
                        if ui.button("💾 Exportar JSON").clicked() {
                            action = ControlPanelAction::Export(ExportFormat::Json);
                        }
                    });
                });
            }
            Page::Painel => {}
        }

        ui.add_space(15.0);
        ui.separator();
        ui.add_space(10.0);

        // ===== Data source status =====
        ui.label(RichText::new("📁 Fonte dos dados").size(14.0).strong());
        ui.add_space(5.0);

        match &self.origin {
            None => {
                ui.horizontal(|ui| {
                    ui.spinner();
                    ui.label(RichText::new(&self.status).size(11.0).color(Color32::GRAY));
                });
            }
            Some(DataOrigin::Census) => {
                ui.label(
                    RichText::new("✓ Microdados do Censo Escolar")
                        .size(12.0)
                        .color(Color32::from_rgb(40, 167, 69)),
                );
            }
            Some(DataOrigin::Fallback(diagnostic)) => Self::show_fallback(ui, diagnostic),
        }

        if self.loaded() {
            ui.add_space(5.0);
            ui.label(RichText::new(&self.status).size(11.0).color(Color32::GRAY));
        }

        action
    }

    fn show_fallback(ui: &mut egui::Ui, diagnostic: &Diagnostic) {
        ui.label(
            RichText::new("⚠ Dados simulados")
                .size(12.0)
                .color(Color32::from_rgb(243, 156, 18)),
        );
        ui.label(
            RichText::new(diagnostic.kind.to_string())
                .size(11.0)
                .strong(),
        );
        ui.label(RichText::new(&diagnostic.message).size(10.0).color(Color32::GRAY));
    }
}

/// Actions triggered by control panel
#[derive(Debug, Clone, PartialEq)]
pub enum ControlPanelAction {
    None,
    Export(ExportFormat),
}
