//! Chart Viewer Widget
//! Central scrollable panel rendering the selected dashboard page.

use egui::{Color32, RichText, ScrollArea};
use polars::prelude::*;
use std::collections::HashMap;

use crate::charts::{BarSeries, ChartPlotter, PRIMARY_COLOR};
use crate::data::schema::{
    COUNT_ESCOLAS, COUNT_OFERTAS, CURSO, DEPENDENCIA_KEY, LOCALIZACAO_KEY, MUNICIPIO, OFERTAS,
    SUM_MATRICULAS, SUM_MATRICULAS_CURSOS, SUM_PROFESSORES,
};
use crate::data::TableName;
use crate::gui::control_panel::{Comparison, Page, UserSettings};
use crate::service::{DataService, SummaryStatistics};
use crate::stats::{Aggregator, QualityReport};

const CHART_HEIGHT: f32 = 280.0;
const PREVIEW_ROWS: usize = 20;

/// Key column of each comparison table.
fn key_column(comparison: Comparison) -> &'static str {
    match comparison {
        Comparison::Municipios => MUNICIPIO,
        Comparison::Dependencia => DEPENDENCIA_KEY,
        Comparison::Localizacao => LOCALIZACAO_KEY,
    }
}

fn column_total(df: &DataFrame, column: &str) -> f64 {
    df.column(column)
        .and_then(|c| c.cast(&DataType::Float64))
        .ok()
        .and_then(|c| c.f64().ok().and_then(|v| v.sum()))
        .unwrap_or(0.0)
}

/// Scrollable page area. Derived statistics are computed once per table.
#[derive(Default)]
pub struct ChartViewer {
    service: Option<DataService>,
    quality: HashMap<TableName, Result<QualityReport, String>>,
}

impl ChartViewer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_service(&mut self, service: DataService) {
        self.service = Some(service);
        self.quality.clear();
    }

    pub fn show(&mut self, ui: &mut egui::Ui, settings: &UserSettings) {
        let Some(service) = self.service.clone() else {
            ui.centered_and_justified(|ui| {
                ui.label(RichText::new("Carregando dados...").size(20.0));
            });
            return;
        };

        ScrollArea::vertical()
            .auto_shrink([false, false])
            .show(ui, |ui| match settings.page {
                Page::Painel => Self::show_overview(ui, &service),
                Page::Comparativos => Self::show_comparison(ui, &service, settings),
                Page::Cursos => Self::show_courses(ui, &service, settings),
                Page::BasesDeDados => self.show_sources(ui, &service, settings),
            });
    }

    fn heading(ui: &mut egui::Ui, text: &str) {
        ui.add_space(8.0);
        ui.label(RichText::new(text).size(18.0).strong());
        ui.add_space(6.0);
    }

    fn error(ui: &mut egui::Ui, message: impl std::fmt::Display) {
        ui.label(
            RichText::new(format!("Erro: {message}"))
                .color(Color32::from_rgb(220, 53, 69)),
        );
    }

    fn metric_card(ui: &mut egui::Ui, label: &str, value: f64) {
        egui::Frame::none()
            .rounding(8.0)
            .stroke(egui::Stroke::new(1.5, PRIMARY_COLOR))
            .fill(ui.visuals().widgets.noninteractive.bg_fill)
            .inner_margin(12.0)
            .show(ui, |ui| {
                ui.set_width(170.0);
                ui.vertical(|ui| {
                    ui.label(RichText::new(label).size(12.0).color(Color32::GRAY));
                    ui.label(RichText::new(format!("{value:.0}")).size(22.0).strong());
                });
            });
    }

    fn bar_chart(ui: &mut egui::Ui, id: &str, df: &DataFrame, label: &str, value: &str) {
        match BarSeries::from_table(df, label, value) {
            Ok(series) if !series.is_empty() => {
                ChartPlotter::draw_bar_chart(ui, id, &series, CHART_HEIGHT)
            }
            Ok(_) => {
                ui.label("Sem dados");
            }
            Err(e) => Self::error(ui, e),
        }
    }

    fn share_chart(ui: &mut egui::Ui, id: &str, df: &DataFrame, label: &str, value: &str) {
        match BarSeries::from_table(df, label, value) {
            Ok(series) => ChartPlotter::draw_share_chart(ui, id, &series, CHART_HEIGHT),
            Err(e) => Self::error(ui, e),
        }
    }

    fn show_overview(ui: &mut egui::Ui, service: &DataService) {
        Self::heading(ui, "🏠 Painel Geral");

        let schools = service.get_data(TableName::Escolas.as_str());
        let courses = service.get_data(TableName::CursosTecnicos.as_str());
        let municipios = service.get_data(TableName::Municipios.as_str());
        let (Some(schools), Some(courses), Some(municipios)) = (schools, courses, municipios) else {
            Self::error(ui, "tabelas indisponíveis");
            return;
        };

        ui.horizontal_wrapped(|ui| {
            Self::metric_card(ui, "Escolas", column_total(&municipios, COUNT_ESCOLAS));
            Self::metric_card(ui, "Professores", column_total(&municipios, SUM_PROFESSORES));
            Self::metric_card(ui, "Matrículas", column_total(&municipios, SUM_MATRICULAS));
            Self::metric_card(ui, "Municípios", municipios.height() as f64);
            Self::metric_card(ui, "Ofertas de cursos técnicos", courses.height() as f64);
        });
        ui.add_space(4.0);
        ui.label(
            RichText::new(format!("{} registros de escolas", schools.height()))
                .size(10.0)
                .color(Color32::GRAY),
        );

        Self::heading(ui, "Professores por município (10 maiores)");
        match Aggregator::top_n(&municipios, SUM_PROFESSORES, 10) {
            Ok(top) => Self::bar_chart(ui, "overview_municipios", &top, MUNICIPIO, SUM_PROFESSORES),
            Err(e) => Self::error(ui, e),
        }

        Self::heading(ui, "Escolas por dependência administrativa");
        match service.get_data(TableName::Dependencia.as_str()) {
            Some(df) => Self::share_chart(ui, "overview_dependencia", &df, DEPENDENCIA_KEY, COUNT_ESCOLAS),
            None => Self::error(ui, "dependencia"),
        }
    }

    fn show_comparison(ui: &mut egui::Ui, service: &DataService, settings: &UserSettings) {
        let comparison = settings.comparison;
        Self::heading(ui, &format!("📊 Comparação: {}", comparison.label()));

        let Some(table) = service.get_data(comparison.table().as_str()) else {
            Self::error(ui, comparison.table());
            return;
        };
        let top = match Aggregator::top_n(&table, settings.metric, settings.top_n) {
            Ok(top) => top,
            Err(e) => {
                Self::error(ui, e);
                return;
            }
        };

        let key = key_column(comparison);
        Self::bar_chart(ui, "comparison_bars", &top, key, settings.metric);
        ui.add_space(10.0);
        Self::share_chart(ui, "comparison_share", &top, key, settings.metric);

        Self::heading(ui, "📋 Tabela comparativa");
        ChartPlotter::draw_table(ui, "comparison_table", &top, settings.top_n);
    }

    fn show_courses(ui: &mut egui::Ui, service: &DataService, settings: &UserSettings) {
        Self::heading(ui, "🔧 Cursos técnicos mais ofertados");

        match service.get_data(TableName::TopCursos.as_str()) {
            Some(df) => {
                let top = df.head(Some(settings.top_n));
                match BarSeries::from_table(&top, CURSO, OFERTAS) {
                    Ok(series) => ChartPlotter::draw_ranking_chart(ui, "top_cursos", &series, CHART_HEIGHT + 80.0),
                    Err(e) => Self::error(ui, e),
                }
            }
            None => Self::error(ui, TableName::TopCursos),
        }

        Self::heading(ui, "Ofertas por município");
        match service.get_data(TableName::CursosMunicipio.as_str()) {
            Some(df) => match Aggregator::top_n(&df, COUNT_OFERTAS, settings.top_n) {
                Ok(top) => {
                    Self::bar_chart(ui, "cursos_municipio", &top, MUNICIPIO, SUM_MATRICULAS_CURSOS);
                    ui.add_space(10.0);
                    ChartPlotter::draw_table(ui, "cursos_municipio_table", &top, settings.top_n);
                }
                Err(e) => Self::error(ui, e),
            },
            None => Self::error(ui, TableName::CursosMunicipio),
        }
    }

    fn show_sources(&mut self, ui: &mut egui::Ui, service: &DataService, settings: &UserSettings) {
        Self::heading(ui, "🗄 Bases de dados");

        egui::Grid::new("data_info")
            .striped(true)
            .spacing([16.0, 4.0])
            .show(ui, |ui| {
                for header in ["Tabela", "Linhas", "Colunas", "Valores ausentes"] {
                    ui.label(RichText::new(header).strong());
                }
                ui.end_row();
                for info in service.get_data_info() {
                    let nulls: usize = info.columns.iter().map(|c| c.null_count).sum();
                    ui.label(info.name.as_str());
                    ui.label(info.rows.to_string());
                    ui.label(info.columns.len().to_string());
                    ui.label(nulls.to_string());
                    ui.end_row();
                }
            });

        let table = settings.selected_table;
        Self::heading(ui, &format!("Prévia: {table}"));
        match service.get_data(table.as_str()) {
            Some(df) => ChartPlotter::draw_table(ui, "preview", &df, PREVIEW_ROWS),
            None => Self::error(ui, table),
        }

        Self::heading(ui, "Estatísticas descritivas");
        match service.get_summary_statistics(table.as_str(), None) {
            Ok(SummaryStatistics::Table(stats)) => ChartPlotter::draw_stats_table(ui, "stats", &stats),
            Ok(SummaryStatistics::Grouped(_)) => {}
            Err(e) => Self::error(ui, e),
        }

        Self::heading(ui, "Qualidade dos dados");
        let report = self.quality.entry(table).or_insert_with(|| {
            service
                .get_data_quality_report(table.as_str())
                .map_err(|e| e.to_string())
        });
        match report {
            Ok(report) => {
                ui.label(format!(
                    "{} linhas, {} colunas, {} linhas duplicadas",
                    report.total_rows, report.total_columns, report.duplicate_rows
                ));
                let mut missing: Vec<(&String, &f64)> = report
                    .missing_percentage
                    .iter()
                    .filter(|(_, pct)| **pct > 0.0)
                    .collect();
                missing.sort_by(|a, b| a.0.cmp(b.0));
                for (column, pct) in missing {
                    ui.label(format!("{column}: {pct:.1}% ausente"));
                }
            }
            Err(e) => Self::error(ui, e),
        }
    }
}
