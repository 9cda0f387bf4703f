//! Chart Plotter Module
//! Bar charts and tables for the dashboard pages, drawn with egui_plot.

use egui::{Color32, RichText};
use egui_plot::{Bar, BarChart, Legend, Plot};
use polars::prelude::*;

use crate::stats::ColumnStats;

pub const PRIMARY_COLOR: Color32 = Color32::from_rgb(52, 152, 219); // Blue

pub const PALETTE: [Color32; 10] = [
    Color32::from_rgb(231, 76, 60),  // Red
    Color32::from_rgb(46, 204, 113), // Green
    Color32::from_rgb(155, 89, 182), // Purple
    Color32::from_rgb(243, 156, 18), // Orange
    Color32::from_rgb(26, 188, 156), // Teal
    Color32::from_rgb(233, 30, 99),  // Pink
    Color32::from_rgb(0, 188, 212),  // Cyan
    Color32::from_rgb(255, 87, 34),  // Deep Orange
    Color32::from_rgb(121, 85, 72),  // Brown
    Color32::from_rgb(96, 125, 139), // Blue Grey
];

/// One labelled value per bar, in table order.
#[derive(Debug, Clone, PartialEq)]
pub struct BarSeries {
    pub title: String,
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

impl BarSeries {
    /// Read `label_col` and `value_col` from a table; null values plot as zero.
    pub fn from_table(df: &DataFrame, label_col: &str, value_col: &str) -> PolarsResult<Self> {
        let labels = df.column(label_col)?.cast(&DataType::String)?;
        let values = df.column(value_col)?.cast(&DataType::Float64)?;

        Ok(Self {
            title: value_col.replace('_', " "),
            labels: labels
                .str()?
                .into_iter()
                .map(|v| v.unwrap_or_default().to_string())
                .collect(),
            values: values
                .f64()?
                .into_iter()
                .map(|v| v.unwrap_or(0.0))
                .collect(),
        })
    }

    pub fn total(&self) -> f64 {
        self.values.iter().sum()
    }

    /// Percentage of the total held by each bar.
    pub fn shares(&self) -> Vec<f64> {
        let total = self.total();
        self.values
            .iter()
            .map(|v| if total > 0.0 { v / total * 100.0 } else { 0.0 })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Draws dashboard charts and tables.
pub struct ChartPlotter;

impl ChartPlotter {
    pub fn color(index: usize) -> Color32 {
        PALETTE[index % PALETTE.len()]
    }

    /// Vertical bars, one colour per category.
    pub fn draw_bar_chart(ui: &mut egui::Ui, id: &str, series: &BarSeries, height: f32) {
        let labels = series.labels.clone();

        let bars: Vec<Bar> = series
            .values
            .iter()
            .enumerate()
            .map(|(i, &value)| {
                Bar::new(i as f64, value)
                    .name(&series.labels[i])
                    .fill(Self::color(i))
                    .width(0.7)
            })
            .collect();

        Plot::new(id)
            .height(height)
            .allow_zoom(false)
            .allow_drag(false)
            .allow_scroll(false)
            .y_axis_label(series.title.clone())
            .x_axis_formatter(move |mark, _range| {
                let idx = mark.value.round();
                if (mark.value - idx).abs() > f64::EPSILON || idx < 0.0 {
                    return String::new();
                }
                labels.get(idx as usize).cloned().unwrap_or_default()
            })
            .show(ui, |plot_ui| {
                plot_ui.bar_chart(BarChart::new(bars).color(PRIMARY_COLOR));
            });
    }

    /// Horizontal bars, largest at the top. Used for ranked tables.
    pub fn draw_ranking_chart(ui: &mut egui::Ui, id: &str, series: &BarSeries, height: f32) {
        let n = series.values.len();
        let labels: Vec<String> = series.labels.iter().rev().cloned().collect();

        let bars: Vec<Bar> = series
            .values
            .iter()
            .enumerate()
            .map(|(i, &value)| {
                Bar::new((n - 1 - i) as f64, value)
                    .name(&series.labels[i])
                    .fill(PRIMARY_COLOR)
                    .width(0.6)
            })
            .collect();

        Plot::new(id)
            .height(height)
            .allow_zoom(false)
            .allow_drag(false)
            .allow_scroll(false)
            .x_axis_label(series.title.clone())
            .y_axis_formatter(move |mark, _range| {
                let idx = mark.value.round();
                if (mark.value - idx).abs() > f64::EPSILON || idx < 0.0 {
                    return String::new();
                }
                labels.get(idx as usize).cloned().unwrap_or_default()
            })
            .show(ui, |plot_ui| {
                plot_ui.bar_chart(BarChart::new(bars).horizontal());
            });
    }

    /// Percentage of the total per category, one legend entry each.
    pub fn draw_share_chart(ui: &mut egui::Ui, id: &str, series: &BarSeries, height: f32) {
        let charts: Vec<BarChart> = series
            .shares()
            .into_iter()
            .enumerate()
            .map(|(i, share)| {
                let name = format!("{} ({share:.1}%)", series.labels[i]);
                let bar = Bar::new(i as f64, share).fill(Self::color(i)).width(0.7);
                BarChart::new(vec![bar]).color(Self::color(i)).name(name)
            })
            .collect();

        Plot::new(id)
            .height(height)
            .legend(Legend::default())
            .allow_zoom(false)
            .allow_drag(false)
            .allow_scroll(false)
            .include_y(0.0)
            .include_y(100.0)
            .y_axis_label("%")
            .show_axes([false, true])
            .show(ui, |plot_ui| {
                for chart in charts {
                    plot_ui.bar_chart(chart);
                }
            });
    }

    fn cell(value: AnyValue<'_>) -> String {
        match value {
            AnyValue::Null => "-".to_string(),
            AnyValue::Float64(v) => format!("{v:.0}"),
            AnyValue::String(s) => s.to_string(),
            other => other.to_string(),
        }
    }

    /// First `max_rows` rows of a table as a striped grid.
    pub fn draw_table(ui: &mut egui::Ui, id: &str, df: &DataFrame, max_rows: usize) {
        egui::Frame::none()
            .fill(ui.visuals().widgets.noninteractive.bg_fill)
            .rounding(5.0)
            .inner_margin(8.0)
            .show(ui, |ui| {
                egui::Grid::new(ui.make_persistent_id(id))
                    .striped(true)
                    .min_col_width(60.0)
                    .spacing([12.0, 4.0])
                    .show(ui, |ui| {
                        for col in df.get_columns() {
                            ui.label(RichText::new(col.name().as_str()).strong().size(11.0));
                        }
                        ui.end_row();

                        for row in 0..df.height().min(max_rows) {
                            for col in df.get_columns() {
                                let text = col.get(row).map(Self::cell).unwrap_or_default();
                                ui.label(RichText::new(text).size(11.0));
                            }
                            ui.end_row();
                        }
                    });
            });

        if df.height() > max_rows {
            ui.label(
                RichText::new(format!("{} de {} linhas", max_rows, df.height()))
                    .size(10.0)
                    .color(Color32::GRAY),
            );
        }
    }

    /// Descriptive statistics per numeric column.
    pub fn draw_stats_table(ui: &mut egui::Ui, id: &str, stats: &[ColumnStats]) {
        egui::Frame::none()
            .fill(ui.visuals().widgets.noninteractive.bg_fill)
            .rounding(5.0)
            .inner_margin(8.0)
            .show(ui, |ui| {
                egui::Grid::new(ui.make_persistent_id(id))
                    .striped(true)
                    .min_col_width(55.0)
                    .spacing([8.0, 4.0])
                    .show(ui, |ui| {
                        for header in ["Coluna", "N", "Média", "Mediana", "Desvio", "Mín", "Máx", "P05", "P95"] {
                            ui.label(RichText::new(header).strong().size(11.0));
                        }
                        ui.end_row();

                        for s in stats {
                            ui.label(RichText::new(&s.column).size(11.0));
                            ui.label(RichText::new(s.count.to_string()).size(11.0));
                            for value in [s.mean, s.median, s.std, s.min, s.max, s.p05, s.p95] {
                                ui.label(RichText::new(format!("{value:.2}")).size(11.0));
                            }
                            ui.end_row();
                        }
                    });
            });
    }
}
