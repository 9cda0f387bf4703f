//! Charts module - Dashboard charts and tables

mod plotter;

pub use plotter::{BarSeries, ChartPlotter, PALETTE, PRIMARY_COLOR};
