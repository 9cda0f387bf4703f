//! Stats module - grouping, ranking and descriptive statistics

mod aggregator;
mod calculator;

pub use aggregator::{
    AggregateError, Aggregator, GroupKey, MetricSet, COURSE_METRICS, COURSE_SUMMARY_METRICS,
    SCHOOL_METRICS, SCHOOL_SUMMARY_METRICS,
};
pub use calculator::{ColumnInfo, ColumnStats, GroupSummary, QualityReport, StatsCalculator, TableInfo};
