//! Statistics Calculator Module
//! Descriptive statistics, table info and data-quality reports for cached tables.

use polars::prelude::*;
use rayon::prelude::*;
use serde::Serialize;
use statrs::statistics::{Data, Distribution, Max, Median, Min};
use std::collections::{HashMap, HashSet};

use crate::data::schema::column_names;

/// Descriptive statistics for a single numeric column.
#[derive(Debug, Clone, Serialize)]
pub struct ColumnStats {
    pub column: String,
    pub count: usize,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub median: f64,
    pub p05: f64,
    pub p95: f64,
}

impl ColumnStats {
    fn empty(column: &str) -> Self {
        Self {
            column: column.to_string(),
            count: 0,
            mean: f64::NAN,
            std: f64::NAN,
            min: f64::NAN,
            max: f64::NAN,
            median: f64::NAN,
            p05: f64::NAN,
            p95: f64::NAN,
        }
    }
}

/// Statistics of every numeric column within one group.
#[derive(Debug, Clone, Serialize)]
pub struct GroupSummary {
    pub group: String,
    pub rows: usize,
    pub columns: Vec<ColumnStats>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ColumnInfo {
    pub name: String,
    pub dtype: String,
    pub null_count: usize,
}

/// Shape of a table, as listed on the data-sources page.
#[derive(Debug, Clone, Serialize)]
pub struct TableInfo {
    pub name: String,
    pub rows: usize,
    pub columns: Vec<ColumnInfo>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QualityReport {
    pub dataset: String,
    pub total_rows: usize,
    pub total_columns: usize,
    pub missing_values: HashMap<String, usize>,
    pub missing_percentage: HashMap<String, f64>,
    pub duplicate_rows: usize,
    pub unique_values: HashMap<String, usize>,
    pub numeric_stats: Vec<ColumnStats>,
}

/// Handles statistical calculations with multi-threading support.
pub struct StatsCalculator;

impl StatsCalculator {
    /// Compute descriptive statistics for an array of values.
    pub fn compute_descriptive_stats(column: &str, values: &[f64]) -> ColumnStats {
        let n = values.len();
        if n == 0 {
            return ColumnStats::empty(column);
        }

        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let data = Data::new(values.to_vec());
        let std = if n > 1 {
            data.std_dev().unwrap_or(0.0)
        } else {
            0.0
        };

        ColumnStats {
            column: column.to_string(),
            count: n,
            mean: data.mean().unwrap_or(f64::NAN),
            std,
            min: data.min(),
            max: data.max(),
            median: data.median(),
            p05: Self::percentile(&sorted, 5.0),
            p95: Self::percentile(&sorted, 95.0),
        }
    }

    /// Calculate percentile using linear interpolation (NumPy compatible).
    fn percentile(sorted_values: &[f64], p: f64) -> f64 {
        let n = sorted_values.len();
        if n == 0 {
            return f64::NAN;
        }
        if n == 1 {
            return sorted_values[0];
        }

        let rank = (p / 100.0) * (n - 1) as f64;
        let lower = rank.floor() as usize;
        let upper = (rank.ceil() as usize).min(n - 1);
        let frac = rank - lower as f64;

        if lower == upper {
            sorted_values[lower]
        } else {
            sorted_values[lower] * (1.0 - frac) + sorted_values[upper] * frac
        }
    }

    /// Get list of numeric column names.
    pub fn numeric_columns(df: &DataFrame) -> Vec<String> {
        df.get_columns()
            .iter()
            .filter(|col| {
                matches!(
                    col.dtype(),
                    DataType::Float32
                        | DataType::Float64
                        | DataType::Int8
                        | DataType::Int16
                        | DataType::Int32
                        | DataType::Int64
                        | DataType::UInt8
                        | DataType::UInt16
                        | DataType::UInt32
                        | DataType::UInt64
                )
            })
            .map(|col| col.name().to_string())
            .collect()
    }

    /// Non-null, non-NaN values of a numeric column.
    fn values(df: &DataFrame, column: &str) -> PolarsResult<Vec<f64>> {
        let values = df.column(column)?.cast(&DataType::Float64)?;
        Ok(values
            .f64()?
            .into_iter()
            .flatten()
            .filter(|v| !v.is_nan())
            .collect())
    }

    /// Statistics for every numeric column, computed in parallel.
    pub fn describe(df: &DataFrame) -> PolarsResult<Vec<ColumnStats>> {
        Self::numeric_columns(df)
            .par_iter()
            .map(|column| {
                let values = Self::values(df, column)?;
                Ok(Self::compute_descriptive_stats(column, &values))
            })
            .collect()
    }

    /// `describe` for each distinct value of `group_by`, in first-seen order.
    pub fn describe_by(df: &DataFrame, group_by: &str) -> PolarsResult<Vec<GroupSummary>> {
        let keys = df.column(group_by)?.cast(&DataType::String)?;
        let keys: Vec<String> = keys
            .str()?
            .into_iter()
            .map(|key| key.unwrap_or_default().to_string())
            .collect();

        let mut order: Vec<&str> = Vec::new();
        for key in &keys {
            if !order.contains(&key.as_str()) {
                order.push(key);
            }
        }

        order
            .into_iter()
            .map(|group| {
                let mask: Vec<bool> = keys.iter().map(|k| k == group).collect();
                let subset = df.filter(&BooleanChunked::from_slice("mask".into(), &mask))?;
                let mut columns = Self::describe(&subset)?;
                columns.retain(|stats| stats.column != group_by);
                Ok(GroupSummary {
                    group: group.to_string(),
                    rows: subset.height(),
                    columns,
                })
            })
            .collect()
    }

    /// Row count, column dtypes and null counts of a table.
    pub fn table_info(name: &str, df: &DataFrame) -> TableInfo {
        TableInfo {
            name: name.to_string(),
            rows: df.height(),
            columns: df
                .get_columns()
                .iter()
                .map(|col| ColumnInfo {
                    name: col.name().to_string(),
                    dtype: col.dtype().to_string(),
                    null_count: col.null_count(),
                })
                .collect(),
        }
    }

    /// Number of rows identical to an earlier row.
    pub fn duplicate_rows(df: &DataFrame) -> usize {
        let columns = df.get_columns();
        let mut seen: HashSet<String> = HashSet::with_capacity(df.height());
        let mut duplicates = 0;

        for row in 0..df.height() {
            let key = columns
                .iter()
                .map(|col| col.get(row).map(|v| v.to_string()).unwrap_or_default())
                .collect::<Vec<_>>()
                .join("\u{1f}");
            if !seen.insert(key) {
                duplicates += 1;
            }
        }
        duplicates
    }

    /// Missing values, duplicates, cardinality and numeric stats of a table.
    pub fn quality_report(name: &str, df: &DataFrame) -> PolarsResult<QualityReport> {
        let rows = df.height();
        let mut missing_values = HashMap::new();
        let mut missing_percentage = HashMap::new();
        let mut unique_values = HashMap::new();

        for col in df.get_columns() {
            let name = col.name().to_string();
            let nulls = col.null_count();
            let pct = if rows == 0 {
                0.0
            } else {
                nulls as f64 / rows as f64 * 100.0
            };
            unique_values.insert(name.clone(), col.as_materialized_series().n_unique()?);
            missing_percentage.insert(name.clone(), pct);
            missing_values.insert(name, nulls);
        }

        Ok(QualityReport {
            dataset: name.to_string(),
            total_rows: rows,
            total_columns: column_names(df).len(),
            missing_values,
            missing_percentage,
            duplicate_rows: Self::duplicate_rows(df),
            unique_values,
            numeric_stats: Self::describe(df)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DataFrame {
        DataFrame::new(vec![
            Column::new("Dependencia".into(), vec!["Estadual", "Municipal", "Estadual", "Estadual"]),
            Column::new("Total_Professores".into(), vec![Some(10.0), Some(20.0), None, Some(10.0)]),
            Column::new("Total_Escolas".into(), vec![1u32, 1, 1, 1]),
        ])
        .unwrap()
    }

    #[test]
    fn descriptive_stats_of_known_values() {
        let stats = StatsCalculator::compute_descriptive_stats("x", &[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(stats.count, 4);
        assert_eq!(stats.mean, 2.5);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 4.0);
        assert_eq!(stats.median, 2.5);
        assert!((stats.std - 1.2909944).abs() < 1e-6);
        assert!((stats.p95 - 3.85).abs() < 1e-9);
    }

    #[test]
    fn empty_values_give_nan_stats() {
        let stats = StatsCalculator::compute_descriptive_stats("x", &[]);
        assert_eq!(stats.count, 0);
        assert!(stats.mean.is_nan());
    }

    #[test]
    fn describe_skips_text_columns_and_nulls() {
        let stats = StatsCalculator::describe(&sample()).unwrap();
        let names: Vec<&str> = stats.iter().map(|s| s.column.as_str()).collect();
        assert_eq!(names, vec!["Total_Professores", "Total_Escolas"]);
        assert_eq!(stats[0].count, 3);
    }

    #[test]
    fn describe_by_groups_rows() {
        let groups = StatsCalculator::describe_by(&sample(), "Dependencia").unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].group, "Estadual");
        assert_eq!(groups[0].rows, 3);
        assert_eq!(groups[0].columns[0].mean, 10.0);
        assert_eq!(groups[1].group, "Municipal");
    }

    #[test]
    fn quality_report_counts_nulls_and_duplicates() {
        let report = StatsCalculator::quality_report("dependencia", &sample()).unwrap();
        assert_eq!(report.total_rows, 4);
        assert_eq!(report.total_columns, 3);
        assert_eq!(report.missing_values["Total_Professores"], 1);
        assert_eq!(report.missing_percentage["Total_Professores"], 25.0);
        assert_eq!(report.duplicate_rows, 1);
        assert_eq!(report.unique_values["Dependencia"], 2);
    }

    #[test]
    fn table_info_lists_columns() {
        let info = StatsCalculator::table_info("dependencia", &sample());
        assert_eq!(info.rows, 4);
        assert_eq!(info.columns.len(), 3);
        assert_eq!(info.columns[1].null_count, 1);
    }
}
