//! Aggregator Module
//! Groups processed records into summary tables and ranks their rows.

use polars::prelude::*;
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

use crate::data::schema::{
    COUNT_ESCOLAS, COUNT_OFERTAS, DEPENDENCIA, DEPENDENCIA_KEY, LOCALIZACAO, LOCALIZACAO_KEY,
    MUNICIPIO, NO_MUNICIPIO, SUM_CURSOS, SUM_MATRICULAS, SUM_MATRICULAS_CURSOS, SUM_PROFESSORES,
    SUM_TURMAS, TOTAL_CURSOS, TOTAL_MATRICULAS, TOTAL_MATRICULAS_CURSOS, TOTAL_PROFESSORES,
    TOTAL_TURMAS, UNKNOWN_GROUP,
};

#[derive(Error, Debug)]
pub enum AggregateError {
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("Column not found: {0}")]
    MissingColumn(String),
}

/// Categorical field a summary table is keyed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupKey {
    Municipality,
    Dependency,
    Location,
    /// Any column, kept under the same name in the output. Used to
    /// re-aggregate a summary table by its own key.
    Column(&'static str),
}

impl GroupKey {
    /// Column read from the processed records.
    pub fn source_column(self) -> &'static str {
        match self {
            GroupKey::Municipality => NO_MUNICIPIO,
            GroupKey::Dependency => DEPENDENCIA,
            GroupKey::Location => LOCALIZACAO,
            GroupKey::Column(name) => name,
        }
    }

    /// Key column of the summary table.
    pub fn output_column(self) -> &'static str {
        match self {
            GroupKey::Municipality => MUNICIPIO,
            GroupKey::Dependency => DEPENDENCIA_KEY,
            GroupKey::Location => LOCALIZACAO_KEY,
            GroupKey::Column(name) => name,
        }
    }
}

/// Which record totals are summed, what they are called in the summary,
/// and the name of the record-count column.
///
/// With `count_from` unset every record counts once; otherwise the count
/// is the sum of that column, which is how summary tables re-aggregate.
#[derive(Debug, Clone, Copy)]
pub struct MetricSet {
    pub sums: &'static [(&'static str, &'static str)],
    pub count: &'static str,
    pub count_from: Option<&'static str>,
}

pub const SCHOOL_METRICS: MetricSet = MetricSet {
    sums: &[
        (TOTAL_PROFESSORES, SUM_PROFESSORES),
        (TOTAL_MATRICULAS, SUM_MATRICULAS),
        (TOTAL_TURMAS, SUM_TURMAS),
    ],
    count: COUNT_ESCOLAS,
    count_from: None,
};

pub const COURSE_METRICS: MetricSet = MetricSet {
    sums: &[
        (TOTAL_CURSOS, SUM_CURSOS),
        (TOTAL_MATRICULAS_CURSOS, SUM_MATRICULAS_CURSOS),
    ],
    count: COUNT_OFERTAS,
    count_from: None,
};

/// Re-aggregates a school summary table (`municipios`, `dependencia`, `localizacao`).
pub const SCHOOL_SUMMARY_METRICS: MetricSet = MetricSet {
    sums: &[
        (SUM_PROFESSORES, SUM_PROFESSORES),
        (SUM_MATRICULAS, SUM_MATRICULAS),
        (SUM_TURMAS, SUM_TURMAS),
    ],
    count: COUNT_ESCOLAS,
    count_from: Some(COUNT_ESCOLAS),
};

/// Re-aggregates `cursos_municipio`.
pub const COURSE_SUMMARY_METRICS: MetricSet = MetricSet {
    sums: &[
        (SUM_CURSOS, SUM_CURSOS),
        (SUM_MATRICULAS_CURSOS, SUM_MATRICULAS_CURSOS),
    ],
    count: COUNT_OFERTAS,
    count_from: Some(COUNT_OFERTAS),
};

fn require<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Column, AggregateError> {
    df.column(name)
        .map_err(|_| AggregateError::MissingColumn(name.to_string()))
}

fn float_values(df: &DataFrame, name: &str) -> Result<Vec<f64>, AggregateError> {
    let values = require(df, name)?.cast(&DataType::Float64)?;
    let values = values.f64()?;
    Ok(values.into_iter().map(|v| v.unwrap_or(0.0)).collect())
}

fn count_values(df: &DataFrame, metrics: &MetricSet) -> Result<Vec<u32>, AggregateError> {
    match metrics.count_from {
        Some(name) => {
            let values = require(df, name)?.cast(&DataType::UInt32)?;
            let values = values.u32()?;
            Ok(values.into_iter().map(|v| v.unwrap_or(0)).collect())
        }
        None => Ok(vec![1; df.height()]),
    }
}

/// Group label for a raw key value.
///
/// Keys are used verbatim. Null and whitespace-only keys go to the
/// `Não informado` bucket, which also holds any key spelled exactly that way.
fn group_label(value: Option<&str>) -> &str {
    match value {
        Some(v) if !v.trim().is_empty() => v,
        _ => UNKNOWN_GROUP,
    }
}

/// Ordered accumulator: groups keep the order in which they were first seen.
#[derive(Default)]
struct Groups {
    index: HashMap<String, usize>,
    labels: Vec<String>,
}

impl Groups {
    fn slot(&mut self, label: &str) -> usize {
        if let Some(&slot) = self.index.get(label) {
            return slot;
        }
        let slot = self.labels.len();
        self.index.insert(label.to_string(), slot);
        self.labels.push(label.to_string());
        slot
    }
}

/// Handles grouping and ranking of summary tables.
pub struct Aggregator;

impl Aggregator {
    /// One row per distinct key value with summed metrics and a record count.
    ///
    /// Records with a null key land in the `Não informado` bucket, so the
    /// sum of every metric over the output equals the sum over the input.
    /// Feeding a summary table back in with `GroupKey::Column` and the
    /// matching `*_SUMMARY_METRICS` returns the same table.
    pub fn aggregate_by(
        records: &DataFrame,
        key: GroupKey,
        metrics: &MetricSet,
    ) -> Result<DataFrame, AggregateError> {
        let keys = require(records, key.source_column())?.cast(&DataType::String)?;
        let keys = keys.str()?;

        let values = metrics
            .sums
            .iter()
            .map(|(source, _)| float_values(records, source))
            .collect::<Result<Vec<_>, _>>()?;
        let record_counts = count_values(records, metrics)?;

        let mut groups = Groups::default();
        let mut sums: Vec<Vec<f64>> = vec![Vec::new(); metrics.sums.len()];
        let mut counts: Vec<u32> = Vec::new();

        for (row, value) in keys.into_iter().enumerate() {
            let slot = groups.slot(group_label(value));
            if slot == counts.len() {
                counts.push(0);
                sums.iter_mut().for_each(|s| s.push(0.0));
            }
            counts[slot] += record_counts[row];
            for (metric, column) in sums.iter_mut().zip(values.iter()) {
                metric[slot] += column[row];
            }
        }

        debug!(
            key = key.output_column(),
            records = records.height(),
            groups = counts.len(),
            "aggregated records"
        );

        let mut columns = Vec::with_capacity(metrics.sums.len() + 2);
        columns.push(Column::new(key.output_column().into(), groups.labels));
        for ((_, output), metric) in metrics.sums.iter().zip(sums) {
            columns.push(Column::new((*output).into(), metric));
        }
        columns.push(Column::new(metrics.count.into(), counts));

        Ok(DataFrame::new(columns)?)
    }

    /// The `n` rows with the largest `metric`, ties kept in original order.
    pub fn top_n(table: &DataFrame, metric: &str, n: usize) -> Result<DataFrame, AggregateError> {
        require(table, metric)?;

        let sorted = table
            .clone()
            .lazy()
            .sort_by_exprs(
                [col(metric)],
                SortMultipleOptions::default()
                    .with_order_descending(true)
                    .with_nulls_last(true)
                    .with_maintain_order(true),
            )
            .collect()?;

        Ok(sorted.head(Some(n)))
    }

    /// Count occurrences of each value and keep the `n` most frequent.
    ///
    /// Ties keep first-seen order; null and blank values are not counted.
    pub fn rank_by_frequency<'a, I>(values: I, n: usize) -> Vec<(String, u32)>
    where
        I: IntoIterator<Item = Option<&'a str>>,
    {
        let mut groups = Groups::default();
        let mut counts: Vec<u32> = Vec::new();

        for value in values.into_iter().flatten() {
            if value.trim().is_empty() {
                continue;
            }
            let slot = groups.slot(value);
            if slot == counts.len() {
                counts.push(0);
            }
            counts[slot] += 1;
        }

        let mut ranked: Vec<(String, u32)> = groups.labels.into_iter().zip(counts).collect();
        // sort_by is stable, so equal counts stay in first-seen order
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked.truncate(n);
        ranked
    }

    /// `rank_by_frequency` over one column, as a two-column table.
    pub fn frequency_table(
        records: &DataFrame,
        column: &str,
        label_column: &str,
        count_column: &str,
        n: usize,
    ) -> Result<DataFrame, AggregateError> {
        let values = require(records, column)?.cast(&DataType::String)?;
        let ranked = Self::rank_by_frequency(values.str()?.into_iter(), n);

        let (labels, counts): (Vec<String>, Vec<u32>) = ranked.into_iter().unzip();
        Ok(DataFrame::new(vec![
            Column::new(label_column.into(), labels),
            Column::new(count_column.into(), counts),
        ])?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::processor::RecordProcessor;
    use crate::data::schema::{CURSO, OFERTAS, TP_DEPENDENCIA, TP_LOCALIZACAO};

    fn floats(df: &DataFrame, name: &str) -> Vec<f64> {
        df.column(name)
            .unwrap()
            .cast(&DataType::Float64)
            .unwrap()
            .f64()
            .unwrap()
            .into_iter()
            .map(|v| v.unwrap_or(f64::NAN))
            .collect()
    }

    fn strings(df: &DataFrame, name: &str) -> Vec<String> {
        df.column(name)
            .unwrap()
            .str()
            .unwrap()
            .into_iter()
            .map(|v| v.unwrap_or_default().to_string())
            .collect()
    }

    fn row_of(df: &DataFrame, key_column: &str, key: &str) -> usize {
        strings(df, key_column)
            .iter()
            .position(|k| k == key)
            .unwrap_or_else(|| panic!("no row for {key}"))
    }

    /// Three schools: two in Vitória (state, municipal), one in Serra (state).
    fn scenario_records() -> DataFrame {
        let raw = DataFrame::new(vec![
            Column::new(NO_MUNICIPIO.into(), vec!["Vitória", "Vitória", "Serra"]),
            Column::new(TP_DEPENDENCIA.into(), vec![2i64, 3, 2]),
            Column::new(TP_LOCALIZACAO.into(), vec![1i64, 1, 2]),
            Column::new("QT_DOC_BAS".into(), vec![Some(10i64), None, Some(3)]),
            Column::new("QT_DOC_MED".into(), vec![5i64, 8, 0]),
        ])
        .unwrap();
        RecordProcessor::process_schools(&raw).unwrap()
    }

    #[test]
    fn municipality_scenario_matches_hand_totals() {
        let table =
            Aggregator::aggregate_by(&scenario_records(), GroupKey::Municipality, &SCHOOL_METRICS)
                .unwrap();
        assert_eq!(table.height(), 2);

        let teachers = floats(&table, SUM_PROFESSORES);
        let schools = floats(&table, COUNT_ESCOLAS);
        let vitoria = row_of(&table, MUNICIPIO, "Vitória");
        let serra = row_of(&table, MUNICIPIO, "Serra");
        assert_eq!((teachers[vitoria], schools[vitoria]), (23.0, 2.0));
        assert_eq!((teachers[serra], schools[serra]), (3.0, 1.0));
    }

    #[test]
    fn dependency_scenario_matches_hand_totals() {
        let table =
            Aggregator::aggregate_by(&scenario_records(), GroupKey::Dependency, &SCHOOL_METRICS)
                .unwrap();
        let teachers = floats(&table, SUM_PROFESSORES);
        // Vitória (10 + 5) and Serra (3 + 0) are both state schools
        assert_eq!(teachers[row_of(&table, DEPENDENCIA_KEY, "Estadual")], 18.0);
        assert_eq!(teachers[row_of(&table, DEPENDENCIA_KEY, "Municipal")], 8.0);
    }

    #[test]
    fn null_keys_go_to_unknown_bucket() {
        let raw = DataFrame::new(vec![
            Column::new(NO_MUNICIPIO.into(), vec!["Serra", "Serra"]),
            Column::new(TP_DEPENDENCIA.into(), vec![2i64, 9]),
            Column::new(TP_LOCALIZACAO.into(), vec![1i64, 1]),
            Column::new("QT_DOC_BAS".into(), vec![4i64, 6]),
        ])
        .unwrap();
        let records = RecordProcessor::process_schools(&raw).unwrap();
        let table = Aggregator::aggregate_by(&records, GroupKey::Dependency, &SCHOOL_METRICS).unwrap();

        assert_eq!(strings(&table, DEPENDENCIA_KEY), vec!["Estadual", UNKNOWN_GROUP]);
        assert_eq!(floats(&table, SUM_PROFESSORES), vec![4.0, 6.0]);
    }

    #[test]
    fn metric_sums_reconcile_with_records() {
        let records = scenario_records();
        let record_total: f64 = floats(&records, TOTAL_PROFESSORES).iter().sum();

        for key in [GroupKey::Municipality, GroupKey::Dependency, GroupKey::Location] {
            let table = Aggregator::aggregate_by(&records, key, &SCHOOL_METRICS).unwrap();
            let table_total: f64 = floats(&table, SUM_PROFESSORES).iter().sum();
            let table_count: f64 = floats(&table, COUNT_ESCOLAS).iter().sum();
            assert_eq!(table_total, record_total);
            assert_eq!(table_count, records.height() as f64);
        }
    }

    #[test]
    fn reaggregating_a_summary_returns_it_unchanged() {
        let records = scenario_records();
        let summaries = [
            (GroupKey::Municipality, MUNICIPIO),
            (GroupKey::Dependency, DEPENDENCIA_KEY),
            (GroupKey::Location, LOCALIZACAO_KEY),
        ];
        for (key, output) in summaries {
            let table = Aggregator::aggregate_by(&records, key, &SCHOOL_METRICS).unwrap();
            let again =
                Aggregator::aggregate_by(&table, GroupKey::Column(output), &SCHOOL_SUMMARY_METRICS)
                    .unwrap();
            assert!(again.equals(&table), "{output} changed on re-aggregation");
        }
    }

    #[test]
    fn course_summary_reaggregates_offer_counts() {
        let raw = DataFrame::new(vec![
            Column::new(NO_MUNICIPIO.into(), vec!["Serra", "Vitória", "Serra"]),
            Column::new("NO_CURSO_EDUC_PROFISSIONAL".into(), vec!["A", "B", "C"]),
            Column::new("QT_CURSO_TEC".into(), vec![2i64, 1, 1]),
            Column::new("QT_MAT_CURSO_TEC".into(), vec![60i64, 40, 30]),
        ])
        .unwrap();
        let records = RecordProcessor::process_courses(&raw).unwrap();
        let table = Aggregator::aggregate_by(&records, GroupKey::Municipality, &COURSE_METRICS).unwrap();
        assert_eq!(floats(&table, COUNT_OFERTAS), vec![2.0, 1.0]);

        let again =
            Aggregator::aggregate_by(&table, GroupKey::Column(MUNICIPIO), &COURSE_SUMMARY_METRICS)
                .unwrap();
        assert!(again.equals(&table));
    }

    #[test]
    fn missing_count_column_is_reported() {
        let table = DataFrame::new(vec![
            Column::new(MUNICIPIO.into(), vec!["Serra"]),
            Column::new(SUM_PROFESSORES.into(), vec![1.0]),
            Column::new(SUM_MATRICULAS.into(), vec![1.0]),
            Column::new(SUM_TURMAS.into(), vec![1.0]),
        ])
        .unwrap();
        let err = Aggregator::aggregate_by(&table, GroupKey::Column(MUNICIPIO), &SCHOOL_SUMMARY_METRICS)
            .unwrap_err();
        assert!(matches!(err, AggregateError::MissingColumn(ref c) if c == COUNT_ESCOLAS));
    }

    #[test]
    fn keys_are_grouped_verbatim() {
        let raw = DataFrame::new(vec![
            Column::new(
                NO_MUNICIPIO.into(),
                vec![Some("Serra"), Some(" Serra"), Some("Serra"), Some("   "), None],
            ),
            Column::new(TP_DEPENDENCIA.into(), vec![2i64, 2, 2, 2, 2]),
            Column::new(TP_LOCALIZACAO.into(), vec![1i64, 1, 1, 1, 1]),
            Column::new("QT_DOC_BAS".into(), vec![1i64, 2, 3, 4, 5]),
        ])
        .unwrap();
        let records = RecordProcessor::process_schools(&raw).unwrap();
        let table = Aggregator::aggregate_by(&records, GroupKey::Municipality, &SCHOOL_METRICS).unwrap();

        assert_eq!(strings(&table, MUNICIPIO), vec!["Serra", " Serra", UNKNOWN_GROUP]);
        assert_eq!(floats(&table, SUM_PROFESSORES), vec![4.0, 2.0, 9.0]);
        assert_eq!(floats(&table, COUNT_ESCOLAS), vec![2.0, 1.0, 2.0]);
    }

    #[test]
    fn missing_key_column_is_reported() {
        let df = DataFrame::new(vec![Column::new("x".into(), vec![1i64])]).unwrap();
        let err = Aggregator::aggregate_by(&df, GroupKey::Location, &SCHOOL_METRICS).unwrap_err();
        assert!(matches!(err, AggregateError::MissingColumn(ref c) if c == LOCALIZACAO));
    }

    #[test]
    fn top_n_beyond_row_count_returns_everything_sorted() {
        let table = DataFrame::new(vec![
            Column::new(MUNICIPIO.into(), vec!["A", "B", "C", "D"]),
            Column::new(SUM_PROFESSORES.into(), vec![5.0, 9.0, 5.0, 1.0]),
        ])
        .unwrap();

        let top = Aggregator::top_n(&table, SUM_PROFESSORES, 10).unwrap();
        assert_eq!(strings(&top, MUNICIPIO), vec!["B", "A", "C", "D"]);

        let top2 = Aggregator::top_n(&table, SUM_PROFESSORES, 2).unwrap();
        assert_eq!(strings(&top2, MUNICIPIO), vec!["B", "A"]);
    }

    #[test]
    fn top_n_is_deterministic() {
        let table = DataFrame::new(vec![
            Column::new(MUNICIPIO.into(), vec!["A", "B", "C"]),
            Column::new(SUM_PROFESSORES.into(), vec![2.0, 2.0, 2.0]),
        ])
        .unwrap();
        for _ in 0..5 {
            let top = Aggregator::top_n(&table, SUM_PROFESSORES, 3).unwrap();
            assert_eq!(strings(&top, MUNICIPIO), vec!["A", "B", "C"]);
        }
    }

    #[test]
    fn rank_by_frequency_breaks_ties_by_first_seen() {
        let values = [
            Some("Enfermagem"),
            Some("Informática"),
            None,
            Some("Informática"),
            Some("Administração"),
            Some("Enfermagem"),
            Some("  "),
            Some("Logística"),
        ];
        let ranked = Aggregator::rank_by_frequency(values, 3);
        assert_eq!(
            ranked,
            vec![
                ("Enfermagem".to_string(), 2),
                ("Informática".to_string(), 2),
                ("Administração".to_string(), 1),
            ]
        );
    }

    #[test]
    fn frequency_table_has_label_and_count_columns() {
        let records = DataFrame::new(vec![Column::new(
            "NO_CURSO_EDUC_PROFISSIONAL".into(),
            vec!["Química", "Química", "Eletrotécnica"],
        )])
        .unwrap();
        let table = Aggregator::frequency_table(
            &records,
            "NO_CURSO_EDUC_PROFISSIONAL",
            CURSO,
            OFERTAS,
            15,
        )
        .unwrap();
        assert_eq!(strings(&table, CURSO), vec!["Química", "Eletrotécnica"]);
        assert_eq!(floats(&table, OFERTAS), vec![2.0, 1.0]);
    }
}
