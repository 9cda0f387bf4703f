//! Record Processor Module
//! Derives categorical labels and per-record metric totals from raw census rows.

use polars::prelude::*;
use thiserror::Error;
use tracing::{debug, warn};

use crate::data::schema::{
    CLASS_PREFIX, COURSE_ENROLLMENT_PREFIX, COURSE_PREFIX, DEPENDENCIA, ENROLLMENT_PREFIX,
    LOCALIZACAO, TEACHER_PREFIX, TOTAL_CURSOS, TOTAL_MATRICULAS, TOTAL_MATRICULAS_CURSOS,
    TOTAL_PROFESSORES, TOTAL_TURMAS, TP_DEPENDENCIA, TP_LOCALIZACAO,
};

#[derive(Error, Debug)]
pub enum ProcessorError {
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
}

/// Administrative dependency codes (TP_DEPENDENCIA).
const DEPENDENCY_LABELS: [(i64, &str); 4] = [
    (1, "Federal"),
    (2, "Estadual"),
    (3, "Municipal"),
    (4, "Privada"),
];

/// Location codes (TP_LOCALIZACAO).
const LOCATION_LABELS: [(i64, &str); 2] = [(1, "Urbana"), (2, "Rural")];

fn lookup(table: &[(i64, &'static str)], code: Option<i64>) -> Option<&'static str> {
    let code = code?;
    table
        .iter()
        .find(|(known, _)| *known == code)
        .map(|(_, label)| *label)
}

/// Enriches raw records. Output has the same rows as the input, in order,
/// with every raw column kept.
pub struct RecordProcessor;

impl RecordProcessor {
    /// Label for a dependency code; codes outside the table have no label.
    pub fn label_dependency(code: Option<i64>) -> Option<&'static str> {
        lookup(&DEPENDENCY_LABELS, code)
    }

    /// Label for a location code; codes outside the table have no label.
    pub fn label_location(code: Option<i64>) -> Option<&'static str> {
        lookup(&LOCATION_LABELS, code)
    }

    /// Names of all columns starting with `prefix`, in frame order.
    pub fn matching_columns(records: &DataFrame, prefix: &str) -> Vec<String> {
        records
            .get_column_names()
            .iter()
            .filter(|name| name.starts_with(prefix))
            .map(|name| name.to_string())
            .collect()
    }

    /// Per-record sum of every column whose name starts with `prefix`.
    ///
    /// Null, non-numeric, NaN and negative cells count as zero, so totals are
    /// never negative. A frame without any matching column yields all zeros.
    pub fn compute_total(records: &DataFrame, prefix: &str) -> Result<Vec<f64>, ProcessorError> {
        let mut totals = vec![0.0; records.height()];
        let columns = Self::matching_columns(records, prefix);

        if columns.is_empty() {
            warn!(prefix, "no columns match metric prefix; totals will be zero");
            return Ok(totals);
        }

        for name in &columns {
            let values = records.column(name)?.cast(&DataType::Float64)?;
            let values = values.f64()?;
            for (total, value) in totals.iter_mut().zip(values.into_iter()) {
                if let Some(v) = value {
                    if v.is_finite() && v > 0.0 {
                        *total += v;
                    }
                }
            }
        }

        debug!(prefix, columns = columns.len(), "computed totals");
        Ok(totals)
    }

    fn codes(records: &DataFrame, column: &str) -> Result<Vec<Option<i64>>, ProcessorError> {
        let codes = records.column(column)?.cast(&DataType::Int64)?;
        Ok(codes.i64()?.into_iter().collect())
    }

    fn labels(
        codes: &[Option<i64>],
        label: fn(Option<i64>) -> Option<&'static str>,
    ) -> Vec<Option<&'static str>> {
        codes.iter().map(|code| label(*code)).collect()
    }

    /// Add dependency/location labels and teacher, enrollment and class totals.
    pub fn process_schools(raw: &DataFrame) -> Result<DataFrame, ProcessorError> {
        let dependency = Self::labels(&Self::codes(raw, TP_DEPENDENCIA)?, Self::label_dependency);
        let location = Self::labels(&Self::codes(raw, TP_LOCALIZACAO)?, Self::label_location);

        let unlabeled = dependency.iter().filter(|l| l.is_none()).count();
        if unlabeled > 0 {
            debug!(unlabeled, "records with unmapped dependency code");
        }

        let mut df = raw.clone();
        df.with_column(Column::new(DEPENDENCIA.into(), dependency))?;
        df.with_column(Column::new(LOCALIZACAO.into(), location))?;
        df.with_column(Column::new(
            TOTAL_PROFESSORES.into(),
            Self::compute_total(raw, TEACHER_PREFIX)?,
        ))?;
        df.with_column(Column::new(
            TOTAL_MATRICULAS.into(),
            Self::compute_total(raw, ENROLLMENT_PREFIX)?,
        ))?;
        df.with_column(Column::new(
            TOTAL_TURMAS.into(),
            Self::compute_total(raw, CLASS_PREFIX)?,
        ))?;
        Ok(df)
    }

    /// Add course-count and course-enrollment totals.
    pub fn process_courses(raw: &DataFrame) -> Result<DataFrame, ProcessorError> {
        let mut df = raw.clone();
        df.with_column(Column::new(
            TOTAL_CURSOS.into(),
            Self::compute_total(raw, COURSE_PREFIX)?,
        ))?;
        df.with_column(Column::new(
            TOTAL_MATRICULAS_CURSOS.into(),
            Self::compute_total(raw, COURSE_ENROLLMENT_PREFIX)?,
        ))?;
        Ok(df)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::schema::NO_MUNICIPIO;

    fn sample_schools() -> DataFrame {
        DataFrame::new(vec![
            Column::new(NO_MUNICIPIO.into(), vec!["Vitória", "Vitória", "Serra"]),
            Column::new(TP_DEPENDENCIA.into(), vec![2i64, 3, 9]),
            Column::new(TP_LOCALIZACAO.into(), vec![Some(1i64), Some(2), None]),
            Column::new("QT_DOC_BAS".into(), vec![Some(10i64), None, Some(3)]),
            Column::new("QT_DOC_MED".into(), vec![5i64, 8, 0]),
            Column::new("QT_MAT_BAS".into(), vec![100.0, -1.0, f64::NAN]),
        ])
        .unwrap()
    }

    #[test]
    fn dependency_codes_map_to_fixed_labels() {
        assert_eq!(RecordProcessor::label_dependency(Some(1)), Some("Federal"));
        assert_eq!(RecordProcessor::label_dependency(Some(2)), Some("Estadual"));
        assert_eq!(RecordProcessor::label_dependency(Some(3)), Some("Municipal"));
        assert_eq!(RecordProcessor::label_dependency(Some(4)), Some("Privada"));
        assert_eq!(RecordProcessor::label_dependency(Some(9)), None);
        assert_eq!(RecordProcessor::label_dependency(None), None);
    }

    #[test]
    fn location_codes_map_to_fixed_labels() {
        assert_eq!(RecordProcessor::label_location(Some(1)), Some("Urbana"));
        assert_eq!(RecordProcessor::label_location(Some(2)), Some("Rural"));
        assert_eq!(RecordProcessor::label_location(Some(0)), None);
    }

    #[test]
    fn totals_treat_nulls_as_zero() {
        let totals = RecordProcessor::compute_total(&sample_schools(), TEACHER_PREFIX).unwrap();
        assert_eq!(totals, vec![15.0, 8.0, 3.0]);
    }

    #[test]
    fn totals_never_go_negative() {
        let totals = RecordProcessor::compute_total(&sample_schools(), ENROLLMENT_PREFIX).unwrap();
        assert_eq!(totals, vec![100.0, 0.0, 0.0]);
        assert!(totals.iter().all(|t| *t >= 0.0));
    }

    #[test]
    fn missing_prefix_family_yields_zero_totals() {
        let totals = RecordProcessor::compute_total(&sample_schools(), CLASS_PREFIX).unwrap();
        assert_eq!(totals, vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn process_schools_keeps_rows_and_adds_columns() {
        let raw = sample_schools();
        let processed = RecordProcessor::process_schools(&raw).unwrap();

        assert_eq!(processed.height(), raw.height());
        assert_eq!(processed.width(), raw.width() + 5);

        let dependency = processed.column(DEPENDENCIA).unwrap().str().unwrap();
        assert_eq!(dependency.get(0), Some("Estadual"));
        assert_eq!(dependency.get(1), Some("Municipal"));
        assert_eq!(dependency.get(2), None);

        let location = processed.column(LOCALIZACAO).unwrap().str().unwrap();
        assert_eq!(location.get(2), None);

        let classes = processed.column(TOTAL_TURMAS).unwrap().f64().unwrap();
        assert_eq!(classes.get(0), Some(0.0));
    }

    #[test]
    fn course_totals_use_course_prefixes() {
        let raw = DataFrame::new(vec![
            Column::new("QT_CURSO_TEC".into(), vec![1i64, 2]),
            Column::new("QT_MAT_CURSO_TEC".into(), vec![Some(30i64), None]),
        ])
        .unwrap();
        let processed = RecordProcessor::process_courses(&raw).unwrap();

        let courses = processed.column(TOTAL_CURSOS).unwrap().f64().unwrap();
        assert_eq!(courses.get(1), Some(2.0));
        let enrollment = processed.column(TOTAL_MATRICULAS_CURSOS).unwrap().f64().unwrap();
        assert_eq!(enrollment.get(0), Some(30.0));
        assert_eq!(enrollment.get(1), Some(0.0));
    }
}
