//! Census schema: column names, metric prefixes and the canonical tables.

use polars::prelude::*;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::data::error::PipelineError;

// Source columns
pub const CO_UF: &str = "CO_UF";
pub const CO_ENTIDADE: &str = "CO_ENTIDADE";
pub const NO_MUNICIPIO: &str = "NO_MUNICIPIO";
pub const TP_DEPENDENCIA: &str = "TP_DEPENDENCIA";
pub const TP_LOCALIZACAO: &str = "TP_LOCALIZACAO";
pub const NO_CURSO: &str = "NO_CURSO_EDUC_PROFISSIONAL";

// Metric prefix families
pub const TEACHER_PREFIX: &str = "QT_DOC";
pub const ENROLLMENT_PREFIX: &str = "QT_MAT";
pub const CLASS_PREFIX: &str = "QT_TUR";
pub const COURSE_PREFIX: &str = "QT_CURSO_TEC";
pub const COURSE_ENROLLMENT_PREFIX: &str = "QT_MAT_CURSO_TEC";

// Derived record columns
pub const DEPENDENCIA: &str = "DEPENDENCIA";
pub const LOCALIZACAO: &str = "LOCALIZACAO";
pub const TOTAL_PROFESSORES: &str = "TOTAL_PROFESSORES";
pub const TOTAL_MATRICULAS: &str = "TOTAL_MATRICULAS";
pub const TOTAL_TURMAS: &str = "TOTAL_TURMAS";
pub const TOTAL_CURSOS: &str = "TOTAL_CURSOS";
pub const TOTAL_MATRICULAS_CURSOS: &str = "TOTAL_MATRICULAS_CURSOS";

// Aggregate columns
pub const MUNICIPIO: &str = "Municipio";
pub const DEPENDENCIA_KEY: &str = "Dependencia";
pub const LOCALIZACAO_KEY: &str = "Localizacao";
pub const CURSO: &str = "Curso";
pub const SUM_PROFESSORES: &str = "Total_Professores";
pub const SUM_MATRICULAS: &str = "Total_Matriculas";
pub const SUM_TURMAS: &str = "Total_Turmas";
pub const COUNT_ESCOLAS: &str = "Total_Escolas";
pub const SUM_CURSOS: &str = "Total_Cursos";
pub const SUM_MATRICULAS_CURSOS: &str = "Total_Matriculas_Cursos";
pub const COUNT_OFERTAS: &str = "Total_Ofertas";
pub const OFERTAS: &str = "Ofertas";

/// Bucket for records whose group key is null or blank.
pub const UNKNOWN_GROUP: &str = "Não informado";

/// Columns a school extract must carry.
pub const SCHOOL_REQUIRED: &[&str] = &[CO_ENTIDADE, NO_MUNICIPIO, TP_DEPENDENCIA, TP_LOCALIZACAO];
/// Columns a technical-course extract must carry.
pub const COURSE_REQUIRED: &[&str] = &[CO_ENTIDADE, NO_MUNICIPIO, NO_CURSO];

/// Logical column type used by the canonical table schemas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Int,
    Float,
    Text,
    Count,
}

impl ColumnKind {
    pub fn dtype(self) -> DataType {
        match self {
            ColumnKind::Int => DataType::Int64,
            ColumnKind::Float => DataType::Float64,
            ColumnKind::Text => DataType::String,
            ColumnKind::Count => DataType::UInt32,
        }
    }
}

type TableSchema = &'static [(&'static str, ColumnKind)];

const ESCOLAS_SCHEMA: TableSchema = &[
    (CO_ENTIDADE, ColumnKind::Int),
    (NO_MUNICIPIO, ColumnKind::Text),
    (TP_DEPENDENCIA, ColumnKind::Int),
    (TP_LOCALIZACAO, ColumnKind::Int),
    (DEPENDENCIA, ColumnKind::Text),
    (LOCALIZACAO, ColumnKind::Text),
    (TOTAL_PROFESSORES, ColumnKind::Float),
    (TOTAL_MATRICULAS, ColumnKind::Float),
    (TOTAL_TURMAS, ColumnKind::Float),
];

const CURSOS_SCHEMA: TableSchema = &[
    (CO_ENTIDADE, ColumnKind::Int),
    (NO_MUNICIPIO, ColumnKind::Text),
    (NO_CURSO, ColumnKind::Text),
    (TOTAL_CURSOS, ColumnKind::Float),
    (TOTAL_MATRICULAS_CURSOS, ColumnKind::Float),
];

const MUNICIPIOS_SCHEMA: TableSchema = &[
    (MUNICIPIO, ColumnKind::Text),
    (SUM_PROFESSORES, ColumnKind::Float),
    (SUM_MATRICULAS, ColumnKind::Float),
    (SUM_TURMAS, ColumnKind::Float),
    (COUNT_ESCOLAS, ColumnKind::Count),
];

const DEPENDENCIA_SCHEMA: TableSchema = &[
    (DEPENDENCIA_KEY, ColumnKind::Text),
    (SUM_PROFESSORES, ColumnKind::Float),
    (SUM_MATRICULAS, ColumnKind::Float),
    (SUM_TURMAS, ColumnKind::Float),
    (COUNT_ESCOLAS, ColumnKind::Count),
];

const LOCALIZACAO_SCHEMA: TableSchema = &[
    (LOCALIZACAO_KEY, ColumnKind::Text),
    (SUM_PROFESSORES, ColumnKind::Float),
    (SUM_MATRICULAS, ColumnKind::Float),
    (SUM_TURMAS, ColumnKind::Float),
    (COUNT_ESCOLAS, ColumnKind::Count),
];

const CURSOS_MUNICIPIO_SCHEMA: TableSchema = &[
    (MUNICIPIO, ColumnKind::Text),
    (SUM_CURSOS, ColumnKind::Float),
    (SUM_MATRICULAS_CURSOS, ColumnKind::Float),
    (COUNT_OFERTAS, ColumnKind::Count),
];

const TOP_CURSOS_SCHEMA: TableSchema = &[(CURSO, ColumnKind::Text), (OFERTAS, ColumnKind::Count)];

/// Every table the cache serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum TableName {
    Escolas,
    CursosTecnicos,
    Municipios,
    Dependencia,
    Localizacao,
    CursosMunicipio,
    TopCursos,
}

impl TableName {
    pub const ALL: [TableName; 7] = [
        TableName::Escolas,
        TableName::CursosTecnicos,
        TableName::Municipios,
        TableName::Dependencia,
        TableName::Localizacao,
        TableName::CursosMunicipio,
        TableName::TopCursos,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TableName::Escolas => "escolas",
            TableName::CursosTecnicos => "cursos_tecnicos",
            TableName::Municipios => "municipios",
            TableName::Dependencia => "dependencia",
            TableName::Localizacao => "localizacao",
            TableName::CursosMunicipio => "cursos_municipio",
            TableName::TopCursos => "top_cursos",
        }
    }

    /// Canonical column names and types, in order.
    pub fn schema(self) -> TableSchema {
        match self {
            TableName::Escolas => ESCOLAS_SCHEMA,
            TableName::CursosTecnicos => CURSOS_SCHEMA,
            TableName::Municipios => MUNICIPIOS_SCHEMA,
            TableName::Dependencia => DEPENDENCIA_SCHEMA,
            TableName::Localizacao => LOCALIZACAO_SCHEMA,
            TableName::CursosMunicipio => CURSOS_MUNICIPIO_SCHEMA,
            TableName::TopCursos => TOP_CURSOS_SCHEMA,
        }
    }

    pub fn column_names(self) -> Vec<&'static str> {
        self.schema().iter().map(|(name, _)| *name).collect()
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TableName {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TableName::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| PipelineError::UnknownTableName(s.to_string()))
    }
}

/// Column names of a DataFrame as owned strings.
pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Fail with `SchemaMismatch` when any required column is absent.
pub fn validate_columns(df: &DataFrame, required: &[&str], table: &str) -> Result<(), PipelineError> {
    let present = column_names(df);
    let missing: Vec<&str> = required
        .iter()
        .copied()
        .filter(|name| !present.iter().any(|p| p == name))
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(PipelineError::schema(
            table,
            format!("missing columns {}", missing.join(", ")),
        ))
    }
}

/// Project and cast `df` onto the canonical schema of `table`.
pub fn conform(df: &DataFrame, table: TableName) -> Result<DataFrame, PipelineError> {
    validate_columns(df, &table.column_names(), table.as_str())?;

    let columns = table
        .schema()
        .iter()
        .map(|(name, kind)| df.column(name)?.cast(&kind.dtype()))
        .collect::<PolarsResult<Vec<Column>>>()?;

    Ok(DataFrame::new(columns)?)
}

/// True when `df` has exactly the canonical column names and types of `table`.
pub fn matches_schema(df: &DataFrame, table: TableName) -> bool {
    let schema = table.schema();
    df.width() == schema.len()
        && df
            .get_columns()
            .iter()
            .zip(schema.iter())
            .all(|(col, (name, kind))| col.name().as_str() == *name && col.dtype() == &kind.dtype())
}

/// A zero-row table with the canonical columns of `table`.
pub fn empty_table(table: TableName) -> DataFrame {
    let schema: Schema = table
        .schema()
        .iter()
        .map(|(name, kind)| (PlSmallStr::from(*name), kind.dtype()))
        .collect();
    DataFrame::empty_with_schema(&schema)
}
