//! Census pipeline: load -> process -> aggregate, producing every named table.

use polars::prelude::*;
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

use crate::config::PipelineConfig;
use crate::data::schema::{
    self, TableName, COURSE_REQUIRED, CO_UF, CURSO, NO_CURSO, OFERTAS, SCHOOL_REQUIRED,
};
use crate::data::{
    apply_operations, DataLoader, Filter, FilterOperator, Operation, PipelineError,
    RecordProcessor,
};
use crate::export::{write_table, ExportFormat};
use crate::stats::{Aggregator, GroupKey, COURSE_METRICS, SCHOOL_METRICS};

pub type Tables = HashMap<TableName, DataFrame>;

/// Produces the full set of named tables.
pub trait TablePipeline: Send + Sync {
    fn run(&self) -> Result<Tables, PipelineError>;
}

/// Real-data pipeline over the two INEP extracts.
pub struct CensusPipeline {
    config: PipelineConfig,
}

impl CensusPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    fn load(&self, loader: &DataLoader, path: &Path, required: &[&str], table: TableName)
        -> Result<DataFrame, PipelineError>
    {
        let mut df = loader.load(path)?;
        let df = match self.config.state_code {
            Some(code) => {
                schema::validate_columns(&df, &[CO_UF], table.as_str())?;
                // header-only or quoted files read CO_UF as text
                let state = df.column(CO_UF)?.cast(&DataType::Int64)?;
                df.with_column(state)?;
                let filter = Operation::Filter(Filter::new(CO_UF, FilterOperator::Eq, code));
                apply_operations(&df, &[filter])?
            }
            None => df,
        };
        schema::validate_columns(&df, required, table.as_str())?;
        info!(table = %table, rows = df.height(), "source rows after state filter");
        Ok(df)
    }

    /// Persist the filtered extracts; failures are logged only.
    fn persist(&self, schools: &DataFrame, courses: &DataFrame) {
        let Some(dir) = &self.config.export_dir else {
            return;
        };
        let suffix = self
            .config
            .state_code
            .map(|code| code.to_string())
            .unwrap_or_else(|| "br".to_string());

        for (stem, df) in [("escolas", schools), ("cursos_tecnicos", courses)] {
            let path = dir.join(format!("{stem}_{suffix}.csv"));
            if let Err(e) = write_table(df, &path, ExportFormat::Csv) {
                warn!(path = %path.display(), error = %e, "could not persist filtered extract");
            }
        }
    }
}

impl TablePipeline for CensusPipeline {
    fn run(&self) -> Result<Tables, PipelineError> {
        let loader = DataLoader::new(self.config.source_format()?);

        let schools = self.load(
            &loader,
            &self.config.schools_path,
            SCHOOL_REQUIRED,
            TableName::Escolas,
        )?;
        let courses = self.load(
            &loader,
            &self.config.courses_path,
            COURSE_REQUIRED,
            TableName::CursosTecnicos,
        )?;
        self.persist(&schools, &courses);

        let schools = RecordProcessor::process_schools(&schools)?;
        let courses = RecordProcessor::process_courses(&courses)?;

        assemble_tables(&schools, &courses, self.config.top_courses)
    }
}

/// Build every named table from processed school and course records.
///
/// Both the census path and the fallback dataset go through here, so they
/// share one schema per table name.
pub fn assemble_tables(
    schools: &DataFrame,
    courses: &DataFrame,
    top_courses: usize,
) -> Result<Tables, PipelineError> {
    let mut tables = Tables::new();

    tables.insert(TableName::Escolas, schema::conform(schools, TableName::Escolas)?);
    tables.insert(
        TableName::CursosTecnicos,
        schema::conform(courses, TableName::CursosTecnicos)?,
    );

    let summaries = [
        (TableName::Municipios, schools, GroupKey::Municipality, &SCHOOL_METRICS),
        (TableName::Dependencia, schools, GroupKey::Dependency, &SCHOOL_METRICS),
        (TableName::Localizacao, schools, GroupKey::Location, &SCHOOL_METRICS),
        (TableName::CursosMunicipio, courses, GroupKey::Municipality, &COURSE_METRICS),
    ];
    for (name, records, key, metrics) in summaries {
        let table = Aggregator::aggregate_by(records, key, metrics)?;
        tables.insert(name, schema::conform(&table, name)?);
    }

    let top = Aggregator::frequency_table(courses, NO_CURSO, CURSO, OFERTAS, top_courses)?;
    tables.insert(TableName::TopCursos, schema::conform(&top, TableName::TopCursos)?);

    info!(
        schools = schools.height(),
        courses = courses.height(),
        tables = tables.len(),
        "assembled tables"
    );
    Ok(tables)
}
