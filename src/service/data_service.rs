//! Data Service Module
//! Read interface over the table cache, used by the dashboard pages.

use polars::prelude::*;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use crate::data::{apply_operations, Filter, Operation, OperationError, PipelineError, TableName};
use crate::export::{write_table, ExportError, ExportFormat};
use crate::service::cache::{DataOrigin, TableCache};
use crate::stats::{ColumnStats, GroupSummary, QualityReport, StatsCalculator, TableInfo};

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error("Operation failed: {0}")]
    Operation(#[from] OperationError),
    #[error("Export failed: {0}")]
    Export(#[from] ExportError),
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
}

/// Summary statistics, either over the whole table or per group.
#[derive(Debug, Clone)]
pub enum SummaryStatistics {
    Table(Vec<ColumnStats>),
    Grouped(Vec<GroupSummary>),
}

#[derive(Clone)]
pub struct DataService {
    cache: Arc<TableCache>,
}

impl DataService {
    pub fn new(cache: Arc<TableCache>) -> Self {
        Self { cache }
    }

    pub fn origin(&self) -> &DataOrigin {
        self.cache.origin()
    }

    fn table(&self, name: &str) -> Result<DataFrame, ServiceError> {
        self.cache
            .get_table(name)
            .ok_or_else(|| PipelineError::UnknownTableName(name.to_string()).into())
    }

    /// The named table, or `None` for an unknown name.
    pub fn get_data(&self, name: &str) -> Option<DataFrame> {
        self.cache.get_table(name)
    }

    /// The named table with every filter applied in order.
    pub fn get_filtered_data(&self, name: &str, filters: &[Filter]) -> Result<DataFrame, ServiceError> {
        let operations: Vec<Operation> = filters.iter().cloned().map(Operation::Filter).collect();
        self.create_derived_dataset(name, &operations)
    }

    /// Apply an operation list to a copy of the named table.
    pub fn create_derived_dataset(
        &self,
        name: &str,
        operations: &[Operation],
    ) -> Result<DataFrame, ServiceError> {
        let df = self.table(name)?;
        let derived = apply_operations(&df, operations)?;
        info!(
            table = name,
            operations = operations.len(),
            rows = derived.height(),
            "derived dataset"
        );
        Ok(derived)
    }

    pub fn get_summary_statistics(
        &self,
        name: &str,
        group_by: Option<&str>,
    ) -> Result<SummaryStatistics, ServiceError> {
        let df = self.table(name)?;
        Ok(match group_by {
            Some(column) => SummaryStatistics::Grouped(StatsCalculator::describe_by(&df, column)?),
            None => SummaryStatistics::Table(StatsCalculator::describe(&df)?),
        })
    }

    /// Shape of every cached table, in `TableName::ALL` order.
    pub fn get_data_info(&self) -> Vec<TableInfo> {
        let tables = self.cache.tables();
        TableName::ALL
            .iter()
            .filter_map(|name| {
                tables
                    .get(name)
                    .map(|df| StatsCalculator::table_info(name.as_str(), df))
            })
            .collect()
    }

    pub fn get_data_quality_report(&self, name: &str) -> Result<QualityReport, ServiceError> {
        let df = self.table(name)?;
        Ok(StatsCalculator::quality_report(name, &df)?)
    }

    pub fn export_data(&self, name: &str, format: ExportFormat, path: &Path) -> Result<(), ServiceError> {
        let df = self.table(name)?;
        write_table(&df, path, format)?;
        Ok(())
    }
}
