//! Pipeline Error Module
//! Failure taxonomy shared by the loader, processor, aggregator and cache.

use polars::prelude::PolarsError;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::config::ConfigError;
use crate::data::loader::LoaderError;
use crate::data::operations::OperationError;
use crate::data::processor::ProcessorError;
use crate::stats::AggregateError;

/// Failure category, kept apart from the message so it can be recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FailureKind {
    SourceUnavailable,
    SchemaMismatch,
    UnknownTableName,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureKind::SourceUnavailable => "SourceUnavailable",
            FailureKind::SchemaMismatch => "SchemaMismatch",
            FailureKind::UnknownTableName => "UnknownTableName",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Source unavailable ({path}): {reason}")]
    SourceUnavailable { path: PathBuf, reason: String },
    #[error("Schema mismatch in '{table}': {reason}")]
    SchemaMismatch { table: String, reason: String },
    #[error("Unknown table name: '{0}'")]
    UnknownTableName(String),
}

impl PipelineError {
    pub fn kind(&self) -> FailureKind {
        match self {
            PipelineError::SourceUnavailable { .. } => FailureKind::SourceUnavailable,
            PipelineError::SchemaMismatch { .. } => FailureKind::SchemaMismatch,
            PipelineError::UnknownTableName(_) => FailureKind::UnknownTableName,
        }
    }

    pub(crate) fn schema(table: impl Into<String>, reason: impl fmt::Display) -> Self {
        PipelineError::SchemaMismatch {
            table: table.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<LoaderError> for PipelineError {
    fn from(err: LoaderError) -> Self {
        match err {
            LoaderError::SourceUnavailable { path, reason } => {
                PipelineError::SourceUnavailable { path, reason }
            }
        }
    }
}

impl From<ProcessorError> for PipelineError {
    fn from(err: ProcessorError) -> Self {
        PipelineError::schema("processed records", err)
    }
}

impl From<AggregateError> for PipelineError {
    fn from(err: AggregateError) -> Self {
        PipelineError::schema("aggregate", err)
    }
}

impl From<OperationError> for PipelineError {
    fn from(err: OperationError) -> Self {
        PipelineError::schema("operation", err)
    }
}

// Anything polars raises mid-pipeline is treated like a schema problem.
impl From<PolarsError> for PipelineError {
    fn from(err: PolarsError) -> Self {
        PipelineError::schema("table", err)
    }
}

impl From<ConfigError> for PipelineError {
    fn from(err: ConfigError) -> Self {
        PipelineError::SourceUnavailable {
            path: PathBuf::new(),
            reason: err.to_string(),
        }
    }
}

/// Structured record of a failure that was absorbed by the fallback path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub kind: FailureKind,
    pub message: String,
}

impl From<&PipelineError> for Diagnostic {
    fn from(err: &PipelineError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loader_failure_keeps_source_kind() {
        let err: PipelineError = LoaderError::SourceUnavailable {
            path: PathBuf::from("missing.csv"),
            reason: "not found".to_string(),
        }
        .into();
        assert_eq!(err.kind(), FailureKind::SourceUnavailable);

        let diag = Diagnostic::from(&err);
        assert_eq!(diag.kind, FailureKind::SourceUnavailable);
        assert!(diag.message.contains("missing.csv"));
    }

    #[test]
    fn polars_failure_counts_as_schema_mismatch() {
        let err: PipelineError = PolarsError::ColumnNotFound("QT_DOC".into()).into();
        assert_eq!(err.kind(), FailureKind::SchemaMismatch);
    }
}
