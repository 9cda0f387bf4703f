//! Data module - census loading, schema and record processing

pub mod error;
pub mod loader;
pub mod operations;
pub mod processor;
pub mod schema;

pub use error::{Diagnostic, FailureKind, PipelineError};
pub use loader::{DataLoader, LoaderError, SourceFormat};
pub use operations::{
    apply_operations, AggFunction, Aggregation, Filter, FilterOperator, FilterValue, Operation,
    OperationError,
};
pub use processor::{ProcessorError, RecordProcessor};
pub use schema::TableName;
