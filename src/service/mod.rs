//! Service module - pipeline, fallback data, table cache and read interface

pub mod cache;
pub mod data_service;
pub mod fallback;
pub mod pipeline;

pub use cache::{DataOrigin, TableCache};
pub use data_service::{DataService, ServiceError, SummaryStatistics};
pub use fallback::FallbackPipeline;
pub use pipeline::{assemble_tables, CensusPipeline, TablePipeline, Tables};
