//! Process-wide table cache with one-time population and synthetic fallback.

use once_cell::sync::OnceCell;
use polars::prelude::DataFrame;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use crate::config::PipelineConfig;
use crate::data::schema::empty_table;
use crate::data::{Diagnostic, TableName};
use crate::service::fallback::FallbackPipeline;
use crate::service::pipeline::{CensusPipeline, TablePipeline, Tables};

/// Where the cached tables came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataOrigin {
    Census,
    /// The census pipeline failed; the diagnostic records why.
    Fallback(Diagnostic),
}

impl DataOrigin {
    pub fn is_fallback(&self) -> bool {
        matches!(self, DataOrigin::Fallback(_))
    }

    pub fn diagnostic(&self) -> Option<&Diagnostic> {
        match self {
            DataOrigin::Census => None,
            DataOrigin::Fallback(diagnostic) => Some(diagnostic),
        }
    }
}

struct TableSet {
    tables: Tables,
    origin: DataOrigin,
}

/// Holds every named table for the life of the process.
///
/// The first `get_table` call runs the census pipeline; concurrent callers
/// wait for that single run instead of starting their own.
pub struct TableCache {
    primary: Box<dyn TablePipeline>,
    fallback: Box<dyn TablePipeline>,
    cell: OnceCell<TableSet>,
}

impl TableCache {
    pub fn new(primary: Box<dyn TablePipeline>, fallback: Box<dyn TablePipeline>) -> Self {
        Self {
            primary,
            fallback,
            cell: OnceCell::new(),
        }
    }

    /// Census pipeline backed by the synthetic dataset.
    pub fn from_config(config: PipelineConfig) -> Self {
        let fallback = FallbackPipeline::new(config.top_courses);
        Self::new(Box::new(CensusPipeline::new(config)), Box::new(fallback))
    }

    /// Copy of the named table, or `None` when the name is not a known table.
    pub fn get_table(&self, name: &str) -> Option<DataFrame> {
        let table = match name.parse::<TableName>() {
            Ok(table) => table,
            Err(e) => {
                debug!(error = %e, "table lookup refused");
                return None;
            }
        };
        self.table(table)
    }

    pub fn table(&self, name: TableName) -> Option<DataFrame> {
        self.tables().get(&name).cloned()
    }

    /// Every cached table, populating the cache on first use.
    pub fn tables(&self) -> &Tables {
        &self.populated().tables
    }

    pub fn origin(&self) -> &DataOrigin {
        &self.populated().origin
    }

    pub fn is_populated(&self) -> bool {
        self.cell.get().is_some()
    }

    fn populated(&self) -> &TableSet {
        self.cell.get_or_init(|| self.populate())
    }

    fn populate(&self) -> TableSet {
        let started = Instant::now();
        match self.primary.run() {
            Ok(tables) => {
                info!(elapsed = ?started.elapsed(), "cache populated from census data");
                TableSet {
                    tables,
                    origin: DataOrigin::Census,
                }
            }
            Err(e) => {
                let diagnostic = Diagnostic::from(&e);
                warn!(kind = %diagnostic.kind, error = %diagnostic.message, "census pipeline failed, serving fallback data");
                let tables = self.fallback.run().unwrap_or_else(|e| {
                    error!(error = %e, "fallback dataset could not be built, serving empty tables");
                    TableName::ALL
                        .into_iter()
                        .map(|name| (name, empty_table(name)))
                        .collect()
                });
                TableSet {
                    tables,
                    origin: DataOrigin::Fallback(diagnostic),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::schema::matches_schema;
    use crate::data::{FailureKind, PipelineError};
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    fn missing_files() -> PipelineConfig {
        PipelineConfig {
            schools_path: PathBuf::from("/nonexistent/escolas.csv"),
            courses_path: PathBuf::from("/nonexistent/cursos.csv"),
            ..Default::default()
        }
    }

    /// Delegates to the fallback data while counting runs.
    struct Counting {
        runs: Arc<AtomicUsize>,
    }

    impl TablePipeline for Counting {
        fn run(&self) -> Result<Tables, PipelineError> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(20));
            FallbackPipeline::new(5).run()
        }
    }

    fn counting_cache() -> (TableCache, Arc<AtomicUsize>) {
        let runs = Arc::new(AtomicUsize::new(0));
        let cache = TableCache::new(
            Box::new(Counting { runs: runs.clone() }),
            Box::new(FallbackPipeline::new(5)),
        );
        (cache, runs)
    }

    #[test]
    fn missing_source_serves_conformed_fallback() {
        let cache = TableCache::from_config(missing_files());
        let municipios = cache.get_table("municipios").unwrap();

        assert!(municipios.height() > 0);
        assert!(matches_schema(&municipios, TableName::Municipios));

        let diagnostic = cache.origin().diagnostic().unwrap();
        assert_eq!(diagnostic.kind, FailureKind::SourceUnavailable);
        assert!(diagnostic.message.contains("escolas.csv"));
    }

    #[test]
    fn every_known_name_resolves_after_fallback() {
        let cache = TableCache::from_config(missing_files());
        for name in TableName::ALL {
            assert!(cache.get_table(name.as_str()).is_some(), "{name} missing");
        }
    }

    struct Broken;

    impl TablePipeline for Broken {
        fn run(&self) -> Result<Tables, PipelineError> {
            Err(PipelineError::SourceUnavailable {
                path: PathBuf::from("/nonexistent/sintetico.csv"),
                reason: "unavailable".to_string(),
            })
        }
    }

    #[test]
    fn failed_fallback_still_serves_every_known_name() {
        let cache = TableCache::new(Box::new(Broken), Box::new(Broken));
        for name in TableName::ALL {
            let table = cache.get_table(name.as_str()).unwrap();
            assert_eq!(table.height(), 0);
            assert!(matches_schema(&table, name), "{name}");
        }
        assert!(cache.origin().is_fallback());
    }

    #[test]
    fn unknown_name_is_not_found_and_does_not_load() {
        let (cache, runs) = counting_cache();
        assert!(cache.get_table("not_a_real_table").is_none());
        assert!(!cache.is_populated());
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn pipeline_runs_once_across_calls() {
        let (cache, runs) = counting_cache();
        for name in ["municipios", "dependencia", "municipios", "top_cursos"] {
            assert!(cache.get_table(name).is_some());
        }
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(cache.origin(), &DataOrigin::Census);
    }

    #[test]
    fn concurrent_first_callers_share_one_load() {
        let (cache, runs) = counting_cache();
        let cache = Arc::new(cache);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                thread::spawn(move || cache.get_table("localizacao").map(|t| t.height()))
            })
            .collect();
        let heights: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert!(heights.iter().all(|h| h.is_some() && *h == heights[0]));
    }
}
