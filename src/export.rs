//! Derived file artifacts: cached tables written out as CSV or JSON.

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExportFormat {
    /// Semicolon-separated UTF-8 with header.
    Csv,
    /// JSON array of records.
    Json,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }
}

/// Write `df` to `path`, creating parent directories as needed.
pub fn write_table(df: &DataFrame, path: &Path, format: ExportFormat) -> Result<(), ExportError> {
    let io_err = |source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    let mut file = File::create(path).map_err(io_err)?;
    let mut df = df.clone();

    match format {
        ExportFormat::Csv => CsvWriter::new(&mut file)
            .include_header(true)
            .with_separator(b';')
            .finish(&mut df)?,
        ExportFormat::Json => JsonWriter::new(&mut file)
            .with_json_format(JsonFormat::Json)
            .finish(&mut df)?,
    }

    info!(path = %path.display(), rows = df.height(), ?format, "exported table");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample() -> DataFrame {
        DataFrame::new(vec![
            Column::new("Municipio".into(), vec!["Vitória", "Serra"]),
            Column::new("Total_Professores".into(), vec![23.0, 3.0]),
        ])
        .unwrap()
    }

    #[test]
    fn csv_export_uses_semicolons_and_utf8() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out").join("municipios.csv");
        write_table(&sample(), &path, ExportFormat::Csv).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("Municipio;Total_Professores"));
        assert!(lines.next().unwrap().starts_with("Vitória;23"));
    }

    #[test]
    fn json_export_is_array_of_records() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("municipios.json");
        write_table(&sample(), &path, ExportFormat::Json).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        let rows = value.as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1]["Municipio"], "Serra");
        assert_eq!(rows[0]["Total_Professores"], 23.0);
    }
}
