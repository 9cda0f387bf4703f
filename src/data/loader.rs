//! Census Data Loader Module
//! Reads delimited census extracts (any text encoding) into Polars DataFrames.

use encoding_rs::{Encoding, WINDOWS_1252};
use polars::prelude::*;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Failed to read {path}: {reason}")]
    SourceUnavailable { path: PathBuf, reason: String },
}

impl LoaderError {
    fn unavailable(path: &Path, reason: impl ToString) -> Self {
        LoaderError::SourceUnavailable {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }
}

/// Delimiter and text encoding of a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceFormat {
    pub delimiter: u8,
    pub encoding: &'static Encoding,
}

impl Default for SourceFormat {
    /// INEP publishes semicolon-separated Latin-1 files.
    fn default() -> Self {
        Self {
            delimiter: b';',
            encoding: WINDOWS_1252,
        }
    }
}

/// Loads census extracts. Every column is passed through untouched.
pub struct DataLoader {
    format: SourceFormat,
    infer_schema_length: usize,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new(SourceFormat::default())
    }
}

impl DataLoader {
    pub fn new(format: SourceFormat) -> Self {
        Self {
            format,
            infer_schema_length: 10000,
        }
    }

    pub fn format(&self) -> SourceFormat {
        self.format
    }

    /// Load a delimited file, first row as header.
    pub fn load(&self, path: &Path) -> Result<DataFrame, LoaderError> {
        let bytes = fs::read(path).map_err(|e| LoaderError::unavailable(path, e))?;
        debug!(path = %path.display(), bytes = bytes.len(), "read source file");

        let text = self.decode(path, &bytes)?;
        let df = self.parse(path, text.into_bytes())?;

        info!(
            path = %path.display(),
            rows = df.height(),
            columns = df.width(),
            encoding = self.format.encoding.name(),
            "loaded census extract"
        );
        Ok(df)
    }

    fn decode(&self, path: &Path, bytes: &[u8]) -> Result<String, LoaderError> {
        let (text, _, had_errors) = self.format.encoding.decode(bytes);
        if had_errors {
            return Err(LoaderError::unavailable(
                path,
                format!("not valid {}", self.format.encoding.name()),
            ));
        }
        Ok(text.into_owned())
    }

    fn parse(&self, path: &Path, utf8: Vec<u8>) -> Result<DataFrame, LoaderError> {
        let delimiter = self.format.delimiter;
        CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(self.infer_schema_length))
            .with_ignore_errors(true)
            .map_parse_options(|opts| opts.with_separator(delimiter))
            .into_reader_with_file_handle(Cursor::new(utf8))
            .finish()
            .map_err(|e| LoaderError::unavailable(path, e))
    }
}
