//! Pipeline configuration: source files, text format and state filter.

use encoding_rs::Encoding;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

use crate::data::SourceFormat;

/// Environment variable naming a JSON config file.
pub const CONFIG_ENV: &str = "EDU_DASHBOARD_CONFIG";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Unsupported text encoding: {0}")]
    UnsupportedEncoding(String),
    #[error("Delimiter must be a single ASCII character, got {0:?}")]
    InvalidDelimiter(char),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// School-level census extract.
    pub schools_path: PathBuf,
    /// Technical-course supplement.
    pub courses_path: PathBuf,
    pub delimiter: char,
    /// WHATWG encoding label, e.g. `latin1`.
    pub encoding: String,
    /// Keep only rows whose `CO_UF` equals this code.
    pub state_code: Option<i64>,
    /// Rows kept in the `top_cursos` table.
    pub top_courses: usize,
    /// Where filtered extracts are written, if anywhere.
    pub export_dir: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            schools_path: PathBuf::from("data/dados/microdados_ed_basica_2024.csv"),
            courses_path: PathBuf::from("data/dados/suplemento_cursos_tecnicos_2024.csv"),
            delimiter: ';',
            encoding: "latin1".to_string(),
            state_code: Some(32),
            top_courses: 15,
            export_dir: None,
        }
    }
}

impl PipelineConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Config file named by `EDU_DASHBOARD_CONFIG`, or the defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        match env::var_os(CONFIG_ENV) {
            Some(path) => {
                let path = PathBuf::from(path);
                info!(path = %path.display(), "loading pipeline config");
                Self::from_file(&path)
            }
            None => Ok(Self::default()),
        }
    }

    pub fn source_format(&self) -> Result<SourceFormat, ConfigError> {
        let encoding = Encoding::for_label(self.encoding.trim().as_bytes())
            .ok_or_else(|| ConfigError::UnsupportedEncoding(self.encoding.clone()))?;

        if !self.delimiter.is_ascii() {
            return Err(ConfigError::InvalidDelimiter(self.delimiter));
        }

        Ok(SourceFormat {
            delimiter: self.delimiter as u8,
            encoding,
        })
    }
}
