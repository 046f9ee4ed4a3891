//! Error types for cohort data ingestion.

use std::path::PathBuf;
use thiserror::Error;

use cohort_model::CohortError;

/// Errors that can occur while reading pipeline inputs.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Input file not found.
    #[error("input file not found: {path}")]
    FileNotFound { path: PathBuf },

    /// Failed to read file.
    #[error("failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse a tab-separated record.
    #[error("failed to parse {path}: {message}")]
    TsvParse { path: PathBuf, message: String },

    /// File has no header line.
    #[error("file is empty: {path}")]
    EmptyFile { path: PathBuf },

    /// Required column not found in the header.
    #[error("required column '{column}' not found in {path}")]
    MissingColumn { column: String, path: PathBuf },

    /// A value could not be parsed.
    #[error("invalid {field} value '{value}' in {path} (record {record})")]
    InvalidValue {
        field: String,
        value: String,
        path: PathBuf,
        record: u64,
    },

    /// Schema, integrity, or lookup failure raised by the data model.
    #[error(transparent)]
    Cohort(#[from] CohortError),
}

impl IngestError {
    pub(crate) fn parse(path: impl Into<PathBuf>, error: &csv::Error) -> Self {
        Self::TsvParse {
            path: path.into(),
            message: error.to_string(),
        }
    }

    /// True when the input is readable but its contents are inconsistent.
    pub fn is_data_integrity(&self) -> bool {
        matches!(
            self,
            Self::Cohort(CohortError::DataIntegrity { .. }) | Self::InvalidValue { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, IngestError>;
