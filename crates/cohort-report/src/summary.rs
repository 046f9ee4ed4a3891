//! Machine-readable record of one pipeline run.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use cohort_encode::{DiagnosisReport, EncodingReport, SplitReport};
use cohort_model::{FeatureMatrix, PipelineOptions, ValueType};

use crate::writer::write_atomic;

/// SHA-256 of one input file.
#[derive(Debug, Clone, Serialize)]
pub struct InputDigest {
    pub role: String,
    pub path: PathBuf,
    pub sha256: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MatrixShape {
    pub name: String,
    pub rows: usize,
    pub columns: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl MatrixShape {
    pub fn of(matrix: &FeatureMatrix, path: Option<PathBuf>) -> Self {
        Self {
            name: matrix.name().to_string(),
            rows: matrix.height(),
            columns: matrix.width(),
            path,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub tool_version: String,
    pub generated_at: String,
    pub options: PipelineOptions,
    pub inputs: Vec<InputDigest>,
    pub participants: usize,
    /// Value types with no column in the source table.
    pub empty_types: Vec<ValueType>,
    pub matrices: Vec<MatrixShape>,
    pub categorical: Vec<EncodingReport>,
    pub numeric: Vec<SplitReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnoses: Option<DiagnosisReport>,
}

impl RunSummary {
    pub fn new(tool_version: impl Into<String>, options: PipelineOptions) -> Self {
        Self {
            tool_version: tool_version.into(),
            generated_at: chrono::Utc::now().to_rfc3339(),
            options,
            inputs: Vec::new(),
            participants: 0,
            empty_types: Vec::new(),
            matrices: Vec::new(),
            categorical: Vec::new(),
            numeric: Vec::new(),
            diagnoses: None,
        }
    }
}

/// Write `run_summary.json`.
pub fn write_run_summary(output_dir: &Path, summary: &RunSummary) -> Result<PathBuf> {
    let path = output_dir.join("run_summary.json");
    let json = serde_json::to_string_pretty(summary).context("serialize run summary")?;
    write_atomic(&path, |file| {
        use std::io::Write;
        file.write_all(json.as_bytes())?;
        file.write_all(b"\n")?;
        Ok(())
    })?;
    Ok(path)
}
