use std::path::PathBuf;

use cohort_report::{MatrixShape, RunSummary};

/// Paths of every input file.
#[derive(Debug, Clone)]
pub struct PipelineInputs {
    pub catalog: PathBuf,
    pub source: PathBuf,
    pub hesin: PathBuf,
    pub hesin_diag: PathBuf,
    pub coding: PathBuf,
}

#[derive(Debug)]
pub struct PipelineOutcome {
    /// `None` for a dry run.
    pub output_dir: Option<PathBuf>,
    pub participants: usize,
    /// Partial matrices in merge order, then `features_merged`.
    pub matrices: Vec<MatrixShape>,
    pub summary: RunSummary,
    pub summary_path: Option<PathBuf>,
    pub warnings: Vec<String>,
}
