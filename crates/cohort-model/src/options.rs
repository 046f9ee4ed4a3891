//! Configuration options for the feature pipeline.

use serde::{Deserialize, Serialize};

/// Categorical fields whose vocabulary (including the missing sentinel)
/// reaches this size are left out of the one-hot matrix.
pub const DEFAULT_EXCLUSION_THRESHOLD: usize = 50;

/// What to do with a diagnosis code the hierarchy does not cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnmappedCodePolicy {
    /// Abort the run with a lookup error.
    #[default]
    Fail,
    /// Exclude the record, count it, and log a warning.
    Report,
}

/// Which diagnoses feed the hierarchy matrices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosisFilter {
    /// Every diagnosis regardless of date.
    #[default]
    All,
    /// Only diagnoses admitted strictly before the baseline visit.
    BeforeBaseline,
}

/// Options controlling the feature pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineOptions {
    pub exclusion_threshold: usize,
    pub unmapped_codes: UnmappedCodePolicy,
    pub diagnosis_filter: DiagnosisFilter,
    /// Cohort column holding the baseline visit date.
    pub baseline_column: String,
    /// Diagnosis table column holding the raw code.
    pub diagnosis_code_column: String,
    /// Episode table column holding the admission date.
    pub admission_date_column: String,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            exclusion_threshold: DEFAULT_EXCLUSION_THRESHOLD,
            unmapped_codes: UnmappedCodePolicy::default(),
            diagnosis_filter: DiagnosisFilter::default(),
            baseline_column: "f.53.0.0".to_string(),
            diagnosis_code_column: "diag_icd10".to_string(),
            admission_date_column: "admidate".to_string(),
        }
    }
}

impl PipelineOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_exclusion_threshold(mut self, threshold: usize) -> Self {
        self.exclusion_threshold = threshold;
        self
    }

    pub fn with_unmapped_codes(mut self, policy: UnmappedCodePolicy) -> Self {
        self.unmapped_codes = policy;
        self
    }

    pub fn with_diagnosis_filter(mut self, filter: DiagnosisFilter) -> Self {
        self.diagnosis_filter = filter;
        self
    }
}
