//! ICD10 diagnosis hierarchy and per-participant diagnosis encoding.
//!
//! Level 1 groups 3-character codes into named blocks (`I20-I25`). Level 2
//! is the 3-character code itself. Raw hospital codes carry a 4th
//! character which is dropped before lookup.

mod encode;
mod hierarchy;

pub use encode::{
    BaselineDates, DiagnosisEncoding, DiagnosisOptions, DiagnosisReport, baseline_dates,
    encode_diagnoses, truncate_code,
};
pub use hierarchy::{BlockRange, CodeHierarchy, RANGE_OVERRIDES, build_hierarchy, corrected_range};
