//! Feature encoding pipeline.
//!
//! Stages run in a fixed order, each consuming the complete output of the
//! previous one:
//!
//! 1. [`classify`]: pick the visit-0 columns of every field of a value type
//!    and split them into single- and multiple-instance groups.
//! 2. [`vocabulary`]: scan the whole cohort for the categories of every
//!    categorical field.
//! 3. [`onehot`]: encode categorical fields against the finished vocabularies.
//! 4. [`numeric`]: split integer and continuous fields into single and
//!    multiple tables.
//! 5. [`icd10`]: build the two-level diagnosis hierarchy and encode each
//!    participant's diagnoses.

#![deny(unsafe_code)]

pub mod classify;
pub mod icd10;
pub mod numeric;
pub mod onehot;
pub mod vocabulary;

pub use classify::{ColumnSelection, SelectedColumn, classify_columns};
pub use icd10::{
    BaselineDates, CodeHierarchy, DiagnosisEncoding, DiagnosisOptions, DiagnosisReport,
    RANGE_OVERRIDES, baseline_dates, build_hierarchy, encode_diagnoses,
};
pub use numeric::{NumericSplit, SplitReport, split_numeric};
pub use onehot::{
    CategoricalEncoding, ColumnIndex, EncoderOptions, EncodingReport, ExcludedField, decode_row,
    encode_categorical,
};
pub use vocabulary::{Vocabulary, VocabularySet, build_vocabularies};
