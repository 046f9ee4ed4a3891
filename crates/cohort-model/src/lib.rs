#![deny(unsafe_code)]

pub mod enums;
pub mod error;
pub mod field;
pub mod ids;
pub mod matrix;
pub mod options;

pub use enums::ValueType;
pub use error::{CohortError, Result};
pub use field::{Field, FieldCatalog};
pub use ids::{ColumnKey, FieldId, ParticipantId};
pub use matrix::{FeatureMatrix, MISSING_MARKER, is_missing, strip_quotes};
pub use options::{
    DEFAULT_EXCLUSION_THRESHOLD, DiagnosisFilter, PipelineOptions, UnmappedCodePolicy,
};
