//! Readers for the tab-separated inputs of the feature pipeline.
//!
//! All readers treat quote characters literally; callers strip them where
//! the value semantics require it.

#![deny(unsafe_code)]

pub mod catalog;
pub mod coding;
pub mod error;
pub mod hash;
pub mod hesin;
pub mod source;
mod tsv;

pub use catalog::{parse_field_catalog, read_field_catalog};
pub use coding::{CodingEntry, parse_coding_entries, read_coding_entries};
pub use error::{IngestError, Result};
pub use hash::{sha256_file, sha256_hex};
pub use hesin::{
    DiagnosisKey, DiagnosisRecord, EpisodeKey, EpisodeRecord, JoinedDiagnosis, join_episodes,
    parse_optional_date, read_diagnoses, read_episodes, write_joined,
};
pub use source::{SourceHeader, SourceTable, parse_source_table, read_source_table};
