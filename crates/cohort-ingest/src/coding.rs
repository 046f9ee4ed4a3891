//! Diagnosis coding reference (the ICD-10 tree listing).
//!
//! The first column is either a plain code (`A09`, `A090`), a block label
//! (`Block A00-A09`), or a chapter label. A `coding` header line is skipped.

use std::io::Read;
use std::path::Path;

use csv::ReaderBuilder;
use tracing::debug;

use crate::tsv;
use crate::{IngestError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodingEntry {
    pub coding: String,
    pub meaning: String,
}

pub fn read_coding_entries(path: &Path) -> Result<Vec<CodingEntry>> {
    let file = tsv::open_file(path)?;
    let entries = parse_coding_entries(file, path)?;
    debug!(path = %path.display(), entry_count = entries.len(), "coding reference loaded");
    Ok(entries)
}

/// Parse reference lines in file order.
pub fn parse_coding_entries<R: Read>(input: R, path: &Path) -> Result<Vec<CodingEntry>> {
    let mut reader = ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .quoting(false)
        .flexible(true)
        .from_reader(input);
    let mut entries = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = record.map_err(|error| IngestError::parse(path, &error))?;
        let coding = tsv::cell(&record, 0).trim().trim_matches('"').to_string();
        if idx == 0 && coding.eq_ignore_ascii_case("coding") {
            continue;
        }
        if coding.is_empty() {
            continue;
        }
        entries.push(CodingEntry {
            coding,
            meaning: tsv::cell(&record, 1).trim().to_string(),
        });
    }
    Ok(entries)
}
