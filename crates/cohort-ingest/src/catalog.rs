//! Field catalog loading.
//!
//! The catalog is the tab-separated listing scraped from the data showcase:
//! `FieldID`, `Description`, `Category`, `ValueType`. Fetching it is not
//! this crate's job; it only reads the file.

use std::io::Read;
use std::path::Path;

use tracing::debug;

use cohort_model::{CohortError, Field, FieldCatalog, FieldId, ValueType};

use crate::tsv;
use crate::{IngestError, Result};

const FIELD_ID_COLUMN: &str = "FieldID";
const DESCRIPTION_COLUMN: &str = "Description";
const CATEGORY_COLUMN: &str = "Category";
const VALUE_TYPE_COLUMN: &str = "ValueType";

pub fn read_field_catalog(path: &Path) -> Result<FieldCatalog> {
    let reader = tsv::open(path)?;
    let catalog = parse_records(reader, path)?;
    debug!(path = %path.display(), field_count = catalog.len(), "field catalog loaded");
    Ok(catalog)
}

/// Parse catalog contents held in memory (same format as the file).
pub fn parse_field_catalog(contents: &str) -> Result<FieldCatalog> {
    parse_records(tsv::from_reader(contents.as_bytes()), Path::new("<memory>"))
}

fn parse_records<R: Read>(mut reader: csv::Reader<R>, path: &Path) -> Result<FieldCatalog> {
    let headers = tsv::headers(&mut reader, path)?;
    let idx_id = tsv::require_column(&headers, FIELD_ID_COLUMN, path)?;
    let idx_value_type = tsv::require_column(&headers, VALUE_TYPE_COLUMN, path)?;
    let idx_description = tsv::header_index(&headers, DESCRIPTION_COLUMN);
    let idx_category = tsv::header_index(&headers, CATEGORY_COLUMN);

    let mut fields = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|error| IngestError::parse(path, &error))?;
        let raw_id = tsv::cell(&record, idx_id).trim();
        if raw_id.is_empty() {
            continue;
        }
        let line = tsv::record_number(&record);
        let id: FieldId = raw_id.parse().map_err(|_| IngestError::InvalidValue {
            field: FIELD_ID_COLUMN.to_string(),
            value: raw_id.to_string(),
            path: path.to_path_buf(),
            record: line,
        })?;
        let raw_type = tsv::cell(&record, idx_value_type);
        let value_type: ValueType = raw_type.parse().map_err(|_| {
            CohortError::schema(format!(
                "{}: field {id} has unknown value type {raw_type:?} (line {line})",
                path.display()
            ))
        })?;
        fields.push(Field {
            id,
            description: idx_description
                .map(|idx| tsv::cell(&record, idx).trim().to_string())
                .unwrap_or_default(),
            category: idx_category
                .map(|idx| tsv::cell(&record, idx).trim().to_string())
                .unwrap_or_default(),
            value_type,
        });
    }
    Ok(FieldCatalog::new(fields)?)
}
