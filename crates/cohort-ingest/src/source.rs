//! The wide per-participant source table.
//!
//! Header: the participant id column (`f.eid`) followed by field columns
//! named `f.<field>.<visit>.<instance>`. Every later row holds one
//! participant. Cells are kept as raw text; interpretation belongs to the
//! encoding stages.

use std::collections::BTreeSet;
use std::io::Read;
use std::path::Path;
use std::time::Instant;

use tracing::{debug, info};

use cohort_model::{CohortError, ColumnKey, ParticipantId};

use crate::tsv;
use crate::{IngestError, Result};

/// Parsed header of the source table.
#[derive(Debug, Clone)]
pub struct SourceHeader {
    names: Vec<String>,
    keys: Vec<Option<ColumnKey>>,
}

impl SourceHeader {
    /// Parse header names. The first column must be the participant id.
    pub fn parse(names: Vec<String>) -> std::result::Result<Self, CohortError> {
        let mut keys = Vec::with_capacity(names.len());
        for (idx, name) in names.iter().enumerate() {
            let key = ColumnKey::parse_header(name).map_err(|_| {
                CohortError::schema(format!(
                    "column {idx} ({name:?}) is neither eid nor f.<field>.<visit>.<instance>"
                ))
            })?;
            match (idx, key) {
                (0, Some(_)) => {
                    return Err(CohortError::schema(format!(
                        "first column must be the participant id, found {name:?}"
                    )));
                }
                (0, None) => {}
                (_, None) => {
                    return Err(CohortError::schema(format!(
                        "participant id column repeated at position {idx}"
                    )));
                }
                (_, Some(_)) => {}
            }
            keys.push(key);
        }
        if keys.is_empty() {
            return Err(CohortError::schema("source table has no columns"));
        }
        Ok(Self { names, keys })
    }

    pub fn name(&self, index: usize) -> &str {
        &self.names[index]
    }

    /// Column key at a physical index; `None` for the participant id column.
    pub fn key(&self, index: usize) -> Option<ColumnKey> {
        self.keys.get(index).copied().flatten()
    }

    /// Field columns with their physical index, in header order.
    pub fn field_columns(&self) -> impl Iterator<Item = (usize, ColumnKey)> + '_ {
        self.keys
            .iter()
            .enumerate()
            .filter_map(|(idx, key)| key.map(|key| (idx, key)))
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|candidate| candidate == name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// The cohort table held in memory, rows in file order.
#[derive(Debug, Clone)]
pub struct SourceTable {
    header: SourceHeader,
    eids: Vec<ParticipantId>,
    rows: Vec<Vec<String>>,
}

impl SourceTable {
    /// Build a table from header names and raw rows (eid first in each row).
    ///
    /// Short rows are padded with empty cells; long rows and repeated
    /// participant ids are integrity errors.
    pub fn from_records(
        names: Vec<String>,
        records: Vec<Vec<String>>,
    ) -> std::result::Result<Self, CohortError> {
        let header = SourceHeader::parse(names)?;
        let width = header.len();
        let mut seen = BTreeSet::new();
        let mut eids = Vec::with_capacity(records.len());
        let mut rows = Vec::with_capacity(records.len());
        for (row_idx, mut record) in records.into_iter().enumerate() {
            if record.len() > width {
                return Err(CohortError::data_integrity(format!(
                    "source row {} has {} cells but the header has {width}",
                    row_idx + 1,
                    record.len()
                )));
            }
            record.resize(width, String::new());
            let eid: ParticipantId = record[0].parse()?;
            if !seen.insert(eid) {
                return Err(CohortError::data_integrity(format!(
                    "participant {eid} appears more than once in the source table"
                )));
            }
            eids.push(eid);
            rows.push(record);
        }
        Ok(Self { header, eids, rows })
    }

    pub fn header(&self) -> &SourceHeader {
        &self.header
    }

    /// Participant ids in cohort (file) order.
    pub fn eids(&self) -> &[ParticipantId] {
        &self.eids
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn value(&self, row: usize, column: usize) -> &str {
        &self.rows[row][column]
    }

    /// All values of one physical column, in row order.
    pub fn column_values(&self, column: usize) -> impl Iterator<Item = &str> + '_ {
        self.rows.iter().map(move |row| row[column].as_str())
    }
}

pub fn read_source_table(path: &Path) -> Result<SourceTable> {
    let start = Instant::now();
    let reader = tsv::open(path)?;
    let table = parse_records(reader, path)?;
    info!(
        path = %path.display(),
        participant_count = table.row_count(),
        column_count = table.header().len(),
        duration_ms = start.elapsed().as_millis(),
        "source table loaded"
    );
    Ok(table)
}

/// Parse a source table held in memory (same format as the file).
pub fn parse_source_table(contents: &str) -> Result<SourceTable> {
    parse_records(tsv::from_reader(contents.as_bytes()), Path::new("<memory>"))
}

fn parse_records<R: Read>(mut reader: csv::Reader<R>, path: &Path) -> Result<SourceTable> {
    let names = tsv::headers(&mut reader, path)?;
    let width = names.len();
    let mut records = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|error| IngestError::parse(path, &error))?;
        if record.iter().all(|value| value.trim().is_empty()) {
            continue;
        }
        let mut row = Vec::with_capacity(width);
        for idx in 0..record.len() {
            row.push(tsv::cell(&record, idx).to_string());
        }
        records.push(row);
    }
    debug!(path = %path.display(), record_count = records.len(), "source records read");
    Ok(SourceTable::from_records(names, records)?)
}
