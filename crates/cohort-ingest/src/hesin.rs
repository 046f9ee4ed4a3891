//! Hospital episode tables.
//!
//! Two tables describe inpatient diagnoses:
//!
//! - the episode table, keyed by `(eid, ins_index)`, carries the admission
//!   date of each hospital episode;
//! - the diagnosis table, keyed by `(eid, ins_index, arr_index)`, carries
//!   one diagnosis code per row.
//!
//! [`join_episodes`] attaches the admission date to every diagnosis (left
//! join: diagnoses without an episode keep a null date).

use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::path::Path;

use chrono::NaiveDate;
use csv::StringRecord;
use tracing::{debug, info, warn};

use cohort_model::{CohortError, MISSING_MARKER, ParticipantId, is_missing};

use crate::tsv;
use crate::{IngestError, Result};

const EID_COLUMN: &str = "eid";
const INS_INDEX_COLUMN: &str = "ins_index";
const ARR_INDEX_COLUMN: &str = "arr_index";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EpisodeKey {
    pub eid: ParticipantId,
    pub ins_index: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DiagnosisKey {
    pub eid: ParticipantId,
    pub ins_index: u32,
    pub arr_index: u32,
}

impl DiagnosisKey {
    pub fn episode(&self) -> EpisodeKey {
        EpisodeKey {
            eid: self.eid,
            ins_index: self.ins_index,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpisodeRecord {
    pub key: EpisodeKey,
    pub admission_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosisRecord {
    pub key: DiagnosisKey,
    /// Raw code as written in the table; `None` when missing.
    pub code: Option<String>,
}

/// A diagnosis with the admission date of its episode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinedDiagnosis {
    pub key: DiagnosisKey,
    pub code: Option<String>,
    pub admission_date: Option<NaiveDate>,
}

/// Parse a `YYYY-MM-DD` date; blank and `NA` are `None`.
pub fn parse_optional_date(raw: &str) -> std::result::Result<Option<NaiveDate>, CohortError> {
    let value = raw.trim().trim_matches('"');
    if is_missing(value) {
        return Ok(None);
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(Some)
        .map_err(|_| CohortError::data_integrity(format!("invalid date {value:?}")))
}

pub fn read_episodes(path: &Path, date_column: &str) -> Result<Vec<EpisodeRecord>> {
    let reader = tsv::open(path)?;
    let episodes = parse_episodes(reader, path, date_column)?;
    debug!(path = %path.display(), episode_count = episodes.len(), "episodes loaded");
    Ok(episodes)
}

pub fn read_diagnoses(path: &Path, code_column: &str) -> Result<Vec<DiagnosisRecord>> {
    let reader = tsv::open(path)?;
    let diagnoses = parse_diagnoses(reader, path, code_column)?;
    debug!(path = %path.display(), diagnosis_count = diagnoses.len(), "diagnoses loaded");
    Ok(diagnoses)
}

fn parse_episodes<R: Read>(
    mut reader: csv::Reader<R>,
    path: &Path,
    date_column: &str,
) -> Result<Vec<EpisodeRecord>> {
    let headers = tsv::headers(&mut reader, path)?;
    let idx_eid = tsv::require_column(&headers, EID_COLUMN, path)?;
    let idx_ins = tsv::require_column(&headers, INS_INDEX_COLUMN, path)?;
    let idx_date = tsv::require_column(&headers, date_column, path)?;

    let mut episodes = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|error| IngestError::parse(path, &error))?;
        let eid = key_field::<ParticipantId>(&record, idx_eid, EID_COLUMN, path)?;
        let ins_index = key_field::<u32>(&record, idx_ins, INS_INDEX_COLUMN, path)?;
        let raw_date = tsv::cell(&record, idx_date);
        let admission_date =
            parse_optional_date(raw_date).map_err(|_| IngestError::InvalidValue {
                field: date_column.to_string(),
                value: raw_date.to_string(),
                path: path.to_path_buf(),
                record: tsv::record_number(&record),
            })?;
        episodes.push(EpisodeRecord {
            key: EpisodeKey { eid, ins_index },
            admission_date,
        });
    }
    Ok(episodes)
}

fn parse_diagnoses<R: Read>(
    mut reader: csv::Reader<R>,
    path: &Path,
    code_column: &str,
) -> Result<Vec<DiagnosisRecord>> {
    let headers = tsv::headers(&mut reader, path)?;
    let idx_eid = tsv::require_column(&headers, EID_COLUMN, path)?;
    let idx_ins = tsv::require_column(&headers, INS_INDEX_COLUMN, path)?;
    let idx_arr = tsv::require_column(&headers, ARR_INDEX_COLUMN, path)?;
    let idx_code = tsv::require_column(&headers, code_column, path)?;

    let mut diagnoses = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|error| IngestError::parse(path, &error))?;
        let eid = key_field::<ParticipantId>(&record, idx_eid, EID_COLUMN, path)?;
        let ins_index = key_field::<u32>(&record, idx_ins, INS_INDEX_COLUMN, path)?;
        let arr_index = key_field::<u32>(&record, idx_arr, ARR_INDEX_COLUMN, path)?;
        let raw_code = tsv::cell(&record, idx_code);
        let code = (!is_missing(raw_code)).then(|| raw_code.trim().to_string());
        diagnoses.push(DiagnosisRecord {
            key: DiagnosisKey {
                eid,
                ins_index,
                arr_index,
            },
            code,
        });
    }
    Ok(diagnoses)
}

/// Composite-key components must be integers; anything else is a malformed row.
fn key_field<T: std::str::FromStr>(
    record: &StringRecord,
    index: usize,
    column: &str,
    path: &Path,
) -> Result<T> {
    let raw = tsv::cell(record, index);
    raw.trim()
        .trim_matches('"')
        .parse::<T>()
        .map_err(|_| IngestError::InvalidValue {
            field: column.to_string(),
            value: raw.to_string(),
            path: path.to_path_buf(),
            record: tsv::record_number(record),
        })
}

/// Left-join diagnoses against episodes on `(eid, ins_index)`.
///
/// Output keeps the diagnosis order. Duplicate keys on either side are
/// integrity errors.
pub fn join_episodes(
    diagnoses: Vec<DiagnosisRecord>,
    episodes: &[EpisodeRecord],
) -> std::result::Result<Vec<JoinedDiagnosis>, CohortError> {
    let mut dates: BTreeMap<EpisodeKey, Option<NaiveDate>> = BTreeMap::new();
    for episode in episodes {
        if dates.insert(episode.key, episode.admission_date).is_some() {
            return Err(CohortError::data_integrity(format!(
                "episode (eid {}, ins_index {}) appears more than once",
                episode.key.eid, episode.key.ins_index
            )));
        }
    }

    let mut seen = std::collections::BTreeSet::new();
    let mut unmatched = 0usize;
    let mut joined = Vec::with_capacity(diagnoses.len());
    for diagnosis in diagnoses {
        if !seen.insert(diagnosis.key) {
            return Err(CohortError::data_integrity(format!(
                "diagnosis (eid {}, ins_index {}, arr_index {}) appears more than once",
                diagnosis.key.eid, diagnosis.key.ins_index, diagnosis.key.arr_index
            )));
        }
        let admission_date = match dates.get(&diagnosis.key.episode()) {
            Some(date) => *date,
            None => {
                unmatched += 1;
                None
            }
        };
        joined.push(JoinedDiagnosis {
            key: diagnosis.key,
            code: diagnosis.code,
            admission_date,
        });
    }
    if unmatched > 0 {
        warn!(
            unmatched_count = unmatched,
            "diagnoses without a matching episode keep a null admission date"
        );
    }
    info!(
        diagnosis_count = joined.len(),
        episode_count = episodes.len(),
        "episode join complete"
    );
    Ok(joined)
}

/// Write the joined table as TSV: `eid, ins_index, arr_index, <code>, <date>`.
pub fn write_joined<W: Write>(
    writer: W,
    joined: &[JoinedDiagnosis],
    code_column: &str,
    date_column: &str,
) -> std::io::Result<()> {
    let mut out = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .quote_style(csv::QuoteStyle::Never)
        .from_writer(writer);
    out.write_record([
        EID_COLUMN,
        INS_INDEX_COLUMN,
        ARR_INDEX_COLUMN,
        code_column,
        date_column,
    ])?;
    for row in joined {
        let date = row
            .admission_date
            .map_or_else(|| MISSING_MARKER.to_string(), |date| date.to_string());
        out.write_record([
            row.key.eid.to_string(),
            row.key.ins_index.to_string(),
            row.key.arr_index.to_string(),
            row.code.clone().unwrap_or_else(|| MISSING_MARKER.to_string()),
            date,
        ])?;
    }
    out.flush()
}
