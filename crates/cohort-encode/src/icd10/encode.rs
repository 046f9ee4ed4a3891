use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{info, warn};

use cohort_ingest::{JoinedDiagnosis, SourceTable, parse_optional_date};
use cohort_model::{
    CohortError, DiagnosisFilter, FeatureMatrix, ParticipantId, Result, UnmappedCodePolicy,
    strip_quotes,
};

use super::CodeHierarchy;

/// Baseline assessment date per participant; `None` when not recorded.
pub type BaselineDates = BTreeMap<ParticipantId, Option<NaiveDate>>;

/// Read baseline dates from a source column such as `f.53.0.0`.
pub fn baseline_dates(table: &SourceTable, column: &str) -> Result<BaselineDates> {
    let index = table.header().index_of(column).ok_or_else(|| {
        CohortError::schema(format!("baseline column {column} not found in the source table"))
    })?;
    let mut dates = BTreeMap::new();
    for (row, eid) in table.eids().iter().enumerate() {
        let raw = strip_quotes(table.value(row, index));
        let date = parse_optional_date(raw).map_err(|_| {
            CohortError::data_integrity(format!(
                "participant {eid} has an invalid baseline date {raw:?} in {column}"
            ))
        })?;
        dates.insert(*eid, date);
    }
    Ok(dates)
}

/// First three characters of a raw code, quotes removed.
pub fn truncate_code(raw: &str) -> String {
    strip_quotes(raw.trim()).chars().take(3).collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiagnosisOptions {
    pub unmapped_codes: UnmappedCodePolicy,
    pub filter: DiagnosisFilter,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiagnosisReport {
    /// Records that set at least one bit.
    pub encoded_records: usize,
    pub participants_with_diagnoses: usize,
    pub records_without_code: usize,
    /// Records of participants absent from the cohort.
    pub unknown_participants: usize,
    /// Records dropped by the baseline filter, undated ones included.
    pub filtered_records: usize,
    /// Truncated codes missing from the hierarchy, with their record count.
    pub unmapped_codes: BTreeMap<String, usize>,
}

#[derive(Debug, Clone)]
pub struct DiagnosisEncoding {
    pub level1: FeatureMatrix,
    pub level2: FeatureMatrix,
    pub report: DiagnosisReport,
}

/// Encode diagnoses into level-1 and level-2 indicator matrices.
///
/// Rows follow `eids`, so participants without any diagnosis keep an
/// all-zero row. Column order is the hierarchy's category order.
pub fn encode_diagnoses(
    eids: &[ParticipantId],
    diagnoses: &[JoinedDiagnosis],
    hierarchy: &CodeHierarchy,
    options: &DiagnosisOptions,
    baseline: Option<&BaselineDates>,
) -> Result<DiagnosisEncoding> {
    if options.filter == DiagnosisFilter::BeforeBaseline && baseline.is_none() {
        return Err(CohortError::schema(
            "baseline dates are required to keep diagnoses before baseline",
        ));
    }
    let rows: BTreeMap<ParticipantId, usize> = eids
        .iter()
        .enumerate()
        .map(|(row, eid)| (*eid, row))
        .collect();
    let mut level1 = FeatureMatrix::zeros(
        "icd10level1",
        eids.to_vec(),
        hierarchy.level1_categories().to_vec(),
    );
    let mut level2 = FeatureMatrix::zeros(
        "icd10level2",
        eids.to_vec(),
        hierarchy.level2_categories().to_vec(),
    );
    let mut report = DiagnosisReport::default();
    let mut diagnosed = vec![false; eids.len()];

    for diagnosis in diagnoses {
        let eid = diagnosis.key.eid;
        let Some(&row) = rows.get(&eid) else {
            report.unknown_participants += 1;
            continue;
        };
        let Some(raw) = diagnosis.code.as_deref() else {
            report.records_without_code += 1;
            continue;
        };
        if let (DiagnosisFilter::BeforeBaseline, Some(baseline)) = (options.filter, baseline) {
            let before = match (diagnosis.admission_date, baseline.get(&eid).copied().flatten()) {
                (Some(admitted), Some(assessed)) => admitted < assessed,
                _ => false,
            };
            if !before {
                report.filtered_records += 1;
                continue;
            }
        }

        let code = truncate_code(raw);
        let level1_column = hierarchy.level1_index(&code);
        let level2_column = hierarchy.level2_index(&code);
        let (Some(level1_column), Some(level2_column)) = (level1_column, level2_column) else {
            if options.unmapped_codes == UnmappedCodePolicy::Fail {
                return Err(CohortError::Lookup {
                    code,
                    eid,
                    level: if level1_column.is_none() {
                        "level-1"
                    } else {
                        "level-2"
                    },
                });
            }
            *report.unmapped_codes.entry(code).or_default() += 1;
            continue;
        };
        level1.set(row, level1_column);
        level2.set(row, level2_column);
        report.encoded_records += 1;
        diagnosed[row] = true;
    }

    report.participants_with_diagnoses = diagnosed.iter().filter(|flag| **flag).count();
    if report.unknown_participants > 0 {
        warn!(
            records = report.unknown_participants,
            "diagnoses for participants outside the cohort were skipped"
        );
    }
    if !report.unmapped_codes.is_empty() {
        warn!(
            distinct_codes = report.unmapped_codes.len(),
            records = report.unmapped_codes.values().sum::<usize>(),
            "unmapped diagnosis codes were excluded"
        );
    }
    info!(
        encoded_records = report.encoded_records,
        participants_with_diagnoses = report.participants_with_diagnoses,
        filtered_records = report.filtered_records,
        "diagnoses encoded"
    );
    Ok(DiagnosisEncoding {
        level1,
        level2,
        report,
    })
}
