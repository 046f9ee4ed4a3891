//! Positional assembly of partial matrices into `features_merged`.
//!
//! Partials are concatenated column-wise. They must describe the same
//! participants in the same order; that is checked row by row rather than
//! trusted.

use std::collections::BTreeSet;

use anyhow::{Context, Result, anyhow};
use polars::prelude::DataFrame;
use tracing::debug;

use cohort_model::{CohortError, FeatureMatrix};

use crate::frame::{EID_COLUMN, frame_eids, matrix_to_frame};

/// Order in which partial matrices are merged.
pub const MERGE_ORDER: [&str; 8] = [
    "Continuous_single",
    "Continuous_multiple",
    "Integer_single",
    "Integer_multiple",
    "Categorical_single.onehot",
    "Categorical_multiple.onehot",
    "icd10level2",
    "icd10level1",
];

/// Concatenate frames that each start with `eid`.
///
/// The result keeps the first frame's `eid` column followed by every other
/// column in order. Row count or eid mismatches are integrity errors, a
/// repeated column name is a schema error.
pub fn assemble(parts: &[DataFrame]) -> Result<DataFrame> {
    let (first, rest) = parts
        .split_first()
        .ok_or_else(|| anyhow!("no partial matrices to assemble"))?;
    let eids = frame_eids(first).context("read eids of the first partial matrix")?;
    let mut names: BTreeSet<String> = first
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();
    let mut merged = first.clone();

    for (offset, part) in rest.iter().enumerate() {
        let position = offset + 1;
        if part.height() != merged.height() {
            return Err(CohortError::data_integrity(format!(
                "partial matrix {position} has {} rows, expected {}",
                part.height(),
                merged.height()
            ))
            .into());
        }
        let part_eids =
            frame_eids(part).with_context(|| format!("read eids of partial matrix {position}"))?;
        if let Some(row) = eids
            .iter()
            .zip(&part_eids)
            .position(|(expected, found)| expected != found)
        {
            return Err(CohortError::data_integrity(format!(
                "partial matrix {position} is misaligned at row {row}: eid {:?}, expected {:?}",
                part_eids[row], eids[row]
            ))
            .into());
        }

        let features = part
            .drop(EID_COLUMN)
            .with_context(|| format!("drop eid from partial matrix {position}"))?;
        for name in features.get_column_names() {
            if !names.insert(name.to_string()) {
                return Err(CohortError::schema(format!(
                    "column {name} appears in more than one partial matrix"
                ))
                .into());
            }
        }
        merged = merged
            .hstack(features.get_columns())
            .with_context(|| format!("append partial matrix {position}"))?;
    }
    debug!(
        partial_count = parts.len(),
        column_count = merged.width(),
        row_count = merged.height(),
        "partial matrices assembled"
    );
    Ok(merged)
}

/// Convert and assemble matrices in the order given.
pub fn assemble_matrices(matrices: &[&FeatureMatrix]) -> Result<DataFrame> {
    let frames = matrices
        .iter()
        .map(|matrix| matrix_to_frame(matrix))
        .collect::<Result<Vec<_>>>()?;
    assemble(&frames)
}
