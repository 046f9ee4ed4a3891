//! Conversion of feature matrices to polars frames.

use anyhow::{Context, Result};
use polars::prelude::{Column, DataFrame, NamedFrom, Series};

use cohort_model::FeatureMatrix;

/// Name of the leading participant id column in every output.
pub const EID_COLUMN: &str = "eid";

/// Build a frame with `eid` (u64) first, then one column per feature.
///
/// Indicator matrices become `u32` columns of 0/1. Text matrices keep
/// their values as strings, the missing marker included.
pub fn matrix_to_frame(matrix: &FeatureMatrix) -> Result<DataFrame> {
    let height = matrix.height();
    let mut columns: Vec<Column> = Vec::with_capacity(matrix.width() + 1);
    let eids: Vec<u64> = matrix.eids().iter().map(|eid| eid.get()).collect();
    columns.push(Series::new(EID_COLUMN.into(), eids).into());
    for (idx, name) in matrix.columns().iter().enumerate() {
        let series = if matrix.is_indicator() {
            let values: Vec<u32> = (0..height)
                .map(|row| u32::from(matrix.indicator_row(row)[idx]))
                .collect();
            Series::new(name.as_str().into(), values)
        } else {
            let values: Vec<&str> = (0..height).map(|row| matrix.cell(row, idx)).collect();
            Series::new(name.as_str().into(), values)
        };
        columns.push(series.into());
    }
    DataFrame::new(columns).with_context(|| format!("build frame for {}", matrix.name()))
}

/// Participant ids of a frame, in row order.
pub fn frame_eids(frame: &DataFrame) -> Result<Vec<Option<u64>>> {
    let column = frame
        .column(EID_COLUMN)
        .with_context(|| format!("frame has no {EID_COLUMN} column"))?;
    let values = column
        .as_materialized_series()
        .u64()
        .with_context(|| format!("{EID_COLUMN} column is not an unsigned integer"))?;
    Ok(values.into_iter().collect())
}
