//! Dense per-participant feature matrices.
//!
//! Every stage of the pipeline produces a [`FeatureMatrix`]: one row per
//! participant in cohort order, a leading `eid` column implied by
//! [`FeatureMatrix::eids`], and named feature columns. One-hot stages store
//! indicator bits; passthrough stages store the raw text values.

use crate::{CohortError, ParticipantId, Result};

/// Marker written for missing values, on input and output.
pub const MISSING_MARKER: &str = "NA";

/// True for the empty string and the missing marker.
pub fn is_missing(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed.is_empty() || trimmed == MISSING_MARKER
}

/// Remove surrounding quote characters, keeping inner whitespace.
pub fn strip_quotes(value: &str) -> &str {
    value.trim_matches('"')
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Cells {
    Indicator(Vec<u8>),
    Text(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureMatrix {
    name: String,
    eids: Vec<ParticipantId>,
    columns: Vec<String>,
    cells: Cells,
}

impl FeatureMatrix {
    /// An all-zero indicator matrix with one row per participant.
    pub fn zeros(name: impl Into<String>, eids: Vec<ParticipantId>, columns: Vec<String>) -> Self {
        let len = eids.len() * columns.len();
        Self {
            name: name.into(),
            eids,
            columns,
            cells: Cells::Indicator(vec![0; len]),
        }
    }

    /// An empty text matrix; rows are appended with [`FeatureMatrix::push_text_row`].
    pub fn text(name: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            eids: Vec::new(),
            columns,
            cells: Cells::Text(Vec::new()),
        }
    }

    pub fn push_text_row(&mut self, eid: ParticipantId, values: Vec<String>) -> Result<()> {
        if values.len() != self.columns.len() {
            return Err(CohortError::data_integrity(format!(
                "{}: row for participant {eid} has {} values, expected {}",
                self.name,
                values.len(),
                self.columns.len()
            )));
        }
        match &mut self.cells {
            Cells::Text(cells) => cells.extend(values),
            Cells::Indicator(_) => {
                return Err(CohortError::data_integrity(format!(
                    "{}: cannot append text values to an indicator matrix",
                    self.name
                )));
            }
        }
        self.eids.push(eid);
        Ok(())
    }

    /// Set an indicator bit. Panics if the position is out of range.
    pub fn set(&mut self, row: usize, column: usize) {
        let width = self.columns.len();
        assert!(column < width, "column {column} out of range");
        if let Cells::Indicator(cells) = &mut self.cells {
            cells[row * width + column] = 1;
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn eids(&self) -> &[ParticipantId] {
        &self.eids
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn height(&self) -> usize {
        self.eids.len()
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn is_indicator(&self) -> bool {
        matches!(self.cells, Cells::Indicator(_))
    }

    pub fn cell(&self, row: usize, column: usize) -> &str {
        let offset = row * self.columns.len() + column;
        match &self.cells {
            Cells::Indicator(cells) => {
                if cells[offset] == 0 {
                    "0"
                } else {
                    "1"
                }
            }
            Cells::Text(cells) => &cells[offset],
        }
    }

    /// Indicator bits of one row; empty for text matrices.
    pub fn indicator_row(&self, row: usize) -> &[u8] {
        match &self.cells {
            Cells::Indicator(cells) => {
                let width = self.columns.len();
                &cells[row * width..(row + 1) * width]
            }
            Cells::Text(_) => &[],
        }
    }

    pub fn row_values(&self, row: usize) -> impl Iterator<Item = &str> + '_ {
        (0..self.columns.len()).map(move |column| self.cell(row, column))
    }

    pub fn row_of(&self, eid: ParticipantId) -> Option<usize> {
        self.eids.iter().position(|candidate| *candidate == eid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eids(values: &[u64]) -> Vec<ParticipantId> {
        values.iter().copied().map(ParticipantId::new).collect()
    }

    #[test]
    fn indicator_matrix_starts_zeroed() {
        let mut matrix = FeatureMatrix::zeros(
            "onehot",
            eids(&[1, 2]),
            vec!["a".to_string(), "b".to_string()],
        );
        matrix.set(1, 0);
        assert_eq!(matrix.indicator_row(0), &[0, 0]);
        assert_eq!(matrix.indicator_row(1), &[1, 0]);
        assert_eq!(matrix.row_values(1).collect::<Vec<_>>(), vec!["1", "0"]);
    }

    #[test]
    fn text_rows_must_match_width() {
        let mut matrix = FeatureMatrix::text("Integer_single", vec!["f.1.0.0".to_string()]);
        matrix
            .push_text_row(ParticipantId::new(7), vec!["3".to_string()])
            .unwrap();
        let error = matrix
            .push_text_row(ParticipantId::new(8), vec![])
            .unwrap_err();
        assert!(matches!(error, CohortError::DataIntegrity { .. }));
        assert_eq!(matrix.height(), 1);
        assert_eq!(matrix.cell(0, 0), "3");
    }

    #[test]
    fn missing_values_include_marker_and_blank() {
        assert!(is_missing("NA"));
        assert!(is_missing("  "));
        assert!(!is_missing("0"));
        assert_eq!(strip_quotes("\"Prefer not to answer\""), "Prefer not to answer");
    }
}
