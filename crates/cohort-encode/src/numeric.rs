//! Integer and continuous fields: split into single and multiple tables.
//!
//! Values pass through as text. Integer fields use negative codes for
//! special answers ("do not know", "prefer not to answer"), so any integer
//! value starting with a minus sign is written as missing. Continuous
//! values are never masked.

use serde::Serialize;
use tracing::debug;

use cohort_ingest::SourceTable;
use cohort_model::{CohortError, FeatureMatrix, MISSING_MARKER, Result, ValueType, is_missing};

use crate::classify::{ColumnSelection, SelectedColumn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SplitReport {
    pub value_type: ValueType,
    pub single_columns: usize,
    pub multiple_columns: usize,
    /// Integer special codes replaced by the missing marker.
    pub masked_values: usize,
}

#[derive(Debug, Clone)]
pub struct NumericSplit {
    pub single: FeatureMatrix,
    pub multiple: FeatureMatrix,
    pub report: SplitReport,
}

/// Split a numeric selection into `<Type>_single` and `<Type>_multiple`.
pub fn split_numeric(table: &SourceTable, selection: &ColumnSelection) -> Result<NumericSplit> {
    let value_type = selection.value_type;
    if !value_type.is_numeric() {
        return Err(CohortError::schema(format!(
            "{value_type} is not a numeric value type"
        )));
    }
    let single_columns = selection.single_columns();
    let multiple_columns = selection.multiple_columns();
    let mut masked_values = 0;
    let single = passthrough(
        table,
        format!("{value_type}_single"),
        &single_columns,
        value_type,
        &mut masked_values,
    )?;
    let multiple = passthrough(
        table,
        format!("{value_type}_multiple"),
        &multiple_columns,
        value_type,
        &mut masked_values,
    )?;
    debug!(
        value_type = %value_type,
        single_columns = single_columns.len(),
        multiple_columns = multiple_columns.len(),
        masked_values,
        "numeric fields split"
    );
    Ok(NumericSplit {
        single,
        multiple,
        report: SplitReport {
            value_type,
            single_columns: single_columns.len(),
            multiple_columns: multiple_columns.len(),
            masked_values,
        },
    })
}

fn passthrough(
    table: &SourceTable,
    name: String,
    columns: &[SelectedColumn],
    value_type: ValueType,
    masked_values: &mut usize,
) -> Result<FeatureMatrix> {
    let headers = columns
        .iter()
        .map(|column| table.header().name(column.index).to_string())
        .collect();
    let mut matrix = FeatureMatrix::text(name, headers);
    for (row, eid) in table.eids().iter().enumerate() {
        let mut values = Vec::with_capacity(columns.len());
        for column in columns {
            let raw = table.value(row, column.index).trim();
            let value = if is_missing(raw) {
                MISSING_MARKER
            } else if value_type == ValueType::Integer && raw.starts_with('-') {
                *masked_values += 1;
                MISSING_MARKER
            } else {
                raw
            };
            values.push(value.to_string());
        }
        matrix.push_text_row(*eid, values)?;
    }
    Ok(matrix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::classify_columns;
    use cohort_ingest::{parse_field_catalog, parse_source_table};

    const CATALOG: &str = "FieldID\tValueType\n\
        1160\tInteger\n\
        1558\tInteger\n\
        4079\tInteger\n\
        4080\tContinuous\n\
        21001\tContinuous\n\
        31\tCategorical (single)\n";

    const SOURCE: &str = "f.eid\tf.1160.0.0\tf.1558.0.0\tf.4079.0.0\tf.4079.0.1\t\
        f.4080.0.0\tf.4080.0.1\tf.21001.0.0\tf.31.0.0\n\
        1000001\t-3\t2\t-1\t88\t-3\t140\t27.5\t1\n\
        1000002\t7\t\t79\t\t132\tNA\t-0.5\t0\n";

    fn split(value_type: ValueType) -> NumericSplit {
        let catalog = parse_field_catalog(CATALOG).unwrap();
        let table = parse_source_table(SOURCE).unwrap();
        let selection = classify_columns(table.header(), &catalog, value_type);
        split_numeric(&table, &selection).unwrap()
    }

    fn rows(matrix: &FeatureMatrix) -> Vec<Vec<&str>> {
        (0..matrix.height())
            .map(|row| matrix.row_values(row).collect())
            .collect()
    }

    #[test]
    fn integer_special_codes_become_missing() {
        let split = split(ValueType::Integer);
        assert_eq!(split.single.name(), "Integer_single");
        assert_eq!(split.single.columns(), ["f.1160.0.0", "f.1558.0.0"]);
        assert_eq!(rows(&split.single), vec![vec!["NA", "2"], vec!["7", "NA"]]);
    }

    #[test]
    fn integer_special_codes_are_masked_in_multiple_instances() {
        let split = split(ValueType::Integer);
        assert_eq!(split.multiple.name(), "Integer_multiple");
        assert_eq!(split.multiple.columns(), ["f.4079.0.0", "f.4079.0.1"]);
        assert_eq!(
            rows(&split.multiple),
            vec![vec!["NA", "88"], vec!["79", "NA"]]
        );
        // -3 in the single table and -1 in the multiple table
        assert_eq!(split.report.masked_values, 2);
        assert_eq!(split.report.multiple_columns, 2);
    }

    #[test]
    fn continuous_negative_values_are_kept() {
        let split = split(ValueType::Continuous);
        assert_eq!(split.single.columns(), ["f.21001.0.0"]);
        assert_eq!(split.multiple.columns(), ["f.4080.0.0", "f.4080.0.1"]);
        assert_eq!(split.multiple.cell(0, 0), "-3");
        assert_eq!(split.multiple.cell(1, 1), "NA");
        assert_eq!(split.single.cell(1, 0), "-0.5");
        assert_eq!(split.report.masked_values, 0);
    }

    #[test]
    fn categorical_selection_is_rejected() {
        let catalog = parse_field_catalog(CATALOG).unwrap();
        let table = parse_source_table(SOURCE).unwrap();
        let selection = classify_columns(table.header(), &catalog, ValueType::CategoricalSingle);
        assert!(matches!(
            split_numeric(&table, &selection),
            Err(CohortError::Schema { .. })
        ));
    }
}
