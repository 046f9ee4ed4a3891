//! Column classification by declared value type.
//!
//! Only visit 0 is selected. Later visits exist in the source table but are
//! deliberately left out of every matrix.
//!
//! The single/multiple split is decided per field from the header alone: a
//! field is "multiple" when any of its selected columns has an instance
//! index above zero.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use cohort_ingest::SourceHeader;
use cohort_model::{CohortError, ColumnKey, FieldCatalog, FieldId, Result, ValueType};

/// A physical source column chosen for encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectedColumn {
    /// Position in the source table, `eid` being 0.
    pub index: usize,
    pub key: ColumnKey,
}

#[derive(Debug, Clone)]
pub struct ColumnSelection {
    pub value_type: ValueType,
    /// Catalog fields of this type that have at least one column, in catalog order.
    pub fields: Vec<FieldId>,
    /// Visit-0 columns, grouped by field in catalog order, header order within a field.
    pub columns: Vec<SelectedColumn>,
    /// Fields with data at instance > 0.
    pub multiple_fields: BTreeSet<FieldId>,
    /// Catalog fields of this type without any column in the header.
    pub absent_fields: Vec<FieldId>,
}

impl ColumnSelection {
    pub fn column_indices(&self) -> Vec<usize> {
        self.columns.iter().map(|column| column.index).collect()
    }

    pub fn is_multiple(&self, field: FieldId) -> bool {
        self.multiple_fields.contains(&field)
    }

    pub fn columns_of(&self, field: FieldId) -> impl Iterator<Item = &SelectedColumn> + '_ {
        self.columns
            .iter()
            .filter(move |column| column.key.field == field)
    }

    /// Columns of single-instance fields, in selection order.
    pub fn single_columns(&self) -> Vec<SelectedColumn> {
        self.columns
            .iter()
            .filter(|column| !self.is_multiple(column.key.field))
            .copied()
            .collect()
    }

    /// Columns of multiple-instance fields, in selection order.
    pub fn multiple_columns(&self) -> Vec<SelectedColumn> {
        self.columns
            .iter()
            .filter(|column| self.is_multiple(column.key.field))
            .copied()
            .collect()
    }

    /// Fails when the type has no column at all in the source table.
    ///
    /// Sparse catalogs make this common; callers usually log it and carry
    /// on with empty outputs.
    pub fn require_columns(&self) -> Result<()> {
        if self.columns.is_empty() {
            return Err(CohortError::schema(format!(
                "no {} columns found in the source table ({} catalog fields absent)",
                self.value_type,
                self.absent_fields.len()
            )));
        }
        Ok(())
    }
}

/// Select the visit-0 columns of every catalog field of `value_type`.
pub fn classify_columns(
    header: &SourceHeader,
    catalog: &FieldCatalog,
    value_type: ValueType,
) -> ColumnSelection {
    let mut by_field: BTreeMap<FieldId, Vec<SelectedColumn>> = BTreeMap::new();
    for (index, key) in header.field_columns() {
        if key.is_first_visit() {
            by_field
                .entry(key.field)
                .or_default()
                .push(SelectedColumn { index, key });
        }
    }

    let mut fields = Vec::new();
    let mut columns = Vec::new();
    let mut multiple_fields = BTreeSet::new();
    let mut absent_fields = Vec::new();
    for field in catalog.fields_of_type(value_type) {
        let Some(field_columns) = by_field.remove(&field) else {
            absent_fields.push(field);
            continue;
        };
        if field_columns.iter().any(|column| column.key.instance > 0) {
            multiple_fields.insert(field);
        }
        fields.push(field);
        columns.extend(field_columns);
    }

    debug!(
        value_type = %value_type,
        field_count = fields.len(),
        column_count = columns.len(),
        multiple_field_count = multiple_fields.len(),
        absent_field_count = absent_fields.len(),
        "columns classified"
    );
    ColumnSelection {
        value_type,
        fields,
        columns,
        multiple_fields,
        absent_fields,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cohort_ingest::parse_field_catalog;

    fn header(names: &[&str]) -> SourceHeader {
        SourceHeader::parse(names.iter().map(|name| (*name).to_string()).collect()).unwrap()
    }

    fn catalog() -> FieldCatalog {
        parse_field_catalog(
            "FieldID\tDescription\tCategory\tValueType\n\
             50\tStanding height\t100010\tContinuous\n\
             4080\tSystolic blood pressure\t100011\tContinuous\n\
             31\tSex\t100094\tCategorical (single)\n\
             21001\tBody mass index (BMI)\t100010\tContinuous\n",
        )
        .unwrap()
    }

    #[test]
    fn selects_first_visit_columns_in_catalog_order() {
        let header = header(&[
            "f.eid",
            "f.4080.0.0",
            "f.4080.0.1",
            "f.4080.1.0",
            "f.31.0.0",
            "f.50.0.0",
            "f.50.1.0",
        ]);
        let selection = classify_columns(&header, &catalog(), ValueType::Continuous);
        assert_eq!(selection.column_indices(), vec![5, 1, 2]);
        assert_eq!(
            selection.fields,
            vec![FieldId::new(50).unwrap(), FieldId::new(4080).unwrap()]
        );
        assert_eq!(selection.absent_fields, vec![FieldId::new(21001).unwrap()]);
    }

    #[test]
    fn multiple_instance_fields_are_split_from_the_header() {
        let header = header(&["f.eid", "f.4080.0.0", "f.4080.0.1", "f.50.0.0", "f.50.1.3"]);
        let selection = classify_columns(&header, &catalog(), ValueType::Continuous);
        assert!(selection.is_multiple(FieldId::new(4080).unwrap()));
        // Instances at later visits do not make a field multiple.
        assert!(!selection.is_multiple(FieldId::new(50).unwrap()));
        let single: Vec<usize> = selection.single_columns().iter().map(|c| c.index).collect();
        let multiple: Vec<usize> = selection
            .multiple_columns()
            .iter()
            .map(|c| c.index)
            .collect();
        assert_eq!(single, vec![3]);
        assert_eq!(multiple, vec![1, 2]);
    }

    #[test]
    fn type_without_columns_is_a_schema_error() {
        let header = header(&["f.eid", "f.31.0.0"]);
        let selection = classify_columns(&header, &catalog(), ValueType::Continuous);
        assert!(selection.columns.is_empty());
        assert!(matches!(
            selection.require_columns(),
            Err(CohortError::Schema { .. })
        ));
        let selection = classify_columns(&header, &catalog(), ValueType::CategoricalSingle);
        assert!(selection.require_columns().is_ok());
    }
}
