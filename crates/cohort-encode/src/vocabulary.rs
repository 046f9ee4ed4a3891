//! Categorical vocabularies.
//!
//! A vocabulary is the sorted set of distinct non-missing values observed
//! for one field across every participant and every selected column of
//! that field. Encoding must not start before all vocabularies are final,
//! otherwise column positions would depend on row order.

use std::collections::{BTreeMap, BTreeSet};
use std::io::{self, Write};

use tracing::debug;

use cohort_ingest::SourceTable;
use cohort_model::{FieldId, ValueType, is_missing, strip_quotes};

use crate::classify::ColumnSelection;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vocabulary {
    field: FieldId,
    /// Byte-lexicographic order, no duplicates.
    categories: Vec<String>,
}

impl Vocabulary {
    pub fn new(field: FieldId, categories: impl IntoIterator<Item = String>) -> Self {
        let categories: BTreeSet<String> = categories.into_iter().collect();
        Self {
            field,
            categories: categories.into_iter().collect(),
        }
    }

    pub fn field(&self) -> FieldId {
        self.field
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    /// Observed categories plus the missing sentinel.
    pub fn len_with_sentinel(&self) -> usize {
        self.categories.len() + 1
    }

    pub fn index_of(&self, category: &str) -> Option<usize> {
        self.categories
            .binary_search_by(|candidate| candidate.as_str().cmp(category))
            .ok()
    }

    pub fn contains(&self, category: &str) -> bool {
        self.index_of(category).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

/// Vocabularies of one categorical type, keyed and iterated by field id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VocabularySet {
    value_type: ValueType,
    vocabularies: BTreeMap<FieldId, Vocabulary>,
}

impl VocabularySet {
    pub fn new(value_type: ValueType, vocabularies: impl IntoIterator<Item = Vocabulary>) -> Self {
        Self {
            value_type,
            vocabularies: vocabularies
                .into_iter()
                .map(|vocabulary| (vocabulary.field, vocabulary))
                .collect(),
        }
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    pub fn get(&self, field: FieldId) -> Option<&Vocabulary> {
        self.vocabularies.get(&field)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Vocabulary> {
        self.vocabularies.values()
    }

    pub fn len(&self) -> usize {
        self.vocabularies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vocabularies.is_empty()
    }

    /// Write one line per field: the field id then its categories, tab separated.
    pub fn write_possible_categories<W: Write>(&self, mut writer: W) -> io::Result<()> {
        for vocabulary in self.iter() {
            write!(writer, "{}", vocabulary.field)?;
            for category in &vocabulary.categories {
                write!(writer, "\t{category}")?;
            }
            writeln!(writer)?;
        }
        writer.flush()
    }
}

/// Scan every row of the selected columns and collect per-field categories.
///
/// Fields whose columns hold only missing values still get an (empty)
/// vocabulary so they keep their sentinel column.
pub fn build_vocabularies(table: &SourceTable, selection: &ColumnSelection) -> VocabularySet {
    let mut observed: BTreeMap<FieldId, BTreeSet<String>> = selection
        .fields
        .iter()
        .map(|field| (*field, BTreeSet::new()))
        .collect();

    for column in &selection.columns {
        let Some(categories) = observed.get_mut(&column.key.field) else {
            continue;
        };
        for raw in table.column_values(column.index) {
            let value = strip_quotes(raw);
            if is_missing(value) {
                continue;
            }
            if !categories.contains(value) {
                categories.insert(value.to_string());
            }
        }
    }

    let set = VocabularySet::new(
        selection.value_type,
        observed
            .into_iter()
            .map(|(field, categories)| Vocabulary::new(field, categories)),
    );
    debug!(
        value_type = %set.value_type,
        field_count = set.len(),
        category_count = set.iter().map(|v| v.categories.len()).sum::<usize>(),
        "vocabularies built"
    );
    set
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::classify_columns;
    use cohort_ingest::{parse_field_catalog, parse_source_table};

    fn field(id: u32) -> FieldId {
        FieldId::new(id).unwrap()
    }

    fn vocabularies(source: &str) -> VocabularySet {
        let catalog = parse_field_catalog(
            "FieldID\tValueType\n20002\tCategorical (multiple)\n6150\tCategorical (multiple)\n",
        )
        .unwrap();
        let table = parse_source_table(source).unwrap();
        let selection = classify_columns(
            table.header(),
            &catalog,
            ValueType::CategoricalMultiple,
        );
        build_vocabularies(&table, &selection)
    }

    #[test]
    fn collects_distinct_values_across_instances_and_rows() {
        let set = vocabularies(
            "f.eid\tf.20002.0.0\tf.20002.0.1\tf.20002.1.0\n\
             1\t1065\t1223\t9999\n\
             2\t\"1223\"\tNA\t\n\
             3\t\t1074\t\n",
        );
        let vocabulary = set.get(field(20002)).unwrap();
        // Visit 1 values are not part of the vocabulary.
        assert_eq!(vocabulary.categories(), ["1065", "1074", "1223"]);
        assert_eq!(vocabulary.len_with_sentinel(), 4);
        assert_eq!(vocabulary.index_of("1074"), Some(1));
        assert!(!vocabulary.contains("9999"));
    }

    #[test]
    fn categories_sort_as_strings() {
        let set = vocabularies("f.eid\tf.6150.0.0\n1\t10\n2\t9\n3\t-7\n4\t100\n");
        assert_eq!(
            set.get(field(6150)).unwrap().categories(),
            ["-7", "10", "100", "9"]
        );
    }

    #[test]
    fn all_missing_field_keeps_an_empty_vocabulary() {
        let set = vocabularies("f.eid\tf.6150.0.0\tf.20002.0.0\n1\tNA\t1065\n2\t\t1065\n");
        let vocabulary = set.get(field(6150)).unwrap();
        assert!(vocabulary.is_empty());
        assert_eq!(vocabulary.len_with_sentinel(), 1);
    }

    #[test]
    fn possible_categories_list_fields_in_numeric_order() {
        let set = vocabularies("f.eid\tf.6150.0.0\tf.20002.0.0\n1\t1\t1065\n2\t3\t1065\n");
        let mut out = Vec::new();
        set.write_possible_categories(&mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "6150\t1\t3\n20002\t1065\n");
    }
}
