//! One-hot encoding of categorical fields.
//!
//! Each surviving field contributes one column per observed category plus a
//! trailing missing sentinel. Column positions are assigned from the
//! finished vocabularies in field id order, so the same inputs always give
//! the same layout.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::{info, warn};

use cohort_ingest::SourceTable;
use cohort_model::{
    DEFAULT_EXCLUSION_THRESHOLD, FeatureMatrix, FieldId, MISSING_MARKER, ValueType, is_missing,
    strip_quotes,
};

use crate::classify::ColumnSelection;
use crate::vocabulary::VocabularySet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncoderOptions {
    /// A field is kept only if its category count, sentinel included, is
    /// strictly below this value.
    pub exclusion_threshold: usize,
}

impl Default for EncoderOptions {
    fn default() -> Self {
        Self {
            exclusion_threshold: DEFAULT_EXCLUSION_THRESHOLD,
        }
    }
}

impl EncoderOptions {
    pub fn keeps(&self, categories_with_sentinel: usize) -> bool {
        categories_with_sentinel < self.exclusion_threshold
    }
}

/// A field dropped for having too many categories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExcludedField {
    pub field: FieldId,
    /// Category count including the sentinel.
    pub categories: usize,
}

#[derive(Debug, Clone, Copy)]
struct Span {
    field: FieldId,
    start: usize,
}

/// Bijection between (field, category) pairs and output columns.
#[derive(Debug, Clone)]
pub struct ColumnIndex<'a> {
    vocabularies: &'a VocabularySet,
    /// Ordered by `start`, which follows field id order.
    spans: Vec<Span>,
    starts: BTreeMap<FieldId, usize>,
    excluded: Vec<ExcludedField>,
    width: usize,
}

impl<'a> ColumnIndex<'a> {
    pub fn new(vocabularies: &'a VocabularySet, options: &EncoderOptions) -> Self {
        let mut spans = Vec::new();
        let mut starts = BTreeMap::new();
        let mut excluded = Vec::new();
        let mut width = 0;
        for vocabulary in vocabularies.iter() {
            let len = vocabulary.len_with_sentinel();
            if !options.keeps(len) {
                excluded.push(ExcludedField {
                    field: vocabulary.field(),
                    categories: len,
                });
                continue;
            }
            spans.push(Span {
                field: vocabulary.field(),
                start: width,
            });
            starts.insert(vocabulary.field(), width);
            width += len;
        }
        Self {
            vocabularies,
            spans,
            starts,
            excluded,
            width,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn surviving_fields(&self) -> impl Iterator<Item = FieldId> + '_ {
        self.spans.iter().map(|span| span.field)
    }

    pub fn excluded(&self) -> &[ExcludedField] {
        &self.excluded
    }

    pub fn column_of(&self, field: FieldId, category: &str) -> Option<usize> {
        let start = *self.starts.get(&field)?;
        let offset = self.vocabularies.get(field)?.index_of(category)?;
        Some(start + offset)
    }

    pub fn sentinel_column(&self, field: FieldId) -> Option<usize> {
        let start = *self.starts.get(&field)?;
        let vocabulary = self.vocabularies.get(field)?;
        Some(start + vocabulary.categories().len())
    }

    /// Inverse lookup: the field and category behind a column. The category
    /// is `None` for the sentinel column.
    pub fn column(&self, column: usize) -> Option<(FieldId, Option<&'a str>)> {
        if column >= self.width {
            return None;
        }
        let position = self.spans.partition_point(|span| span.start <= column);
        let span = self.spans.get(position.checked_sub(1)?)?;
        let categories = self.vocabularies.get(span.field)?.categories();
        let category = categories
            .get(column - span.start)
            .map(|category| category.as_str());
        Some((span.field, category))
    }

    /// Output headers: `c.<field>.<category>` and `c.<field>.NA` for the sentinel.
    pub fn labels(&self) -> Vec<String> {
        (0..self.width)
            .filter_map(|column| self.column(column))
            .map(|(field, category)| {
                format!("c.{field}.{}", category.unwrap_or(MISSING_MARKER))
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EncodingReport {
    pub value_type: ValueType,
    pub surviving_fields: usize,
    pub excluded_fields: Vec<ExcludedField>,
    pub column_count: usize,
    /// Values absent from the vocabulary. Zero when the vocabulary was
    /// built from the same table.
    pub unrecognized_values: usize,
}

#[derive(Debug, Clone)]
pub struct CategoricalEncoding {
    pub matrix: FeatureMatrix,
    pub report: EncodingReport,
}

/// Encode every participant against finished vocabularies.
///
/// Rows follow the table's cohort order. For each surviving field the row
/// holds a 1 for every distinct category found across the field's columns,
/// or a single 1 in the sentinel column when the participant has no value
/// for the field at all.
pub fn encode_categorical(
    table: &SourceTable,
    selection: &ColumnSelection,
    vocabularies: &VocabularySet,
    options: &EncoderOptions,
) -> CategoricalEncoding {
    let index = ColumnIndex::new(vocabularies, options);
    let fields: Vec<(FieldId, Vec<usize>)> = index
        .surviving_fields()
        .map(|field| {
            let columns = selection
                .columns_of(field)
                .map(|column| column.index)
                .collect();
            (field, columns)
        })
        .collect();

    let mut matrix = FeatureMatrix::zeros(
        format!("{}.onehot", selection.value_type),
        table.eids().to_vec(),
        index.labels(),
    );
    let mut unrecognized_values = 0;
    for row in 0..table.row_count() {
        for (field, columns) in &fields {
            let mut any_value = false;
            for &source_column in columns {
                let value = strip_quotes(table.value(row, source_column));
                if is_missing(value) {
                    continue;
                }
                any_value = true;
                match index.column_of(*field, value) {
                    Some(column) => matrix.set(row, column),
                    None => unrecognized_values += 1,
                }
            }
            if !any_value && let Some(column) = index.sentinel_column(*field) {
                matrix.set(row, column);
            }
        }
    }

    for excluded in index.excluded() {
        info!(
            value_type = %selection.value_type,
            field = %excluded.field,
            categories = excluded.categories,
            threshold = options.exclusion_threshold,
            "field excluded from one-hot encoding"
        );
    }
    if unrecognized_values > 0 {
        warn!(
            value_type = %selection.value_type,
            unrecognized_values,
            "values missing from the vocabulary were not encoded"
        );
    }

    let report = EncodingReport {
        value_type: selection.value_type,
        surviving_fields: fields.len(),
        excluded_fields: index.excluded().to_vec(),
        column_count: index.width(),
        unrecognized_values,
    };
    CategoricalEncoding { matrix, report }
}

/// Recover the categories set for each field in one encoded row.
///
/// A field whose sentinel is set maps to an empty set.
pub fn decode_row(
    matrix: &FeatureMatrix,
    index: &ColumnIndex<'_>,
    row: usize,
) -> BTreeMap<FieldId, BTreeSet<String>> {
    let mut decoded: BTreeMap<FieldId, BTreeSet<String>> = BTreeMap::new();
    for (column, bit) in matrix.indicator_row(row).iter().enumerate() {
        if *bit == 0 {
            continue;
        }
        let Some((field, category)) = index.column(column) else {
            continue;
        };
        let categories = decoded.entry(field).or_default();
        if let Some(category) = category {
            categories.insert(category.to_string());
        }
    }
    decoded
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::classify_columns;
    use crate::vocabulary::{Vocabulary, build_vocabularies};
    use cohort_ingest::{parse_field_catalog, parse_source_table};

    fn field(id: u32) -> FieldId {
        FieldId::new(id).unwrap()
    }

    fn encode(source: &str, threshold: usize) -> (CategoricalEncoding, VocabularySet) {
        let catalog = parse_field_catalog(
            "FieldID\tValueType\n1239\tCategorical (single)\n31\tCategorical (single)\n",
        )
        .unwrap();
        let table = parse_source_table(source).unwrap();
        let selection = classify_columns(table.header(), &catalog, ValueType::CategoricalSingle);
        let vocabularies = build_vocabularies(&table, &selection);
        let options = EncoderOptions {
            exclusion_threshold: threshold,
        };
        let encoding = encode_categorical(&table, &selection, &vocabularies, &options);
        (encoding, vocabularies)
    }

    #[test]
    fn columns_follow_field_id_then_category_order() {
        let (encoding, _) = encode(
            "f.eid\tf.1239.0.0\tf.31.0.0\n1\t1\t0\n2\t-3\t1\n3\tNA\t0\n",
            50,
        );
        assert_eq!(
            encoding.matrix.columns(),
            [
                "c.31.0", "c.31.1", "c.31.NA", "c.1239.-3", "c.1239.1", "c.1239.NA"
            ]
        );
        assert_eq!(encoding.matrix.name(), "Categorical_single.onehot");
        assert_eq!(encoding.matrix.indicator_row(0), [1, 0, 0, 0, 1, 0]);
        assert_eq!(encoding.matrix.indicator_row(1), [0, 1, 0, 1, 0, 0]);
        assert_eq!(encoding.matrix.indicator_row(2), [1, 0, 0, 0, 0, 1]);
    }

    #[test]
    fn field_at_threshold_is_excluded() {
        // Field 1239 has two categories plus the sentinel.
        let source = "f.eid\tf.1239.0.0\tf.31.0.0\n1\t1\t0\n2\t2\t0\n";
        let (encoding, _) = encode(source, 3);
        assert_eq!(encoding.matrix.columns(), ["c.31.0", "c.31.NA"]);
        assert_eq!(
            encoding.report.excluded_fields,
            vec![ExcludedField {
                field: field(1239),
                categories: 3
            }]
        );
        let (encoding, _) = encode(source, 4);
        assert!(encoding.report.excluded_fields.is_empty());
        assert_eq!(encoding.matrix.width(), 5);
    }

    #[test]
    fn column_index_round_trips() {
        let vocabularies = VocabularySet::new(
            ValueType::CategoricalSingle,
            [
                Vocabulary::new(field(31), ["0".to_string(), "1".to_string()]),
                Vocabulary::new(field(54), ["11010".to_string()]),
            ],
        );
        let index = ColumnIndex::new(&vocabularies, &EncoderOptions::default());
        assert_eq!(index.width(), 5);
        for column in 0..index.width() {
            let (field, category) = index.column(column).unwrap();
            let back = match category {
                Some(category) => index.column_of(field, category),
                None => index.sentinel_column(field),
            };
            assert_eq!(back, Some(column));
        }
        assert_eq!(index.column(5), None);
        assert_eq!(index.column_of(field(54), "11011"), None);
    }

    #[test]
    fn unrecognized_values_are_counted() {
        let catalog =
            parse_field_catalog("FieldID\tValueType\n31\tCategorical (single)\n").unwrap();
        let table = parse_source_table("f.eid\tf.31.0.0\n1\t0\n2\t7\n").unwrap();
        let selection = classify_columns(table.header(), &catalog, ValueType::CategoricalSingle);
        let vocabularies = VocabularySet::new(
            ValueType::CategoricalSingle,
            [Vocabulary::new(field(31), ["0".to_string()])],
        );
        let encoding = encode_categorical(
            &table,
            &selection,
            &vocabularies,
            &EncoderOptions::default(),
        );
        assert_eq!(encoding.report.unrecognized_values, 1);
        // A present but unknown value does not set the sentinel.
        assert_eq!(encoding.matrix.indicator_row(1), [0, 0]);
    }
}
