use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{CohortError, FieldId, Result, ValueType};

/// A catalog entry: field id, its description, showcase category and value type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub id: FieldId,
    pub description: String,
    pub category: String,
    pub value_type: ValueType,
}

/// Field id to declared value type lookup, in catalog file order.
#[derive(Debug, Clone, Default)]
pub struct FieldCatalog {
    fields: Vec<Field>,
    index: BTreeMap<FieldId, usize>,
}

impl FieldCatalog {
    pub fn new(fields: Vec<Field>) -> Result<Self> {
        let mut index = BTreeMap::new();
        for (position, field) in fields.iter().enumerate() {
            if index.insert(field.id, position).is_some() {
                return Err(CohortError::data_integrity(format!(
                    "field {} appears more than once in the field catalog",
                    field.id
                )));
            }
        }
        Ok(Self { fields, index })
    }

    pub fn get(&self, id: FieldId) -> Option<&Field> {
        self.index.get(&id).map(|&position| &self.fields[position])
    }

    pub fn value_type(&self, id: FieldId) -> Option<ValueType> {
        self.get(id).map(|field| field.value_type)
    }

    /// Field ids of the given type, in catalog order.
    pub fn fields_of_type(&self, value_type: ValueType) -> Vec<FieldId> {
        self.fields
            .iter()
            .filter(|field| field.value_type == value_type)
            .map(|field| field.id)
            .collect()
    }

    pub fn count_by_type(&self) -> BTreeMap<ValueType, usize> {
        let mut counts = BTreeMap::new();
        for field in &self.fields {
            *counts.entry(field.value_type).or_insert(0) += 1;
        }
        counts
    }

    pub fn iter(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
