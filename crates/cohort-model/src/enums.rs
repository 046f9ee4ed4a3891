//! Declared value types of cohort fields.
//!
//! The field catalog spells value types the way the data showcase does
//! (`Categorical (single)`); internally they are normalized to tags such as
//! `Categorical_single`, which also name the output files.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::CohortError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ValueType {
    Integer,
    #[serde(rename = "Categorical_single")]
    CategoricalSingle,
    #[serde(rename = "Categorical_multiple")]
    CategoricalMultiple,
    Continuous,
    Text,
    Date,
    Time,
    Compound,
}

impl ValueType {
    pub const ALL: [ValueType; 8] = [
        ValueType::Integer,
        ValueType::CategoricalSingle,
        ValueType::CategoricalMultiple,
        ValueType::Continuous,
        ValueType::Text,
        ValueType::Date,
        ValueType::Time,
        ValueType::Compound,
    ];

    /// Types that the pipeline turns into matrices.
    pub const ENCODED: [ValueType; 4] = [
        ValueType::CategoricalMultiple,
        ValueType::CategoricalSingle,
        ValueType::Continuous,
        ValueType::Integer,
    ];

    /// Normalized tag, used for file stems.
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueType::Integer => "Integer",
            ValueType::CategoricalSingle => "Categorical_single",
            ValueType::CategoricalMultiple => "Categorical_multiple",
            ValueType::Continuous => "Continuous",
            ValueType::Text => "Text",
            ValueType::Date => "Date",
            ValueType::Time => "Time",
            ValueType::Compound => "Compound",
        }
    }

    pub fn is_categorical(&self) -> bool {
        matches!(
            self,
            ValueType::CategoricalSingle | ValueType::CategoricalMultiple
        )
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, ValueType::Integer | ValueType::Continuous)
    }

    /// Normalize a catalog spelling: `" ("` becomes `"_"` and `")"` is dropped.
    pub fn normalize_label(raw: &str) -> String {
        raw.trim().replace(" (", "_").replace(')', "")
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValueType {
    type Err = CohortError;

    /// Accepts both the catalog spelling and the normalized tag.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = Self::normalize_label(s);
        Self::ALL
            .into_iter()
            .find(|value_type| value_type.as_str() == normalized)
            .ok_or_else(|| CohortError::UnknownValueType(s.to_string()))
    }
}
