use std::fmt;
use std::str::FromStr;

use crate::CohortError;

/// Numeric identifier of a measured field (e.g. `31` for sex).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct FieldId(u32);

impl FieldId {
    pub fn new(value: u32) -> Result<Self, CohortError> {
        if value == 0 {
            return Err(CohortError::InvalidFieldId(value.to_string()));
        }
        Ok(Self(value))
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl FromStr for FieldId {
    type Err = CohortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(CohortError::InvalidFieldId(s.to_string()));
        }
        let value = trimmed
            .parse::<u32>()
            .map_err(|_| CohortError::InvalidFieldId(s.to_string()))?;
        Self::new(value).map_err(|_| CohortError::InvalidFieldId(s.to_string()))
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Participant identifier (`eid`).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct ParticipantId(u64);

impl ParticipantId {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl FromStr for ParticipantId {
    type Err = CohortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_matches('"');
        trimmed
            .parse::<u64>()
            .map(Self)
            .map_err(|_| CohortError::InvalidParticipantId(s.to_string()))
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One physical source column: `f.<field>.<visit>.<instance>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ColumnKey {
    pub field: FieldId,
    pub visit: u32,
    pub instance: u32,
}

impl ColumnKey {
    pub fn new(field: FieldId, visit: u32, instance: u32) -> Self {
        Self {
            field,
            visit,
            instance,
        }
    }

    /// Parse a column header. Returns `Ok(None)` for the participant id column.
    pub fn parse_header(raw: &str) -> Result<Option<Self>, CohortError> {
        let name = raw.trim().trim_matches('"');
        if is_eid_header(name) {
            return Ok(None);
        }
        name.parse().map(Some)
    }

    pub fn is_first_visit(&self) -> bool {
        self.visit == 0
    }
}

/// Accepts both the dotted (`f.eid`) and bare (`eid`) spellings.
pub fn is_eid_header(name: &str) -> bool {
    name == "eid" || name == "f.eid"
}

impl FromStr for ColumnKey {
    type Err = CohortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CohortError::InvalidColumnName(s.to_string());
        let rest = s.strip_prefix("f.").ok_or_else(invalid)?;
        let mut parts = rest.split('.');
        let (Some(field), Some(visit), Some(instance), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid());
        };
        let field: FieldId = field.parse().map_err(|_| invalid())?;
        let visit = visit.parse::<u32>().map_err(|_| invalid())?;
        let instance = instance.parse::<u32>().map_err(|_| invalid())?;
        Ok(Self::new(field, visit, instance))
    }
}

impl fmt::Display for ColumnKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "f.{}.{}.{}", self.field, self.visit, self.instance)
    }
}
