use thiserror::Error;

use crate::ids::ParticipantId;

/// Error taxonomy shared by every stage of the feature pipeline.
#[derive(Debug, Error)]
pub enum CohortError {
    #[error("invalid field id: {0:?}")]
    InvalidFieldId(String),

    #[error("invalid participant id: {0:?}")]
    InvalidParticipantId(String),

    #[error("invalid column name {0:?}: expected f.<field>.<visit>.<instance>")]
    InvalidColumnName(String),

    #[error("unknown value type: {0:?}")]
    UnknownValueType(String),

    /// An expected column or field is absent.
    #[error("schema error: {message}")]
    Schema { message: String },

    /// A diagnosis code is not covered by the code hierarchy.
    #[error("diagnosis code {code:?} for participant {eid} is not in the {level} hierarchy")]
    Lookup {
        code: String,
        eid: ParticipantId,
        level: &'static str,
    },

    /// Duplicate or malformed keyed rows, or misaligned matrices.
    #[error("data integrity error: {message}")]
    DataIntegrity { message: String },

    /// The code hierarchy could not be built.
    #[error("code hierarchy error: {message}")]
    Hierarchy { message: String },
}

impl CohortError {
    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema {
            message: message.into(),
        }
    }

    pub fn data_integrity(message: impl Into<String>) -> Self {
        Self::DataIntegrity {
            message: message.into(),
        }
    }

    pub fn hierarchy(message: impl Into<String>) -> Self {
        Self::Hierarchy {
            message: message.into(),
        }
    }

    /// Returns true for errors that must abort the whole run.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Schema { .. })
    }
}

pub type Result<T> = std::result::Result<T, CohortError>;
