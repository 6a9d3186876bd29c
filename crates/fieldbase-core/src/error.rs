//! Core error types.

use thiserror::Error;

/// Core errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Storage layer error.
    #[error("storage error: {0}")]
    Storage(#[from] sled::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Deserialization error.
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// A schema or entry was not found.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// What was being looked up (e.g. "field definition").
        kind: &'static str,
        /// The id that was requested.
        id: String,
    },

    /// An id is already taken by another definition, sub-field, catalog, or column.
    #[error("id already in use: {0}")]
    DuplicateId(String),

    /// Required fields are empty; nothing was written.
    #[error("required fields are empty: {}", missing.join(", "))]
    Validation {
        /// Ids of the unsatisfied required fields.
        missing: Vec<String>,
    },

    /// The definition cannot be expressed (unknown link target, wrong kind, ...).
    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    /// The persistence backend refused the operation.
    #[error("persistence unavailable: {0}")]
    PersistenceUnavailable(String),
}

impl Error {
    pub(crate) fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Error::NotFound {
            kind,
            id: id.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_display_lists_fields() {
        let err = Error::Validation {
            missing: vec!["name".into(), "company".into()],
        };
        assert_eq!(err.to_string(), "required fields are empty: name, company");
    }

    #[test]
    fn test_not_found_display() {
        let err = Error::not_found("reference entry", "p1");
        assert_eq!(err.to_string(), "reference entry not found: p1");
    }
}
