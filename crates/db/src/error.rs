use serde::Serialize;
use thiserror::Error;

/// A single schema constraint a document failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    pub field: String,
    pub message: String,
}

impl FieldViolation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum DbError {
    #[error("validation failed in '{collection}': {}", describe(.violations))]
    Validation {
        collection: &'static str,
        violations: Vec<FieldViolation>,
    },

    #[error("duplicate value for unique field '{field}' in '{collection}'")]
    Duplicate {
        collection: &'static str,
        field: &'static str,
    },

    #[error("collection '{0}' is registered with a different document type")]
    CollectionType(&'static str),

    #[error("unsupported store url '{0}'; expected memory://<name>")]
    UnsupportedUrl(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type DbResult<T> = Result<T, DbError>;

fn describe(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(|v| format!("{}: {}", v.field, v.message))
        .collect::<Vec<_>>()
        .join("; ")
}
