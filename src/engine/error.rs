use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::engine::status::StatusDomain;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ValidationCode {
    Required,
    InvalidValue,
    MissingEvidence,
    MissingSubstituteName,
}

/// One field-level validation failure, addressed by a dotted path such as
/// `price_rows[2].observations[4].photo`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FieldError {
    pub field: String,
    pub code: ValidationCode,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, code: ValidationCode, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            code,
            message: message.into(),
        }
    }

    pub fn required(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(field, ValidationCode::Required, message)
    }

    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(field, ValidationCode::InvalidValue, message)
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("validation failed: {} field error(s)", .0.len())]
    Validation(Vec<FieldError>),

    #[error("actor is not permitted to perform this action")]
    AuthorityDenied,

    #[error("state conflict: expected {expected}, found {found}")]
    StateConflict { expected: String, found: String },

    #[error("a shift is already active for staff {0}")]
    AlreadyActive(i32),

    #[error("no active shift for staff {0}")]
    NotActive(i32),

    #[error("unrecognized {domain} status {raw:?}")]
    UnrecognizedStatus { domain: StatusDomain, raw: String },

    #[error("{0} not found")]
    NotFound(String),

    #[error("store error: {0}")]
    Store(String),
}

impl EngineError {
    pub fn conflict(expected: impl ToString, found: impl ToString) -> Self {
        EngineError::StateConflict {
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }

    pub fn invalid(field: &str, message: &str) -> Self {
        EngineError::Validation(vec![FieldError::invalid(field, message)])
    }
}

impl From<sqlx::Error> for EngineError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => EngineError::NotFound("record".to_string()),
            other => EngineError::Store(other.to_string()),
        }
    }
}
