use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;
use validator::{ValidationErrors, ValidationErrorsKind};

use crate::engine::error::{EngineError, FieldError};
use crate::models::auth::ErrorResponse;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Not Found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Validation Error: {message}")]
    ValidationError { message: String, errors: Vec<FieldError> },
    #[error("Internal Error: {0}")]
    InternalError(String),
    #[error("Database Error: {0}")]
    DatabaseError(String),
}

impl ServiceError {
    pub fn validation(message: impl Into<String>) -> Self {
        ServiceError::ValidationError {
            message: message.into(),
            errors: vec![],
        }
    }

    fn body(&self, message: &str) -> ErrorResponse {
        ErrorResponse {
            status: "error".to_string(),
            message: message.to_string(),
            errors: match self {
                ServiceError::ValidationError { errors, .. } => errors.clone(),
                _ => vec![],
            },
        }
    }
}

impl ResponseError for ServiceError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Conflict(_) => StatusCode::CONFLICT,
            ServiceError::ValidationError { .. } => StatusCode::BAD_REQUEST,
            ServiceError::InternalError(_) | ServiceError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            ServiceError::Unauthorized(msg) | ServiceError::NotFound(msg) => {
                log::warn!("{}", self);
                msg.as_str()
            }
            ServiceError::Forbidden(_) => {
                log::warn!("{}", self);
                // Never say why.
                "You are not allowed to perform this action"
            }
            ServiceError::Conflict(msg) => {
                log::warn!("{}", self);
                msg.as_str()
            }
            ServiceError::ValidationError { message, errors } => {
                log::warn!("{} ({} field error(s))", self, errors.len());
                message.as_str()
            }
            ServiceError::InternalError(_) => {
                log::error!("{}", self);
                "Something went wrong"
            }
            ServiceError::DatabaseError(_) => {
                log::error!("{}", self);
                "Database operation failed"
            }
        };

        HttpResponse::build(self.status_code()).json(self.body(message))
    }
}

impl From<EngineError> for ServiceError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Validation(errors) => ServiceError::ValidationError {
                message: "Submission is not valid".to_string(),
                errors,
            },
            EngineError::AuthorityDenied => ServiceError::Forbidden(err.to_string()),
            EngineError::StateConflict { ref expected, ref found } => ServiceError::Conflict(format!(
                "Record was changed by someone else (expected {}, found {}). Refresh and decide again",
                expected, found
            )),
            EngineError::AlreadyActive(_) => ServiceError::Conflict("A shift is already active".to_string()),
            EngineError::NotActive(_) => ServiceError::Conflict("There is no active shift to end".to_string()),
            EngineError::NotFound(what) => ServiceError::NotFound(format!("{} not found", what)),
            EngineError::UnrecognizedStatus { .. } => ServiceError::InternalError(err.to_string()),
            EngineError::Store(msg) => ServiceError::DatabaseError(msg),
        }
    }
}

impl From<ValidationErrors> for ServiceError {
    fn from(errors: ValidationErrors) -> Self {
        let mut fields = vec![];
        flatten("", &errors, &mut fields);
        fields.sort_by(|a, b| a.field.cmp(&b.field));
        ServiceError::ValidationError {
            message: "Request body is not valid".to_string(),
            errors: fields,
        }
    }
}

fn flatten(prefix: &str, errors: &ValidationErrors, out: &mut Vec<FieldError>) {
    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{}.{}", prefix, field)
        };
        match kind {
            ValidationErrorsKind::Field(list) => {
                for e in list {
                    let message = e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("failed {} check", e.code));
                    out.push(FieldError::invalid(path.clone(), message));
                }
            }
            ValidationErrorsKind::Struct(inner) => flatten(&path, inner, out),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    flatten(&format!("{}[{}]", path, index), inner, out);
                }
            }
        }
    }
}

impl From<jsonwebtoken::errors::Error> for ServiceError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        log::warn!("JWT validation error: {}", err);
        ServiceError::Unauthorized("Invalid token".to_string())
    }
}
