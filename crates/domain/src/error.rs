//! Error taxonomy for marketplace operations.

use serde::Serialize;
use thiserror::Error;
use validator::{ValidationErrors, ValidationErrorsKind};

use crate::ports::StoreError;

/// Result alias for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;

/// A single field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Errors reported by domain operations.
///
/// Authorization failures carry no detail so they cannot be used to probe
/// for the existence of a resource.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Forbidden")]
    Forbidden,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Validation failed")]
    Validation(Vec<FieldError>),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid or already used token")]
    InvalidToken,

    #[error("Token has expired")]
    ExpiredToken,

    #[error("Too many attempts")]
    RateLimited,

    #[error("Upstream failure: {0}")]
    Upstream(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DomainError {
    /// Shorthand for a validation error on a single field.
    pub fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        DomainError::Validation(vec![FieldError::new(field, message)])
    }
}

impl From<StoreError> for DomainError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => DomainError::NotFound("Resource"),
            StoreError::Conflict(msg) => DomainError::Conflict(msg),
            StoreError::Backend(msg) => DomainError::Internal(msg),
        }
    }
}

impl From<ValidationErrors> for DomainError {
    fn from(errors: ValidationErrors) -> Self {
        DomainError::Validation(flatten_validation_errors(&errors))
    }
}

/// Flattens nested `validator` errors into dotted field paths,
/// e.g. `listings[1].headline` or `contact.email`.
pub fn flatten_validation_errors(errors: &ValidationErrors) -> Vec<FieldError> {
    let mut out = Vec::new();
    collect(errors, "", &mut out);
    out.sort_by(|a, b| a.field.cmp(&b.field));
    out
}

fn collect(errors: &ValidationErrors, prefix: &str, out: &mut Vec<FieldError>) {
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
                        .unwrap_or_else(|| format!("Invalid value ({})", e.code));
                    out.push(FieldError::new(path.clone(), message));
                }
            }
            ValidationErrorsKind::Struct(inner) => collect(inner, &path, out),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    collect(inner, &format!("{}[{}]", path, index), out);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Debug, Validate)]
    struct Inner {
        #[validate(email(message = "Invalid email format"))]
        email: String,
    }

    #[derive(Debug, Validate)]
    struct Outer {
        #[validate(length(min = 1, message = "Name is required"))]
        name: String,
        #[validate(nested)]
        contact: Inner,
        #[validate(nested)]
        items: Vec<Inner>,
    }

    #[test]
    fn test_flatten_nested_paths() {
        let outer = Outer {
            name: String::new(),
            contact: Inner {
                email: "nope".into(),
            },
            items: vec![
                Inner {
                    email: "ok@example.com".into(),
                },
                Inner {
                    email: "bad".into(),
                },
            ],
        };

        let fields = flatten_validation_errors(&outer.validate().unwrap_err());
        let names: Vec<_> = fields.iter().map(|f| f.field.as_str()).collect();

        assert_eq!(names, vec!["contact.email", "items[1].email", "name"]);
        assert_eq!(fields[2].message, "Name is required");
    }

    #[test]
    fn test_store_error_mapping() {
        assert!(matches!(
            DomainError::from(StoreError::Conflict("dup".into())),
            DomainError::Conflict(_)
        ));
        assert!(matches!(
            DomainError::from(StoreError::Backend("io".into())),
            DomainError::Internal(_)
        ));
    }

    #[test]
    fn test_error_display() {
        assert_eq!(DomainError::NotFound("Quote").to_string(), "Quote not found");
        assert_eq!(
            DomainError::InvalidState("Quote has not been sent yet".into()).to_string(),
            "Invalid state: Quote has not been sent yet"
        );
    }
}
