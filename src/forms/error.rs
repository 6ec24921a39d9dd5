//! Error types surfaced by the form engine

use serde::Serialize;
use thiserror::Error;

/// Error produced by a custom rule function.
///
/// Anything implementing `std::error::Error` works; plain strings convert
/// through `Into<Box<dyn Error>>`.
pub type RuleFault = Box<dyn std::error::Error + Send + Sync>;

/// Messages collected for one field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldErrors {
    pub name: String,
    pub errors: Vec<String>,
}

impl FieldErrors {
    pub fn new(name: impl Into<String>, errors: Vec<String>) -> Self {
        Self {
            name: name.into(),
            errors,
        }
    }
}

/// Every currently failing field of a validation call.
///
/// This is the only error a caller of `validate_field`/`validate_fields`
/// needs to handle. The store's error map has already been updated by the
/// time it is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("validation failed for {}", field_names(.error_fields))]
pub struct AggregateValidationError {
    pub error_fields: Vec<FieldErrors>,
}

impl AggregateValidationError {
    pub fn new(error_fields: Vec<FieldErrors>) -> Self {
        Self { error_fields }
    }

    /// Error carrying exactly one failing field
    pub fn single(name: impl Into<String>, errors: Vec<String>) -> Self {
        Self {
            error_fields: vec![FieldErrors::new(name, errors)],
        }
    }

    /// Messages for `name`, if that field failed
    pub fn errors_for(&self, name: &str) -> Option<&[String]> {
        self.error_fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.errors.as_slice())
    }
}

fn field_names(fields: &[FieldErrors]) -> String {
    fields
        .iter()
        .map(|f| f.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Failure of a submission path
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Validation(#[from] AggregateValidationError),
    /// The success handler (`on_submit` / `on_finish`) returned an error
    #[error("submit handler failed: {0:#}")]
    Handler(anyhow::Error),
}

impl SubmitError {
    pub fn validation(&self) -> Option<&AggregateValidationError> {
        match self {
            SubmitError::Validation(err) => Some(err),
            SubmitError::Handler(_) => None,
        }
    }
}

/// Misuse of a field binding
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindingError {
    #[error("field `{0}` already has a bound input")]
    AlreadyAttached(String),
}
