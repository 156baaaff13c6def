//! DSL validation error types

use std::fmt;

/// Validation error - a client-caused rejection of a DSL query
#[derive(Debug, Clone, PartialEq)]
pub enum ValidateError {
    /// Model name empty or not in the registry
    UnknownModel(String),
    /// Field not declared on the model
    UnknownField { model: String, field: String },
    /// Filter or aggregate operator not recognized
    UnknownOperator(String),
    /// Value arity does not match the operator
    BadOperatorUsage(String),
    /// Aggregate targets a non-aggregatable field
    TypeMismatch(String),
    /// Negative limit or offset
    BadPagination(String),
    /// Create/update without a data payload
    MissingData,
    /// Update/delete with neither id nor filters
    MissingSelector,
    /// Create missing a non-nullable field
    MissingRequiredField(String),
}

impl ValidateError {
    /// Stable kind tag surfaced alongside the human message
    pub fn kind(&self) -> &'static str {
        match self {
            ValidateError::UnknownModel(_) => "unknown_model",
            ValidateError::UnknownField { .. } => "unknown_field",
            ValidateError::UnknownOperator(_) => "unknown_operator",
            ValidateError::BadOperatorUsage(_) => "bad_operator_usage",
            ValidateError::TypeMismatch(_) => "type_mismatch",
            ValidateError::BadPagination(_) => "bad_pagination",
            ValidateError::MissingData => "missing_data",
            ValidateError::MissingSelector => "missing_selector",
            ValidateError::MissingRequiredField(_) => "missing_required_field",
        }
    }
}

impl fmt::Display for ValidateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidateError::UnknownModel(name) => {
                if name.is_empty() {
                    write!(f, "model name is required")
                } else {
                    write!(f, "unknown model '{}'", name)
                }
            }
            ValidateError::UnknownField { model, field } => {
                write!(f, "unknown field '{}' on model '{}'", field, model)
            }
            ValidateError::UnknownOperator(op) => write!(f, "unknown operator '{}'", op),
            ValidateError::BadOperatorUsage(msg) => write!(f, "bad operator usage: {}", msg),
            ValidateError::TypeMismatch(msg) => write!(f, "type mismatch: {}", msg),
            ValidateError::BadPagination(msg) => write!(f, "bad pagination: {}", msg),
            ValidateError::MissingData => write!(f, "data is required for this operation"),
            ValidateError::MissingSelector => {
                write!(f, "id or filters required for this operation")
            }
            ValidateError::MissingRequiredField(field) => {
                write!(f, "required field '{}' missing from data", field)
            }
        }
    }
}

impl std::error::Error for ValidateError {}

/// Result type for validation
pub type ValidateResult<T> = Result<T, ValidateError>;
