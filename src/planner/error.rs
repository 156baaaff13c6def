//! Planner error types
//!
//! Planner failures indicate an invariant break (the validator is supposed
//! to have caught every user error); they map to internal errors, not 400s.

use thiserror::Error;

/// Planner error
#[derive(Debug, Clone, Error)]
pub enum PlanError {
    /// Model disappeared between validation and planning
    #[error("internal planner error: unknown model '{0}'")]
    UnknownModel(String),
    /// Field reference did not resolve
    #[error("internal planner error: unknown field '{field}' on model '{model}'")]
    UnknownField { model: String, field: String },
    /// Operator or aggregate function did not resolve
    #[error("internal planner error: unknown operator '{0}'")]
    UnknownOperator(String),
    /// Plan structure violated an invariant
    #[error("internal planner error: {0}")]
    Internal(String),
}

/// Result type for planner operations
pub type PlanResult<T> = Result<T, PlanError>;
