//! Backend layer - query builders and executors
//!
//! A builder turns a plan into a concrete backend query; an executor runs
//! that query against the live backend. Both sides of the contract are
//! backend-agnostic so the HTTP surface can stay oblivious to which store
//! is configured.

pub mod mongo;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;

use crate::planner::QueryPlan;
use crate::scalar::Scalar;

pub use mongo::{CommandBuilder, DocumentCommand, DocumentOp, MongoExecutor};
pub use postgres::{PgExecutor, SqlBuilder};

/// A result row: column name → JSON-representable value
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Outcome of a non-row-returning command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecOutcome {
    /// Number of rows or documents affected
    pub affected_rows: u64,
}

/// A parameterized SQL statement
#[derive(Debug, Clone, PartialEq)]
pub struct SqlQuery {
    /// Statement text with positional `$n` placeholders
    pub text: String,
    /// Bound values in placeholder order
    pub params: Vec<Scalar>,
}

/// A built backend query, ready for execution
#[derive(Debug, Clone, PartialEq)]
pub enum BackendQuery {
    /// Parameterized SQL for the relational backend
    Sql(SqlQuery),
    /// Structured command for the document backend
    Document(DocumentCommand),
}

impl BackendQuery {
    /// Whether executing this query yields rows (as opposed to an affected
    /// count). Relational create/update carry `RETURNING *` and yield rows;
    /// document insert/update/delete only report counts.
    pub fn returns_rows(&self) -> bool {
        match self {
            BackendQuery::Sql(q) => !q.text.starts_with("DELETE"),
            BackendQuery::Document(cmd) => {
                matches!(cmd.operation, DocumentOp::Find | DocumentOp::Aggregate)
            }
        }
    }
}

/// Build error - a plan the active backend cannot compile.
///
/// These indicate either a backend capability gap (`UnsupportedOperator`)
/// or a validator bypass; both map to internal errors at the HTTP surface.
#[derive(Debug, Clone, Error)]
pub enum BuildError {
    /// Operation not supported by this backend
    #[error("unsupported operation '{0}'")]
    UnsupportedOperation(String),
    /// Operator not implemented by this backend
    #[error("operator '{op}' is not supported by the {backend} backend")]
    UnsupportedOperator { op: String, backend: &'static str },
    /// Operator requires a value the plan did not carry
    #[error("value required for '{0}' operator")]
    MissingValue(String),
    /// Value shape does not fit the operator
    #[error("invalid value for '{op}' operator: {reason}")]
    InvalidValue { op: String, reason: String },
    /// Create/update without data
    #[error("data is required for {0} operation")]
    MissingData(String),
    /// Update/delete without id or filters
    #[error("id or filters required for {0} operation")]
    MissingSelector(String),
    /// Plan structure violated a builder invariant
    #[error("internal build error: {0}")]
    Internal(String),
}

/// Result type for builders
pub type BuildResult<T> = Result<T, BuildError>;

/// Converts plans into backend queries.
///
/// Builders are stateless; each `build` call allocates its own parameter
/// list, so one builder instance is safe to share across requests.
pub trait QueryBuilder: Send + Sync {
    /// Build a backend query from a plan
    fn build(&self, plan: &QueryPlan) -> BuildResult<BackendQuery>;
}

/// Execution error - driver failures and backend/query mismatches
#[derive(Debug, Error)]
pub enum ExecError {
    /// Relational driver error
    #[error("postgres error: {0}")]
    Postgres(#[from] sqlx::Error),
    /// Document driver error
    #[error("mongodb error: {0}")]
    Mongo(#[from] mongodb::error::Error),
    /// Query was built for a different backend
    #[error("query was built for the {expected} backend")]
    WrongBackend { expected: &'static str },
    /// Result value could not be decoded into the row shape
    #[error("failed to decode result: {0}")]
    Decode(String),
}

/// Result type for executors
pub type ExecResult<T> = Result<T, ExecError>;

/// Uniform execution contract both backends implement.
///
/// Rows come back fully materialized; memory is bounded in practice by the
/// plan's limit, which the planner always populates. Partial row-sets are
/// never returned: a call either completes, errors, or is cancelled.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Execute a row-returning query
    async fn execute_query(&self, query: &BackendQuery) -> ExecResult<Vec<Row>>;

    /// Execute a command, returning the affected count
    async fn execute_command(&self, query: &BackendQuery) -> ExecResult<ExecOutcome>;

    /// Check the backend connection
    async fn ping(&self) -> ExecResult<()>;
}
