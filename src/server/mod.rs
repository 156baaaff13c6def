//! HTTP surface - the engine's public API
//!
//! Routes: `GET /models`, `POST /query`, `GET /info`, `GET /health`.
//! One handler task per request; the pipeline below a handler is pure until
//! the executor call.

pub mod error;
pub mod routes;

use std::sync::Arc;

use crate::backend::{Executor, QueryBuilder};
use crate::catalog::Registry;

pub use error::ApiError;
pub use routes::router;

/// Which backend the process is wired to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseKind {
    Postgres,
    Mongo,
}

impl DatabaseKind {
    /// Name reported by `GET /info`
    pub fn as_str(&self) -> &'static str {
        match self {
            DatabaseKind::Postgres => "postgres",
            DatabaseKind::Mongo => "mongo",
        }
    }
}

/// Shared request-handling state.
///
/// The registry is immutable after startup; builder and executor are
/// stateless per call, so the whole state is cheaply cloneable.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<Registry>,
    pub builder: Arc<dyn QueryBuilder>,
    /// Absent in query-generation-only mode
    pub executor: Option<Arc<dyn Executor>>,
    pub database: DatabaseKind,
}

impl AppState {
    /// Assemble the shared state
    pub fn new(
        registry: Arc<Registry>,
        builder: Arc<dyn QueryBuilder>,
        executor: Option<Arc<dyn Executor>>,
        database: DatabaseKind,
    ) -> Self {
        Self {
            registry,
            builder,
            executor,
            database,
        }
    }
}
