//! Schema introspection - populates the catalog config from a live backend
//!
//! Two companions with the same output shape: the relational introspector
//! reads system catalogs, the document introspector samples documents and
//! statistically resolves types.

pub mod mongo;
pub mod postgres;

use thiserror::Error;

pub use mongo::MongoIntrospector;
pub use postgres::PgIntrospector;

/// Introspection error
#[derive(Debug, Error)]
pub enum IntrospectError {
    /// Relational driver error
    #[error("postgres error: {0}")]
    Postgres(#[from] sqlx::Error),
    /// Document driver error
    #[error("mongodb error: {0}")]
    Mongo(#[from] mongodb::error::Error),
    /// Database has no user tables
    #[error("no tables found in database")]
    NoTables,
    /// Database has no collections
    #[error("no collections found in database")]
    NoCollections,
    /// Nothing usable was generated
    #[error("no valid models generated from database")]
    NoModels,
}

/// Result type for introspection
pub type IntrospectResult<T> = Result<T, IntrospectError>;
