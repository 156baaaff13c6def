//! PostgreSQL backend - SQL generation and execution

pub mod builder;
pub mod executor;
pub mod row;

pub use builder::SqlBuilder;
pub use executor::PgExecutor;
