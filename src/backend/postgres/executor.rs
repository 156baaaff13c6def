//! PostgreSQL executor - runs built statements against a connection pool

use async_trait::async_trait;
use sqlx::postgres::{PgArguments, PgPoolOptions};
use sqlx::query::Query;
use sqlx::{PgPool, Postgres};

use crate::backend::postgres::row::decode_row;
use crate::backend::{
    BackendQuery, ExecError, ExecOutcome, ExecResult, Executor, Row, SqlQuery,
};
use crate::scalar::Scalar;

/// Executor over a PostgreSQL connection pool.
///
/// The pool manages its own concurrency and resource limits; this type only
/// binds parameters, runs statements, and decodes rows.
pub struct PgExecutor {
    pool: PgPool,
}

impl PgExecutor {
    /// Connect to PostgreSQL and verify the connection
    pub async fn connect(url: &str) -> ExecResult<Self> {
        let pool = PgPoolOptions::new().connect(url).await?;
        Ok(Self { pool })
    }

    /// Wrap an existing pool
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn sql<'q>(&self, query: &'q BackendQuery) -> ExecResult<&'q SqlQuery> {
        match query {
            BackendQuery::Sql(sql) => Ok(sql),
            BackendQuery::Document(_) => Err(ExecError::WrongBackend { expected: "mongodb" }),
        }
    }
}

#[async_trait]
impl Executor for PgExecutor {
    async fn execute_query(&self, query: &BackendQuery) -> ExecResult<Vec<Row>> {
        let sql = self.sql(query)?;
        let prepared = bind_params(sqlx::query(&sql.text), &sql.params)?;
        let rows = prepared.fetch_all(&self.pool).await?;
        rows.iter().map(decode_row).collect()
    }

    async fn execute_command(&self, query: &BackendQuery) -> ExecResult<ExecOutcome> {
        let sql = self.sql(query)?;
        let prepared = bind_params(sqlx::query(&sql.text), &sql.params)?;
        let result = prepared.execute(&self.pool).await?;
        Ok(ExecOutcome {
            affected_rows: result.rows_affected(),
        })
    }

    async fn ping(&self) -> ExecResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Bind scalars in emission order. Sequence parameters must be homogeneous;
/// numeric sequences are promoted to float when mixed.
fn bind_params<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    params: &'q [Scalar],
) -> ExecResult<Query<'q, Postgres, PgArguments>> {
    for param in params {
        query = match param {
            Scalar::Null => query.bind(Option::<String>::None),
            Scalar::Bool(b) => query.bind(*b),
            Scalar::Int(i) => query.bind(*i),
            Scalar::Float(f) => query.bind(*f),
            Scalar::Text(s) => query.bind(s.as_str()),
            Scalar::Json(v) => query.bind(v.clone()),
            Scalar::List(items) => bind_list(query, items)?,
        };
    }
    Ok(query)
}

fn bind_list<'q>(
    query: Query<'q, Postgres, PgArguments>,
    items: &[Scalar],
) -> ExecResult<Query<'q, Postgres, PgArguments>> {
    if items.is_empty() {
        return Ok(query.bind(Vec::<String>::new()));
    }

    if items.iter().all(|s| matches!(s, Scalar::Int(_))) {
        let values: Vec<i64> = items
            .iter()
            .map(|s| match s {
                Scalar::Int(i) => *i,
                _ => unreachable!(),
            })
            .collect();
        return Ok(query.bind(values));
    }

    if items
        .iter()
        .all(|s| matches!(s, Scalar::Int(_) | Scalar::Float(_)))
    {
        let values: Vec<f64> = items
            .iter()
            .map(|s| match s {
                Scalar::Int(i) => *i as f64,
                Scalar::Float(f) => *f,
                _ => unreachable!(),
            })
            .collect();
        return Ok(query.bind(values));
    }

    if items.iter().all(|s| matches!(s, Scalar::Bool(_))) {
        let values: Vec<bool> = items
            .iter()
            .map(|s| match s {
                Scalar::Bool(b) => *b,
                _ => unreachable!(),
            })
            .collect();
        return Ok(query.bind(values));
    }

    if items.iter().all(|s| matches!(s, Scalar::Text(_))) {
        let values: Vec<String> = items
            .iter()
            .map(|s| match s {
                Scalar::Text(t) => t.clone(),
                _ => unreachable!(),
            })
            .collect();
        return Ok(query.bind(values));
    }

    Err(ExecError::Decode(
        "heterogeneous sequence parameter".to_string(),
    ))
}
