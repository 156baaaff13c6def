//! Relational introspection - system catalogs to models.json
//!
//! Enumerates user tables in the `public` namespace, reads column metadata
//! from `information_schema`, resolves primary keys through `pg_index`, and
//! maps declared types onto the catalog's closed type set.

use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};

use crate::catalog::{Field, FieldType, Model};
use crate::config::ModelConfig;
use crate::introspect::{IntrospectError, IntrospectResult};

/// Column metadata as read from `information_schema.columns`
#[derive(Debug, Clone)]
pub struct PgColumn {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
    pub ordinal: i32,
}

/// Introspects a PostgreSQL database into a catalog config
pub struct PgIntrospector {
    pool: PgPool,
}

impl PgIntrospector {
    /// Connect and verify the connection
    pub async fn connect(url: &str) -> IntrospectResult<Self> {
        let pool = PgPoolOptions::new().connect(url).await?;
        Ok(Self { pool })
    }

    /// Wrap an existing pool
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Introspect the given tables, or every base table in `public` when
    /// none are specified. An empty database is an error.
    pub async fn introspect(&self, tables: Option<Vec<String>>) -> IntrospectResult<ModelConfig> {
        let tables = match tables {
            Some(tables) if !tables.is_empty() => tables,
            _ => {
                let all = self.list_tables().await?;
                if all.is_empty() {
                    return Err(IntrospectError::NoTables);
                }
                tracing::info!(count = all.len(), "found tables in database");
                all
            }
        };

        let mut models = Vec::with_capacity(tables.len());
        for table in &tables {
            let columns = self.table_columns(table).await?;
            if columns.is_empty() {
                tracing::warn!(table, "table has no columns, skipping");
                continue;
            }

            let primary_key = self.primary_key(table).await?;

            let mut model = Model::new(table.clone(), table.clone()).primary_key(primary_key);
            for column in columns {
                model = model.field(
                    Field::new(column.name, map_pg_type(&column.data_type))
                        .nullable(column.nullable),
                );
            }
            models.push(model);
        }

        if models.is_empty() {
            return Err(IntrospectError::NoModels);
        }

        Ok(ModelConfig { models })
    }

    /// All base tables in the `public` namespace, ordered by name
    pub async fn list_tables(&self) -> IntrospectResult<Vec<String>> {
        // information_schema columns are domain types; cast to base types so
        // the driver decodes them directly.
        let names = sqlx::query_scalar::<_, String>(
            r#"
            SELECT table_name::text
            FROM information_schema.tables
            WHERE table_schema = 'public' AND table_type = 'BASE TABLE'
            ORDER BY table_name ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(names)
    }

    /// Column metadata for one table, ordered by ordinal position
    pub async fn table_columns(&self, table: &str) -> IntrospectResult<Vec<PgColumn>> {
        let rows = sqlx::query(
            r#"
            SELECT column_name::text, data_type::text, is_nullable::text,
                   ordinal_position::int4
            FROM information_schema.columns
            WHERE table_name = $1 AND table_schema = 'public'
            ORDER BY ordinal_position ASC
            "#,
        )
        .bind(table)
        .fetch_all(&self.pool)
        .await?;

        let columns = rows
            .into_iter()
            .map(|row| PgColumn {
                name: row.get("column_name"),
                data_type: row.get("data_type"),
                nullable: row.get::<String, _>("is_nullable") == "YES",
                ordinal: row.get("ordinal_position"),
            })
            .collect();
        Ok(columns)
    }

    /// Primary-key column resolved via the catalog's primary-key indexes,
    /// falling back to `id` when the table declares none
    pub async fn primary_key(&self, table: &str) -> IntrospectResult<String> {
        let name = sqlx::query_scalar::<_, String>(
            r#"
            SELECT a.attname::text
            FROM pg_index i
            JOIN pg_attribute a ON a.attrelid = i.indrelid AND a.attnum = ANY(i.indkey)
            JOIN pg_class t ON t.oid = i.indrelid
            WHERE t.relname = $1 AND i.indisprimary
            LIMIT 1
            "#,
        )
        .bind(table)
        .fetch_optional(&self.pool)
        .await?;

        Ok(name.unwrap_or_else(|| "id".to_string()))
    }
}

/// Map a declared PostgreSQL type onto the catalog type set.
///
/// Normalizes case, trims parameters, strips the array suffix, and matches
/// against a fixed table; anything unknown becomes `string` with a warning.
pub fn map_pg_type(pg_type: &str) -> FieldType {
    let lowered = pg_type.trim().to_ascii_lowercase();
    let without_array = lowered.strip_suffix("[]").unwrap_or(&lowered);
    let base = without_array
        .split('(')
        .next()
        .unwrap_or(without_array)
        .trim();

    match base {
        "integer" | "int" | "int4" | "smallint" | "int2" | "bigint" | "int8" | "serial"
        | "serial4" | "bigserial" | "serial8" => FieldType::Integer,
        "text" | "character varying" | "varchar" | "character" | "char" | "name" => {
            FieldType::String
        }
        "numeric" | "decimal" | "money" | "double precision" | "float8" | "real" | "float4" => {
            FieldType::Decimal
        }
        "boolean" | "bool" => FieldType::Boolean,
        "timestamp"
        | "timestamp without time zone"
        | "timestamp with time zone"
        | "timestamptz"
        | "date"
        | "time"
        | "time without time zone"
        | "time with time zone"
        | "timetz" => FieldType::Timestamp,
        "json" | "jsonb" => FieldType::Json,
        "uuid" => FieldType::Uuid,
        "bytea" | "bit" | "bit varying" | "varbit" => FieldType::Binary,
        other => {
            tracing::warn!(pg_type = other, "unknown type, defaulting to string");
            FieldType::String
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_mapping_table() {
        assert_eq!(map_pg_type("integer"), FieldType::Integer);
        assert_eq!(map_pg_type("bigserial"), FieldType::Integer);
        assert_eq!(map_pg_type("character varying"), FieldType::String);
        assert_eq!(map_pg_type("numeric"), FieldType::Decimal);
        assert_eq!(map_pg_type("double precision"), FieldType::Decimal);
        assert_eq!(map_pg_type("boolean"), FieldType::Boolean);
        assert_eq!(
            map_pg_type("timestamp with time zone"),
            FieldType::Timestamp
        );
        assert_eq!(map_pg_type("date"), FieldType::Timestamp);
        assert_eq!(map_pg_type("jsonb"), FieldType::Json);
        assert_eq!(map_pg_type("uuid"), FieldType::Uuid);
        assert_eq!(map_pg_type("bytea"), FieldType::Binary);
    }

    #[test]
    fn test_type_mapping_normalization() {
        // case folding
        assert_eq!(map_pg_type("INTEGER"), FieldType::Integer);
        // parameterized types
        assert_eq!(map_pg_type("character varying(255)"), FieldType::String);
        assert_eq!(map_pg_type("numeric(10,2)"), FieldType::Decimal);
        // array suffix stripped
        assert_eq!(map_pg_type("integer[]"), FieldType::Integer);
        assert_eq!(map_pg_type("text[]"), FieldType::String);
        // surrounding whitespace
        assert_eq!(map_pg_type("  uuid  "), FieldType::Uuid);
    }

    #[test]
    fn test_unknown_type_defaults_to_string() {
        assert_eq!(map_pg_type("tsvector"), FieldType::String);
        assert_eq!(map_pg_type("point"), FieldType::String);
    }
}
