//! Dynamic row decoding - PostgreSQL rows to JSON-representable maps
//!
//! Column metadata is read once per result set; each value is decoded by
//! its wire type. Byte arrays are promoted to text so every output value is
//! JSON-representable.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::types::BigDecimal;
use sqlx::{Column, Row as _, TypeInfo};

use crate::backend::{ExecError, ExecResult, Row};

/// Decode one PostgreSQL row into a column → value map
pub fn decode_row(row: &PgRow) -> ExecResult<Row> {
    let mut out = Row::new();
    for (idx, column) in row.columns().iter().enumerate() {
        let value = decode_column(row, idx, column.type_info().name())?;
        out.insert(column.name().to_string(), value);
    }
    Ok(out)
}

fn decode_column(row: &PgRow, idx: usize, type_name: &str) -> ExecResult<Value> {
    let value = match type_name {
        "BOOL" => row
            .try_get::<Option<bool>, _>(idx)
            .map(|v| v.map(Value::Bool))?,
        "INT2" => row
            .try_get::<Option<i16>, _>(idx)
            .map(|v| v.map(|n| Value::from(n as i64)))?,
        "INT4" => row
            .try_get::<Option<i32>, _>(idx)
            .map(|v| v.map(|n| Value::from(n as i64)))?,
        "INT8" => row
            .try_get::<Option<i64>, _>(idx)
            .map(|v| v.map(Value::from))?,
        "FLOAT4" => row
            .try_get::<Option<f32>, _>(idx)
            .map(|v| v.and_then(|n| serde_json::Number::from_f64(n as f64).map(Value::Number)))?,
        "FLOAT8" => row
            .try_get::<Option<f64>, _>(idx)
            .map(|v| v.and_then(|n| serde_json::Number::from_f64(n).map(Value::Number)))?,
        // Arbitrary precision survives as text, like the byte-array rule.
        "NUMERIC" => row
            .try_get::<Option<BigDecimal>, _>(idx)
            .map(|v| v.map(|d| Value::String(d.to_string())))?,
        "TEXT" | "VARCHAR" | "CHAR" | "BPCHAR" | "NAME" => row
            .try_get::<Option<String>, _>(idx)
            .map(|v| v.map(Value::String))?,
        "UUID" => row
            .try_get::<Option<sqlx::types::Uuid>, _>(idx)
            .map(|v| v.map(|u| Value::String(u.to_string())))?,
        "TIMESTAMP" => row
            .try_get::<Option<NaiveDateTime>, _>(idx)
            .map(|v| v.map(|t| Value::String(t.to_string())))?,
        "TIMESTAMPTZ" => row
            .try_get::<Option<DateTime<Utc>>, _>(idx)
            .map(|v| v.map(|t| Value::String(t.to_rfc3339())))?,
        "DATE" => row
            .try_get::<Option<NaiveDate>, _>(idx)
            .map(|v| v.map(|d| Value::String(d.to_string())))?,
        "TIME" => row
            .try_get::<Option<NaiveTime>, _>(idx)
            .map(|v| v.map(|t| Value::String(t.to_string())))?,
        "JSON" | "JSONB" => row.try_get::<Option<Value>, _>(idx)?,
        "BYTEA" => row
            .try_get::<Option<Vec<u8>>, _>(idx)
            .map(|v| v.map(|b| Value::String(String::from_utf8_lossy(&b).into_owned())))?,
        other => {
            // Fall back to text; Postgres can render most scalars that way.
            match row.try_get::<Option<String>, _>(idx) {
                Ok(v) => v.map(Value::String),
                Err(e) => {
                    tracing::warn!(column_type = other, error = %e, "undecodable column");
                    return Err(ExecError::Decode(format!(
                        "unsupported column type '{}'",
                        other
                    )));
                }
            }
        }
    };

    Ok(value.unwrap_or(Value::Null))
}
