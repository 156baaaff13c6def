//! DSL - the JSON query language accepted at the `POST /query` boundary
//!
//! This module owns the wire types and their validation against a
//! [`Registry`](crate::catalog::Registry) snapshot. Nothing outside the DSL
//! layer and the planner parses the wire form.

pub mod error;
pub mod validator;

use serde::Deserialize;
use serde_json::Value;

pub use error::{ValidateError, ValidateResult};
pub use validator::validate;

/// Query operation (default `select`)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    /// Read rows
    #[default]
    Select,
    /// Insert one record
    Create,
    /// Update records by id or filter
    Update,
    /// Delete records by id or filter
    Delete,
}

impl Operation {
    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Select => "select",
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }
}

/// Comparison operators (closed set)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    NotIn,
    IsNull,
    NotNull,
    Like,
    Ilike,
    StartsWith,
    EndsWith,
    Contains,
    Between,
    Before,
    After,
}

/// How many values an operator consumes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueArity {
    /// No value (`is_null`, `not_null`)
    None,
    /// Single scalar
    Single,
    /// Sequence of scalars (`in`, `not_in`)
    Many,
    /// Ordered pair (`between`)
    Pair,
}

impl Operator {
    /// Parse the wire spelling of an operator.
    ///
    /// Operators arrive as free-form strings; unrecognized spellings surface
    /// as `UnknownOperator` from the validator rather than a parse failure.
    pub fn parse(s: &str) -> Option<Operator> {
        match s {
            "=" => Some(Operator::Eq),
            "!=" => Some(Operator::Ne),
            ">" => Some(Operator::Gt),
            ">=" => Some(Operator::Gte),
            "<" => Some(Operator::Lt),
            "<=" => Some(Operator::Lte),
            "in" => Some(Operator::In),
            "not_in" => Some(Operator::NotIn),
            "is_null" => Some(Operator::IsNull),
            "not_null" => Some(Operator::NotNull),
            "like" => Some(Operator::Like),
            "ilike" => Some(Operator::Ilike),
            "starts_with" => Some(Operator::StartsWith),
            "ends_with" => Some(Operator::EndsWith),
            "contains" => Some(Operator::Contains),
            "between" => Some(Operator::Between),
            "before" => Some(Operator::Before),
            "after" => Some(Operator::After),
            _ => None,
        }
    }

    /// Wire spelling
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "!=",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::In => "in",
            Operator::NotIn => "not_in",
            Operator::IsNull => "is_null",
            Operator::NotNull => "not_null",
            Operator::Like => "like",
            Operator::Ilike => "ilike",
            Operator::StartsWith => "starts_with",
            Operator::EndsWith => "ends_with",
            Operator::Contains => "contains",
            Operator::Between => "between",
            Operator::Before => "before",
            Operator::After => "after",
        }
    }

    /// Value arity for this operator
    pub fn arity(&self) -> ValueArity {
        match self {
            Operator::IsNull | Operator::NotNull => ValueArity::None,
            Operator::In | Operator::NotIn => ValueArity::Many,
            Operator::Between => ValueArity::Pair,
            _ => ValueArity::Single,
        }
    }
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregate function names accepted on the wire
pub const AGGREGATE_FUNCTIONS: &[&str] = &["count", "sum", "avg", "min", "max"];

/// A filter tree node: either a comparison leaf or a logical combinator
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum FilterNode {
    /// `{ "and": [ ... ] }`
    And { and: Vec<FilterNode> },
    /// `{ "or": [ ... ] }`
    Or { or: Vec<FilterNode> },
    /// `{ "not": ... }`
    Not { not: Box<FilterNode> },
    /// `{ "field": ..., "op": ..., "value": ... }`
    Comparison {
        field: String,
        op: String,
        #[serde(default)]
        value: Option<Value>,
    },
}

/// Aggregate spec: `{ "fn": "count", "field": "", "alias": "n" }`
#[derive(Debug, Clone, Deserialize)]
pub struct AggregateSpec {
    /// Function name (count/sum/avg/min/max)
    #[serde(rename = "fn")]
    pub func: String,
    /// Target field; empty for `count` over rows
    #[serde(default)]
    pub field: String,
    /// Output column alias
    pub alias: String,
}

/// Sort spec: `{ "field": ..., "direction": "asc"|"desc" }`
#[derive(Debug, Clone, Deserialize)]
pub struct SortSpec {
    /// Field name or aggregate alias
    pub field: String,
    /// Sort direction; anything other than `desc` sorts ascending
    #[serde(default)]
    pub direction: Option<String>,
}

impl SortSpec {
    /// Whether this spec asks for a descending sort
    pub fn is_descending(&self) -> bool {
        self.direction
            .as_deref()
            .map(|d| d.eq_ignore_ascii_case("desc"))
            .unwrap_or(false)
    }
}

/// Pagination spec; signed so that negative inputs are caught by validation
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageSpec {
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: Option<i64>,
}

/// A DSL query as received on the wire
#[derive(Debug, Clone, Deserialize)]
pub struct Query {
    /// Operation, defaults to `select`
    #[serde(default)]
    pub operation: Operation,
    /// Target model name
    #[serde(default)]
    pub model: String,
    /// Projected fields; empty means all
    #[serde(default)]
    pub fields: Vec<String>,
    /// Filter tree
    #[serde(default)]
    pub filters: Option<FilterNode>,
    /// Grouping fields
    #[serde(default)]
    pub group_by: Vec<String>,
    /// Aggregate expressions
    #[serde(default)]
    pub aggregates: Vec<AggregateSpec>,
    /// Sort expressions
    #[serde(default)]
    pub sort: Vec<SortSpec>,
    /// Pagination
    #[serde(default)]
    pub pagination: Option<PageSpec>,
    /// Record payload for create/update
    #[serde(default)]
    pub data: Option<serde_json::Map<String, Value>>,
    /// Identifier for update/delete by primary key
    #[serde(default)]
    pub id: Option<Value>,
}
