//! Plan types - the backend-neutral representation of a validated query
//!
//! Plans are value types: created by the planner from one DSL request,
//! consumed once by one builder, and never mutated after construction.

use std::fmt;

use crate::catalog::FieldType;
use crate::dsl::{Operation, Operator};
use crate::scalar::Scalar;

/// A typed column reference: `(model alias, column name, data type)`
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnRef {
    /// Planner-assigned model alias (`t0` for the root model)
    pub table_alias: String,
    /// Physical column or document field name
    pub column: String,
    /// Declared field type
    pub field_type: FieldType,
}

impl ColumnRef {
    /// Qualified `alias.column` spelling used by the relational builder
    pub fn qualified(&self) -> String {
        format!("{}.{}", self.table_alias, self.column)
    }
}

/// Logical combinator in a filter tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
    Not,
}

impl fmt::Display for LogicalOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogicalOp::And => "AND",
            LogicalOp::Or => "OR",
            LogicalOp::Not => "NOT",
        })
    }
}

/// A filter expression: comparison leaf or logical combinator.
///
/// Children are owned by their parent; the tree is immutable after the
/// planner builds it, and child order is preserved through compilation.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterExpr {
    /// `left OP value`
    Comparison {
        left: ColumnRef,
        op: Operator,
        value: Option<Scalar>,
    },
    /// AND/OR over one or more children, NOT over exactly one
    Logical {
        op: LogicalOp,
        children: Vec<FilterExpr>,
    },
}

/// Aggregate function (closed set)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFunc {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl AggregateFunc {
    /// Parse the wire name
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "count" => Some(AggregateFunc::Count),
            "sum" => Some(AggregateFunc::Sum),
            "avg" => Some(AggregateFunc::Avg),
            "min" => Some(AggregateFunc::Min),
            "max" => Some(AggregateFunc::Max),
            _ => None,
        }
    }

    /// SQL spelling
    pub fn sql_name(&self) -> &'static str {
        match self {
            AggregateFunc::Count => "COUNT",
            AggregateFunc::Sum => "SUM",
            AggregateFunc::Avg => "AVG",
            AggregateFunc::Min => "MIN",
            AggregateFunc::Max => "MAX",
        }
    }
}

/// An aggregate expression; `count` permits a missing column (counts rows)
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateExpr {
    pub func: AggregateFunc,
    pub column: Option<ColumnRef>,
    pub alias: String,
}

/// What a sort expression points at
#[derive(Debug, Clone, PartialEq)]
pub enum SortTarget {
    /// An on-model column
    Column(ColumnRef),
    /// An aggregate alias declared in the same query
    AggregateAlias(String),
}

/// A sort expression
#[derive(Debug, Clone, PartialEq)]
pub struct SortExpr {
    pub target: SortTarget,
    pub descending: bool,
}

/// A projected column with its output alias
#[derive(Debug, Clone, PartialEq)]
pub struct SelectExpr {
    pub column: ColumnRef,
    pub alias: String,
}

/// Pagination window; the planner always populates both values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub limit: u32,
    pub offset: u32,
}

/// The root model binding of a plan
#[derive(Debug, Clone, PartialEq)]
pub struct RootModel {
    /// Model name as registered
    pub model: String,
    /// Physical table or collection name
    pub table: String,
    /// Planner-assigned alias; builders read this rather than assuming `t0`
    pub alias: String,
    /// Typed reference to the primary-key column
    pub primary_key: ColumnRef,
}

/// The frozen, validated plan consumed by backend builders
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    pub operation: Operation,
    pub root: RootModel,
    /// Projection; empty means `*`
    pub select: Vec<SelectExpr>,
    pub filters: Option<FilterExpr>,
    pub group_by: Vec<ColumnRef>,
    pub aggregates: Vec<AggregateExpr>,
    pub sort: Vec<SortExpr>,
    pub pagination: Pagination,
    /// Record payload for create/update, key-ordered lexicographically
    pub data: Vec<(String, Scalar)>,
    /// Identifier for update/delete by primary key
    pub id: Option<Scalar>,
}
