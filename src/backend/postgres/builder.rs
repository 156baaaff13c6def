//! SQL builder - plans to parameterized PostgreSQL statements
//!
//! Placeholders are positional (`$1`, `$2`, ...) and numbered left to right
//! across the statement; the parameter list is emitted in the same order.
//! Every statement ends with a single `;`.

use crate::backend::{BackendQuery, BuildError, BuildResult, QueryBuilder, SqlQuery};
use crate::catalog::FieldType;
use crate::dsl::{Operation, Operator};
use crate::planner::{
    AggregateExpr, AggregateFunc, FilterExpr, LogicalOp, QueryPlan, SortTarget,
};
use crate::scalar::Scalar;

/// PostgreSQL wire-type name used in explicit casts, if the type needs one
fn cast_name(field_type: FieldType) -> Option<&'static str> {
    match field_type {
        FieldType::Uuid => Some("uuid"),
        FieldType::Json => Some("jsonb"),
        FieldType::Binary => Some("bytea"),
        FieldType::Timestamp | FieldType::Date | FieldType::DateTime => Some("timestamp"),
        _ => None,
    }
}

/// Whether equality-class comparisons against this type need an explicit
/// cast. Magnitude comparisons are excluded: the backend infers those.
fn needs_cast(field_type: FieldType) -> bool {
    matches!(
        field_type,
        FieldType::Uuid | FieldType::Json | FieldType::Binary | FieldType::Timestamp
    )
}

/// Builds parameterized PostgreSQL statements from plans.
///
/// Stateless; each call allocates a fresh parameter list, so a single
/// instance is safe to use concurrently.
#[derive(Debug, Default)]
pub struct SqlBuilder;

impl SqlBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self
    }
}

impl QueryBuilder for SqlBuilder {
    fn build(&self, plan: &QueryPlan) -> BuildResult<BackendQuery> {
        let emitter = Emitter {
            plan,
            params: Vec::new(),
        };
        let query = match plan.operation {
            Operation::Select => emitter.build_select()?,
            Operation::Create => emitter.build_insert()?,
            Operation::Update => emitter.build_update()?,
            Operation::Delete => emitter.build_delete()?,
        };
        Ok(BackendQuery::Sql(query))
    }
}

/// Per-invocation emission state: the parameter list and its counter
struct Emitter<'a> {
    plan: &'a QueryPlan,
    params: Vec<Scalar>,
}

impl<'a> Emitter<'a> {
    /// Bind a value and return its 1-based placeholder number
    fn push_param(&mut self, value: Scalar) -> usize {
        self.params.push(value);
        self.params.len()
    }

    fn build_select(mut self) -> BuildResult<SqlQuery> {
        let plan = self.plan;
        let mut parts = vec![self.select_clause(), self.from_clause()];

        if let Some(filters) = &plan.filters {
            let clause = self.filter_expr(filters)?;
            parts.push(format!("WHERE {}", clause));
        }

        if !plan.group_by.is_empty() {
            let cols: Vec<String> = plan.group_by.iter().map(|c| c.qualified()).collect();
            parts.push(format!("GROUP BY {}", cols.join(", ")));
        }

        if !plan.sort.is_empty() {
            parts.push(self.order_by_clause());
        }

        parts.push(self.pagination_clause());

        Ok(SqlQuery {
            text: format!("{};", parts.join(" ")),
            params: self.params,
        })
    }

    fn build_insert(mut self) -> BuildResult<SqlQuery> {
        if self.plan.data.is_empty() {
            return Err(BuildError::MissingData("insert".to_string()));
        }

        let plan = self.plan;
        let mut fields = Vec::with_capacity(plan.data.len());
        let mut placeholders = Vec::with_capacity(plan.data.len());
        for (field, value) in &plan.data {
            let n = self.push_param(value.clone());
            fields.push(field.as_str());
            placeholders.push(format!("${}", n));
        }

        Ok(SqlQuery {
            text: format!(
                "INSERT INTO {} ({}) VALUES ({}) RETURNING *;",
                self.plan.root.table,
                fields.join(", "),
                placeholders.join(", "),
            ),
            params: self.params,
        })
    }

    fn build_update(mut self) -> BuildResult<SqlQuery> {
        if self.plan.data.is_empty() {
            return Err(BuildError::MissingData("update".to_string()));
        }

        let plan = self.plan;
        let mut sets = Vec::with_capacity(plan.data.len());
        for (field, value) in &plan.data {
            let n = self.push_param(value.clone());
            sets.push(format!("{} = ${}", field, n));
        }

        // The id path addresses the bare table; the filters path aliases it
        // so compiled column references resolve.
        let (table, selector) = self.selector("update")?;

        Ok(SqlQuery {
            text: format!(
                "UPDATE {} SET {} WHERE {} RETURNING *;",
                table,
                sets.join(", "),
                selector,
            ),
            params: self.params,
        })
    }

    fn build_delete(mut self) -> BuildResult<SqlQuery> {
        let (table, selector) = self.selector("delete")?;

        Ok(SqlQuery {
            text: format!("DELETE FROM {} WHERE {};", table, selector),
            params: self.params,
        })
    }

    /// WHERE selector for update/delete: primary key when an id is present,
    /// otherwise the compiled filter tree. Returns the FROM/target spelling
    /// alongside, aliased only when filters reference columns.
    fn selector(&mut self, operation: &str) -> BuildResult<(String, String)> {
        let plan = self.plan;
        if let Some(id) = &plan.id {
            let n = self.push_param(id.clone());
            return Ok((
                plan.root.table.clone(),
                format!("{} = ${}", plan.root.primary_key.column, n),
            ));
        }

        if let Some(filters) = &plan.filters {
            let clause = self.filter_expr(filters)?;
            let aliased = format!("{} {}", plan.root.table, plan.root.alias);
            return Ok((aliased, clause));
        }

        Err(BuildError::MissingSelector(operation.to_string()))
    }

    fn select_clause(&self) -> String {
        let mut columns: Vec<String> = Vec::new();

        for expr in &self.plan.select {
            let qualified = expr.column.qualified();
            if expr.alias != expr.column.column {
                columns.push(format!("{} AS {}", qualified, expr.alias));
            } else {
                columns.push(qualified);
            }
        }

        // Grouped queries with no explicit projection project the group keys.
        if self.plan.select.is_empty() && !self.plan.group_by.is_empty() {
            for group in &self.plan.group_by {
                columns.push(group.qualified());
            }
        }

        for agg in &self.plan.aggregates {
            columns.push(aggregate_expr(agg));
        }

        if columns.is_empty() {
            "SELECT *".to_string()
        } else {
            format!("SELECT {}", columns.join(", "))
        }
    }

    fn from_clause(&self) -> String {
        format!("FROM {} {}", self.plan.root.table, self.plan.root.alias)
    }

    fn filter_expr(&mut self, expr: &FilterExpr) -> BuildResult<String> {
        match expr {
            FilterExpr::Comparison { left, op, value } => {
                self.comparison(left.qualified(), left.field_type, *op, value.as_ref())
            }
            FilterExpr::Logical { op, children } => self.logical(*op, children),
        }
    }

    fn comparison(
        &mut self,
        column: String,
        field_type: FieldType,
        op: Operator,
        value: Option<&Scalar>,
    ) -> BuildResult<String> {
        match op {
            Operator::Eq | Operator::Ne => {
                let n = self.push_param(required(op, value)?);
                let placeholder = cast_placeholder(n, field_type, false);
                let sql_op = if op == Operator::Eq { "=" } else { "!=" };
                Ok(format!("{} {} {}", column, sql_op, placeholder))
            }
            Operator::Gt | Operator::After => {
                let n = self.push_param(required(op, value)?);
                Ok(format!("{} > ${}", column, n))
            }
            Operator::Gte => {
                let n = self.push_param(required(op, value)?);
                Ok(format!("{} >= ${}", column, n))
            }
            Operator::Lt | Operator::Before => {
                let n = self.push_param(required(op, value)?);
                Ok(format!("{} < ${}", column, n))
            }
            Operator::Lte => {
                let n = self.push_param(required(op, value)?);
                Ok(format!("{} <= ${}", column, n))
            }
            Operator::In => {
                let n = self.push_param(required(op, value)?);
                let placeholder = cast_placeholder(n, field_type, true);
                Ok(format!("{} = ANY({})", column, placeholder))
            }
            Operator::NotIn => {
                let n = self.push_param(required(op, value)?);
                let placeholder = cast_placeholder(n, field_type, true);
                Ok(format!("{} != ALL({})", column, placeholder))
            }
            Operator::IsNull => Ok(format!("{} IS NULL", column)),
            Operator::NotNull => Ok(format!("{} IS NOT NULL", column)),
            Operator::Like => {
                let n = self.push_param(required(op, value)?);
                Ok(format!("{} LIKE ${}", column, n))
            }
            Operator::Ilike => {
                let n = self.push_param(required(op, value)?);
                Ok(format!("{} ILIKE ${}", column, n))
            }
            Operator::StartsWith => {
                let pattern = format!("{}%", text_value(op, value)?);
                let n = self.push_param(Scalar::Text(pattern));
                Ok(format!("{} LIKE ${}", column, n))
            }
            Operator::EndsWith => {
                let pattern = format!("%{}", text_value(op, value)?);
                let n = self.push_param(Scalar::Text(pattern));
                Ok(format!("{} LIKE ${}", column, n))
            }
            Operator::Contains => {
                let pattern = format!("%{}%", text_value(op, value)?);
                let n = self.push_param(Scalar::Text(pattern));
                Ok(format!("{} LIKE ${}", column, n))
            }
            Operator::Between => {
                let bounds = pair_value(op, value)?;
                let low = self.push_param(bounds.0);
                let high = self.push_param(bounds.1);
                Ok(format!("{} BETWEEN ${} AND ${}", column, low, high))
            }
        }
    }

    fn logical(&mut self, op: LogicalOp, children: &[FilterExpr]) -> BuildResult<String> {
        if children.is_empty() {
            return Err(BuildError::Internal(
                "logical filter has no children".to_string(),
            ));
        }

        let mut parts = Vec::with_capacity(children.len());
        for child in children {
            parts.push(self.filter_expr(child)?);
        }

        match op {
            LogicalOp::And => Ok(format!("({})", parts.join(" AND "))),
            LogicalOp::Or => Ok(format!("({})", parts.join(" OR "))),
            LogicalOp::Not => {
                if parts.len() != 1 {
                    return Err(BuildError::Internal(
                        "NOT filter must have exactly one child".to_string(),
                    ));
                }
                Ok(format!("NOT {}", parts[0]))
            }
        }
    }

    fn order_by_clause(&self) -> String {
        let cols: Vec<String> = self
            .plan
            .sort
            .iter()
            .map(|sort| {
                let target = match &sort.target {
                    SortTarget::Column(col) => col.qualified(),
                    SortTarget::AggregateAlias(alias) => alias.clone(),
                };
                let direction = if sort.descending { "DESC" } else { "ASC" };
                format!("{} {}", target, direction)
            })
            .collect();
        format!("ORDER BY {}", cols.join(", "))
    }

    /// Always emits both values, even when zero, so the parameter count of a
    /// select is deterministic.
    fn pagination_clause(&mut self) -> String {
        let limit = self.push_param(Scalar::Int(self.plan.pagination.limit as i64));
        let offset = self.push_param(Scalar::Int(self.plan.pagination.offset as i64));
        format!("LIMIT ${} OFFSET ${}", limit, offset)
    }
}

/// `$n`, `$n::uuid`, or `$n::uuid[]` for sequence parameters
fn cast_placeholder(n: usize, field_type: FieldType, sequence: bool) -> String {
    if !needs_cast(field_type) {
        return format!("${}", n);
    }
    let name = cast_name(field_type).expect("castable type has a wire name");
    if sequence {
        format!("${}::{}[]", n, name)
    } else {
        format!("${}::{}", n, name)
    }
}

fn aggregate_expr(agg: &AggregateExpr) -> String {
    let inner = match (&agg.func, &agg.column) {
        (AggregateFunc::Count, None) => "COUNT(*)".to_string(),
        (func, Some(col)) => format!("{}({})", func.sql_name(), col.qualified()),
        (func, None) => format!("{}(*)", func.sql_name()),
    };
    format!("{} AS {}", inner, agg.alias)
}

fn required(op: Operator, value: Option<&Scalar>) -> BuildResult<Scalar> {
    value
        .cloned()
        .ok_or_else(|| BuildError::MissingValue(op.to_string()))
}

fn text_value(op: Operator, value: Option<&Scalar>) -> BuildResult<String> {
    match value {
        Some(Scalar::Text(s)) => Ok(s.clone()),
        Some(_) => Err(BuildError::InvalidValue {
            op: op.to_string(),
            reason: "expected a string".to_string(),
        }),
        None => Err(BuildError::MissingValue(op.to_string())),
    }
}

fn pair_value(op: Operator, value: Option<&Scalar>) -> BuildResult<(Scalar, Scalar)> {
    match value {
        Some(Scalar::List(items)) if items.len() == 2 => {
            Ok((items[0].clone(), items[1].clone()))
        }
        Some(_) => Err(BuildError::InvalidValue {
            op: op.to_string(),
            reason: "expected an ordered pair [low, high]".to_string(),
        }),
        None => Err(BuildError::MissingValue(op.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Field, FieldType, Model, Registry};
    use crate::config::ModelConfig;
    use crate::dsl::Query;
    use crate::planner::Planner;

    fn test_registry() -> Registry {
        let orders = Model::new("orders", "orders")
            .primary_key("id")
            .field(Field::new("id", FieldType::Uuid).nullable(false))
            .field(Field::new("user_id", FieldType::Uuid))
            .field(Field::new("status", FieldType::String).nullable(false))
            .field(Field::new("amount", FieldType::Decimal))
            .field(Field::new("metadata", FieldType::Json))
            .field(Field::new("created_at", FieldType::Timestamp));

        Registry::load(ModelConfig {
            models: vec![orders],
        })
        .unwrap()
    }

    fn build(value: serde_json::Value) -> SqlQuery {
        let registry = test_registry();
        let query: Query = serde_json::from_value(value).unwrap();
        let plan = Planner::new(&registry).plan(&query).unwrap();
        match SqlBuilder::new().build(&plan).unwrap() {
            BackendQuery::Sql(sql) => sql,
            BackendQuery::Document(_) => panic!("expected SQL"),
        }
    }

    #[test]
    fn test_select_star_with_defaults() {
        let sql = build(serde_json::json!({ "model": "orders" }));
        assert_eq!(sql.text, "SELECT * FROM orders t0 LIMIT $1 OFFSET $2;");
        assert_eq!(sql.params, vec![Scalar::Int(100), Scalar::Int(0)]);
    }

    #[test]
    fn test_uuid_equality_gets_cast() {
        let sql = build(serde_json::json!({
            "model": "orders",
            "filters": { "field": "user_id", "op": "=", "value": "11111111-1111-1111-1111-111111111111" }
        }));
        assert_eq!(
            sql.text,
            "SELECT * FROM orders t0 WHERE t0.user_id = $1::uuid LIMIT $2 OFFSET $3;"
        );
        assert_eq!(
            sql.params,
            vec![
                Scalar::Text("11111111-1111-1111-1111-111111111111".to_string()),
                Scalar::Int(100),
                Scalar::Int(0)
            ]
        );
    }

    #[test]
    fn test_magnitude_comparison_skips_cast() {
        let sql = build(serde_json::json!({
            "model": "orders",
            "filters": { "field": "created_at", "op": ">", "value": "2024-01-01T00:00:00Z" }
        }));
        assert!(sql.text.contains("t0.created_at > $1 "));
        assert!(!sql.text.contains("::timestamp"));
    }

    #[test]
    fn test_in_uses_any_with_array_cast() {
        let sql = build(serde_json::json!({
            "model": "orders",
            "filters": { "field": "user_id", "op": "in",
                         "value": ["11111111-1111-1111-1111-111111111111"] }
        }));
        assert!(sql.text.contains("t0.user_id = ANY($1::uuid[])"));

        let sql = build(serde_json::json!({
            "model": "orders",
            "filters": { "field": "status", "op": "not_in", "value": ["a", "b"] }
        }));
        assert!(sql.text.contains("t0.status != ALL($1)"));
    }

    #[test]
    fn test_pattern_operators_wrap_value() {
        let sql = build(serde_json::json!({
            "model": "orders",
            "filters": { "field": "status", "op": "starts_with", "value": "A" }
        }));
        assert!(sql.text.contains("t0.status LIKE $1"));
        assert_eq!(sql.params[0], Scalar::Text("A%".to_string()));

        let sql = build(serde_json::json!({
            "model": "orders",
            "filters": { "field": "status", "op": "ends_with", "value": "Z" }
        }));
        assert_eq!(sql.params[0], Scalar::Text("%Z".to_string()));

        let sql = build(serde_json::json!({
            "model": "orders",
            "filters": { "field": "status", "op": "contains", "value": "mid" }
        }));
        assert_eq!(sql.params[0], Scalar::Text("%mid%".to_string()));
    }

    #[test]
    fn test_between_binds_low_then_high() {
        let sql = build(serde_json::json!({
            "model": "orders",
            "filters": { "field": "amount", "op": "between", "value": [10, 20] }
        }));
        assert!(sql.text.contains("t0.amount BETWEEN $1 AND $2"));
        assert_eq!(sql.params[0], Scalar::Int(10));
        assert_eq!(sql.params[1], Scalar::Int(20));
    }

    #[test]
    fn test_null_checks_take_no_parameter() {
        let sql = build(serde_json::json!({
            "model": "orders",
            "filters": { "and": [
                { "field": "amount", "op": "is_null" },
                { "field": "status", "op": "not_null" }
            ]}
        }));
        assert!(sql
            .text
            .contains("WHERE (t0.amount IS NULL AND t0.status IS NOT NULL)"));
        // only pagination params
        assert_eq!(sql.params.len(), 2);
    }

    #[test]
    fn test_not_filter() {
        let sql = build(serde_json::json!({
            "model": "orders",
            "filters": { "not": { "field": "status", "op": "=", "value": "VOID" } }
        }));
        assert!(sql.text.contains("WHERE NOT t0.status = $1"));
    }

    #[test]
    fn test_group_by_with_count() {
        let sql = build(serde_json::json!({
            "model": "orders",
            "group_by": ["status"],
            "aggregates": [{ "fn": "count", "field": "", "alias": "n" }]
        }));
        assert_eq!(
            sql.text,
            "SELECT t0.status, COUNT(*) AS n FROM orders t0 GROUP BY t0.status LIMIT $1 OFFSET $2;"
        );
    }

    #[test]
    fn test_insert_orders_fields_lexicographically() {
        let sql = build(serde_json::json!({
            "operation": "create",
            "model": "orders",
            "data": { "status": "NEW", "amount": 10 }
        }));
        assert_eq!(
            sql.text,
            "INSERT INTO orders (amount, status) VALUES ($1, $2) RETURNING *;"
        );
        assert_eq!(
            sql.params,
            vec![Scalar::Int(10), Scalar::Text("NEW".to_string())]
        );
    }

    #[test]
    fn test_update_by_id() {
        let sql = build(serde_json::json!({
            "operation": "update",
            "model": "orders",
            "id": "11111111-1111-1111-1111-111111111111",
            "data": { "status": "PAID" }
        }));
        assert_eq!(
            sql.text,
            "UPDATE orders SET status = $1 WHERE id = $2 RETURNING *;"
        );
        assert_eq!(sql.params.len(), 2);
    }

    #[test]
    fn test_update_by_filters_aliases_table() {
        let sql = build(serde_json::json!({
            "operation": "update",
            "model": "orders",
            "filters": { "field": "status", "op": "=", "value": "NEW" },
            "data": { "status": "STALE" }
        }));
        assert_eq!(
            sql.text,
            "UPDATE orders t0 SET status = $1 WHERE t0.status = $2 RETURNING *;"
        );
    }

    #[test]
    fn test_delete_by_id_and_by_filters() {
        let sql = build(serde_json::json!({
            "operation": "delete",
            "model": "orders",
            "id": 7
        }));
        assert_eq!(sql.text, "DELETE FROM orders WHERE id = $1;");
        assert_eq!(sql.params, vec![Scalar::Int(7)]);

        let sql = build(serde_json::json!({
            "operation": "delete",
            "model": "orders",
            "filters": { "field": "status", "op": "=", "value": "VOID" }
        }));
        assert_eq!(sql.text, "DELETE FROM orders t0 WHERE t0.status = $1;");
    }

    #[test]
    fn test_sort_by_column_and_aggregate_alias() {
        let sql = build(serde_json::json!({
            "model": "orders",
            "group_by": ["status"],
            "aggregates": [{ "fn": "sum", "field": "amount", "alias": "total" }],
            "sort": [
                { "field": "total", "direction": "desc" },
                { "field": "status" }
            ]
        }));
        assert!(sql.text.contains("ORDER BY total DESC, t0.status ASC"));
        assert!(sql.text.contains("SUM(t0.amount) AS total"));
    }
}
