//! Command builder - plans to document-store commands
//!
//! Operator support is narrower than the relational builder's: `ilike`,
//! `starts_with`, `ends_with`, `between`, `before`, and `after` have no
//! document compilation and are rejected with
//! [`BuildError::UnsupportedOperator`].

use bson::{doc, Bson, Document};

use crate::backend::mongo::command::{scalar_to_bson, DocumentCommand, DocumentOp, FindOpts};
use crate::backend::{BackendQuery, BuildError, BuildResult, QueryBuilder};
use crate::dsl::{Operation, Operator};
use crate::planner::{AggregateFunc, FilterExpr, LogicalOp, QueryPlan, SortTarget};
use crate::scalar::Scalar;

const BACKEND: &str = "mongodb";

/// Builds document commands from plans. Stateless and shareable.
#[derive(Debug, Default)]
pub struct CommandBuilder;

impl CommandBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self
    }
}

impl QueryBuilder for CommandBuilder {
    fn build(&self, plan: &QueryPlan) -> BuildResult<BackendQuery> {
        let command = match plan.operation {
            Operation::Select => {
                if plan.group_by.is_empty() && plan.aggregates.is_empty() {
                    build_find(plan)?
                } else {
                    build_aggregate(plan)?
                }
            }
            Operation::Create => build_insert(plan)?,
            Operation::Update => build_update(plan)?,
            Operation::Delete => build_delete(plan)?,
        };
        Ok(BackendQuery::Document(command))
    }
}

fn build_find(plan: &QueryPlan) -> BuildResult<DocumentCommand> {
    let mut command = DocumentCommand::new(&plan.root.table, DocumentOp::Find);
    command.filter = Some(compile_filters(plan)?);
    command.options = Some(FindOpts {
        limit: plan.pagination.limit as i64,
        skip: plan.pagination.offset as u64,
        sort: sort_document(plan),
    });
    Ok(command)
}

fn build_aggregate(plan: &QueryPlan) -> BuildResult<DocumentCommand> {
    let mut pipeline = Vec::new();

    let filter = compile_filters(plan)?;
    if !filter.is_empty() {
        pipeline.push(doc! { "$match": filter });
    }

    // _id carries the grouping keys; a global aggregate groups over null.
    let group_id = if plan.group_by.is_empty() {
        Bson::Null
    } else {
        let mut id = Document::new();
        for group in &plan.group_by {
            id.insert(group.column.clone(), format!("${}", group.column));
        }
        Bson::Document(id)
    };

    let mut group = doc! { "_id": group_id };
    for agg in &plan.aggregates {
        let accumulator = match (&agg.func, &agg.column) {
            (AggregateFunc::Count, _) => doc! { "$sum": 1 },
            (func, Some(col)) => {
                let name = match func {
                    AggregateFunc::Sum => "$sum",
                    AggregateFunc::Avg => "$avg",
                    AggregateFunc::Min => "$min",
                    AggregateFunc::Max => "$max",
                    AggregateFunc::Count => unreachable!(),
                };
                doc! { name: format!("${}", col.column) }
            }
            (func, None) => {
                return Err(BuildError::Internal(format!(
                    "aggregate '{:?}' requires a column",
                    func
                )));
            }
        };
        group.insert(agg.alias.clone(), accumulator);
    }
    pipeline.push(doc! { "$group": group });

    if let Some(sort) = sort_document(plan) {
        pipeline.push(doc! { "$sort": sort });
    }

    pipeline.push(doc! { "$skip": plan.pagination.offset as i64 });
    pipeline.push(doc! { "$limit": plan.pagination.limit as i64 });

    let mut command = DocumentCommand::new(&plan.root.table, DocumentOp::Aggregate);
    command.pipeline = Some(pipeline);
    Ok(command)
}

fn build_insert(plan: &QueryPlan) -> BuildResult<DocumentCommand> {
    if plan.data.is_empty() {
        return Err(BuildError::MissingData("insert".to_string()));
    }

    let mut document = Document::new();
    for (field, value) in &plan.data {
        document.insert(field.clone(), scalar_to_bson(value)?);
    }

    let mut command = DocumentCommand::new(&plan.root.table, DocumentOp::Insert);
    command.document = Some(document);
    Ok(command)
}

fn build_update(plan: &QueryPlan) -> BuildResult<DocumentCommand> {
    if plan.data.is_empty() {
        return Err(BuildError::MissingData("update".to_string()));
    }

    let mut set = Document::new();
    for (field, value) in &plan.data {
        set.insert(field.clone(), scalar_to_bson(value)?);
    }

    let mut command = DocumentCommand::new(&plan.root.table, DocumentOp::Update);
    command.filter = Some(selector(plan, "update")?);
    command.update = Some(doc! { "$set": set });
    Ok(command)
}

fn build_delete(plan: &QueryPlan) -> BuildResult<DocumentCommand> {
    let mut command = DocumentCommand::new(&plan.root.table, DocumentOp::Delete);
    command.filter = Some(selector(plan, "delete")?);
    Ok(command)
}

/// Filter for update/delete: explicit filters win, otherwise the primary
/// key is matched against the plan id.
fn selector(plan: &QueryPlan, operation: &str) -> BuildResult<Document> {
    if let Some(filters) = &plan.filters {
        return compile_filter(filters);
    }
    if let Some(id) = &plan.id {
        let mut filter = Document::new();
        filter.insert(plan.root.primary_key.column.clone(), scalar_to_bson(id)?);
        return Ok(filter);
    }
    Err(BuildError::MissingSelector(operation.to_string()))
}

fn compile_filters(plan: &QueryPlan) -> BuildResult<Document> {
    match &plan.filters {
        Some(filters) => compile_filter(filters),
        None => Ok(Document::new()),
    }
}

fn compile_filter(expr: &FilterExpr) -> BuildResult<Document> {
    match expr {
        FilterExpr::Comparison { left, op, value } => {
            compile_comparison(&left.column, *op, value.as_ref())
        }
        FilterExpr::Logical { op, children } => {
            let compiled = children
                .iter()
                .map(compile_filter)
                .collect::<BuildResult<Vec<_>>>()?;
            let key = match op {
                LogicalOp::And => "$and",
                LogicalOp::Or => "$or",
                LogicalOp::Not => "$not",
            };
            let mut out = Document::new();
            out.insert(key, compiled);
            Ok(out)
        }
    }
}

fn compile_comparison(
    field: &str,
    op: Operator,
    value: Option<&Scalar>,
) -> BuildResult<Document> {
    let required = |v: Option<&Scalar>| -> BuildResult<Bson> {
        match v {
            Some(s) => scalar_to_bson(s),
            None => Err(BuildError::MissingValue(op.to_string())),
        }
    };

    let mut out = Document::new();
    match op {
        // Equality uses the bare shorthand.
        Operator::Eq => {
            out.insert(field, required(value)?);
        }
        Operator::Ne => {
            out.insert(field, doc! { "$ne": required(value)? });
        }
        Operator::Gt => {
            out.insert(field, doc! { "$gt": required(value)? });
        }
        Operator::Gte => {
            out.insert(field, doc! { "$gte": required(value)? });
        }
        Operator::Lt => {
            out.insert(field, doc! { "$lt": required(value)? });
        }
        Operator::Lte => {
            out.insert(field, doc! { "$lte": required(value)? });
        }
        Operator::In => {
            out.insert(field, doc! { "$in": required(value)? });
        }
        Operator::NotIn => {
            out.insert(field, doc! { "$nin": required(value)? });
        }
        // Substring match; the value must be text.
        Operator::Like | Operator::Contains => match value {
            Some(Scalar::Text(s)) => {
                out.insert(field, doc! { "$regex": s.clone() });
            }
            Some(_) => {
                return Err(BuildError::InvalidValue {
                    op: op.to_string(),
                    reason: "expected a string".to_string(),
                })
            }
            None => return Err(BuildError::MissingValue(op.to_string())),
        },
        Operator::IsNull => {
            out.insert(field, doc! { "$exists": false });
        }
        Operator::NotNull => {
            out.insert(field, doc! { "$exists": true });
        }
        Operator::Ilike
        | Operator::StartsWith
        | Operator::EndsWith
        | Operator::Between
        | Operator::Before
        | Operator::After => {
            return Err(BuildError::UnsupportedOperator {
                op: op.to_string(),
                backend: BACKEND,
            });
        }
    }
    Ok(out)
}

/// Ordered `field → 1|-1` mapping, None when the plan has no sort
fn sort_document(plan: &QueryPlan) -> Option<Document> {
    if plan.sort.is_empty() {
        return None;
    }

    let mut sort = Document::new();
    for expr in &plan.sort {
        let field = match &expr.target {
            SortTarget::Column(col) => col.column.clone(),
            SortTarget::AggregateAlias(alias) => alias.clone(),
        };
        sort.insert(field, if expr.descending { -1 } else { 1 });
    }
    Some(sort)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Field, FieldType, Model, Registry};
    use crate::config::ModelConfig;
    use crate::dsl::Query;
    use crate::planner::Planner;

    fn test_registry() -> Registry {
        let users = Model::new("users", "users")
            .primary_key("_id")
            .field(Field::new("_id", FieldType::Uuid).nullable(false))
            .field(Field::new("status", FieldType::String).nullable(false))
            .field(Field::new("age", FieldType::Integer))
            .field(Field::new("name", FieldType::String));

        Registry::load(ModelConfig {
            models: vec![users],
        })
        .unwrap()
    }

    fn build(value: serde_json::Value) -> DocumentCommand {
        let registry = test_registry();
        let query: Query = serde_json::from_value(value).unwrap();
        let plan = Planner::new(&registry).plan(&query).unwrap();
        match CommandBuilder::new().build(&plan).unwrap() {
            BackendQuery::Document(cmd) => cmd,
            BackendQuery::Sql(_) => panic!("expected a document command"),
        }
    }

    #[test]
    fn test_find_with_in_filter() {
        let cmd = build(serde_json::json!({
            "model": "users",
            "filters": { "field": "status", "op": "in", "value": ["active", "pending"] }
        }));

        assert_eq!(cmd.operation, DocumentOp::Find);
        assert_eq!(cmd.collection, "users");
        assert_eq!(
            cmd.filter.unwrap(),
            doc! { "status": { "$in": ["active", "pending"] } }
        );
        let opts = cmd.options.unwrap();
        assert_eq!(opts.limit, 100);
        assert_eq!(opts.skip, 0);
        assert!(opts.sort.is_none());
    }

    #[test]
    fn test_equality_uses_bare_shorthand() {
        let cmd = build(serde_json::json!({
            "model": "users",
            "filters": { "field": "status", "op": "=", "value": "active" }
        }));
        assert_eq!(cmd.filter.unwrap(), doc! { "status": "active" });
    }

    #[test]
    fn test_logical_and_null_checks() {
        let cmd = build(serde_json::json!({
            "model": "users",
            "filters": { "and": [
                { "field": "age", "op": ">=", "value": 21 },
                { "field": "name", "op": "not_null" }
            ]}
        }));
        assert_eq!(
            cmd.filter.unwrap(),
            doc! { "$and": [
                { "age": { "$gte": 21_i64 } },
                { "name": { "$exists": true } }
            ]}
        );
    }

    #[test]
    fn test_unsupported_operators_are_rejected() {
        let registry = test_registry();
        for op in ["ilike", "starts_with", "ends_with", "between", "before", "after"] {
            let value = if op == "between" {
                serde_json::json!([1, 2])
            } else if op == "before" || op == "after" {
                serde_json::json!(1)
            } else {
                serde_json::json!("x")
            };
            let query: Query = serde_json::from_value(serde_json::json!({
                "model": "users",
                "filters": { "field": "name", "op": op, "value": value }
            }))
            .unwrap();
            let plan = Planner::new(&registry).plan(&query).unwrap();
            let err = CommandBuilder::new().build(&plan).unwrap_err();
            assert!(
                matches!(err, BuildError::UnsupportedOperator { .. }),
                "operator {} should be unsupported",
                op
            );
        }
    }

    #[test]
    fn test_aggregate_pipeline() {
        let cmd = build(serde_json::json!({
            "model": "users",
            "filters": { "field": "age", "op": ">", "value": 18 },
            "group_by": ["status"],
            "aggregates": [
                { "fn": "count", "field": "", "alias": "n" },
                { "fn": "avg", "field": "age", "alias": "avg_age" }
            ],
            "sort": [{ "field": "n", "direction": "desc" }],
            "pagination": { "limit": 10, "offset": 5 }
        }));

        assert_eq!(cmd.operation, DocumentOp::Aggregate);
        let pipeline = cmd.pipeline.unwrap();
        assert_eq!(pipeline.len(), 5);
        assert_eq!(pipeline[0], doc! { "$match": { "age": { "$gt": 18_i64 } } });
        assert_eq!(
            pipeline[1],
            doc! { "$group": {
                "_id": { "status": "$status" },
                "n": { "$sum": 1 },
                "avg_age": { "$avg": "$age" }
            }}
        );
        assert_eq!(pipeline[2], doc! { "$sort": { "n": -1 } });
        assert_eq!(pipeline[3], doc! { "$skip": 5_i64 });
        assert_eq!(pipeline[4], doc! { "$limit": 10_i64 });
    }

    #[test]
    fn test_insert_update_delete() {
        let cmd = build(serde_json::json!({
            "operation": "create",
            "model": "users",
            "data": { "status": "active", "name": "A" }
        }));
        assert_eq!(cmd.operation, DocumentOp::Insert);
        assert_eq!(
            cmd.document.unwrap(),
            doc! { "name": "A", "status": "active" }
        );

        let cmd = build(serde_json::json!({
            "operation": "update",
            "model": "users",
            "id": "u-1",
            "data": { "status": "inactive" }
        }));
        assert_eq!(cmd.operation, DocumentOp::Update);
        assert_eq!(cmd.filter.unwrap(), doc! { "_id": "u-1" });
        assert_eq!(
            cmd.update.unwrap(),
            doc! { "$set": { "status": "inactive" } }
        );

        let cmd = build(serde_json::json!({
            "operation": "delete",
            "model": "users",
            "filters": { "field": "status", "op": "=", "value": "stale" }
        }));
        assert_eq!(cmd.operation, DocumentOp::Delete);
        assert_eq!(cmd.filter.unwrap(), doc! { "status": "stale" });
    }

    #[test]
    fn test_sort_mapping_preserves_order() {
        let cmd = build(serde_json::json!({
            "model": "users",
            "sort": [
                { "field": "status", "direction": "desc" },
                { "field": "age" }
            ]
        }));
        let sort = cmd.options.unwrap().sort.unwrap();
        let keys: Vec<&str> = sort.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["status", "age"]);
        assert_eq!(sort.get("status"), Some(&Bson::Int32(-1)));
        assert_eq!(sort.get("age"), Some(&Bson::Int32(1)));
    }
}
