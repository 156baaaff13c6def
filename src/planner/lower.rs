//! Lowering - DSL query to backend-neutral plan
//!
//! Resolves every field-name reference into a typed column reference,
//! normalizes the filter tree, and fills pagination defaults. Assumes a
//! validated query; any failure here is an internal invariant break.

use std::collections::BTreeMap;

use crate::catalog::{Model, Registry};
use crate::dsl::{FilterNode, Operation, Operator, Query, ValueArity};
use crate::planner::error::{PlanError, PlanResult};
use crate::planner::plan::{
    AggregateExpr, AggregateFunc, ColumnRef, FilterExpr, LogicalOp, Pagination, QueryPlan,
    RootModel, SelectExpr, SortExpr, SortTarget,
};
use crate::scalar::Scalar;

/// Alias assigned to the root model in the single-entity case
pub const ROOT_ALIAS: &str = "t0";

/// Default page size when the query does not specify a limit
pub const DEFAULT_LIMIT: u32 = 100;

/// Lowers validated DSL queries into plans
pub struct Planner<'a> {
    registry: &'a Registry,
}

impl<'a> Planner<'a> {
    /// Create a new planner over a registry snapshot
    pub fn new(registry: &'a Registry) -> Self {
        Self { registry }
    }

    /// Lower a validated query into a plan
    pub fn plan(&self, query: &Query) -> PlanResult<QueryPlan> {
        let model = self
            .registry
            .get_model(&query.model)
            .ok_or_else(|| PlanError::UnknownModel(query.model.clone()))?;

        let primary_key = column_ref(model, &model.primary_key)?;
        let root = RootModel {
            model: model.name.clone(),
            table: model.table.clone(),
            alias: ROOT_ALIAS.to_string(),
            primary_key,
        };

        let select = query
            .fields
            .iter()
            .map(|field| {
                column_ref(model, field).map(|column| SelectExpr {
                    alias: field.clone(),
                    column,
                })
            })
            .collect::<PlanResult<Vec<_>>>()?;

        let filters = query
            .filters
            .as_ref()
            .map(|node| lower_filter(model, node))
            .transpose()?;

        let group_by = query
            .group_by
            .iter()
            .map(|field| column_ref(model, field))
            .collect::<PlanResult<Vec<_>>>()?;

        let aggregates = query
            .aggregates
            .iter()
            .map(|agg| {
                let func = AggregateFunc::parse(&agg.func)
                    .ok_or_else(|| PlanError::UnknownOperator(agg.func.clone()))?;
                let column = if agg.field.is_empty() {
                    None
                } else {
                    Some(column_ref(model, &agg.field)?)
                };
                Ok(AggregateExpr {
                    func,
                    column,
                    alias: agg.alias.clone(),
                })
            })
            .collect::<PlanResult<Vec<_>>>()?;

        let sort = query
            .sort
            .iter()
            .map(|spec| {
                let target = if model.get_field(&spec.field).is_some() {
                    SortTarget::Column(column_ref(model, &spec.field)?)
                } else if aggregates.iter().any(|a| a.alias == spec.field) {
                    SortTarget::AggregateAlias(spec.field.clone())
                } else {
                    return Err(PlanError::UnknownField {
                        model: model.name.clone(),
                        field: spec.field.clone(),
                    });
                };
                Ok(SortExpr {
                    target,
                    descending: spec.is_descending(),
                })
            })
            .collect::<PlanResult<Vec<_>>>()?;

        let pagination = lower_pagination(query);

        // Copy data key-ordered for reproducible field order downstream.
        let data = match &query.data {
            Some(map) => map
                .iter()
                .map(|(k, v)| (k.clone(), Scalar::from(v)))
                .collect::<BTreeMap<String, Scalar>>()
                .into_iter()
                .collect(),
            None => Vec::new(),
        };

        let id = query.id.as_ref().map(Scalar::from);

        match query.operation {
            Operation::Create if data.is_empty() => {
                return Err(PlanError::Internal(
                    "create requires a data payload".to_string(),
                ));
            }
            Operation::Update | Operation::Delete if id.is_none() && filters.is_none() => {
                return Err(PlanError::Internal(
                    "update/delete requires an id or filters".to_string(),
                ));
            }
            _ => {}
        }

        Ok(QueryPlan {
            operation: query.operation,
            root,
            select,
            filters,
            group_by,
            aggregates,
            sort,
            pagination,
            data,
            id,
        })
    }
}

fn column_ref(model: &Model, field_name: &str) -> PlanResult<ColumnRef> {
    let field = model
        .get_field(field_name)
        .ok_or_else(|| PlanError::UnknownField {
            model: model.name.clone(),
            field: field_name.to_string(),
        })?;
    Ok(ColumnRef {
        table_alias: ROOT_ALIAS.to_string(),
        column: field.name.clone(),
        field_type: field.field_type,
    })
}

fn lower_filter(model: &Model, node: &FilterNode) -> PlanResult<FilterExpr> {
    match node {
        FilterNode::Comparison { field, op, value } => {
            let left = column_ref(model, field)?;
            let operator =
                Operator::parse(op).ok_or_else(|| PlanError::UnknownOperator(op.clone()))?;
            let value = match operator.arity() {
                ValueArity::None => None,
                _ => value.as_ref().map(Scalar::from),
            };
            Ok(FilterExpr::Comparison {
                left,
                op: operator,
                value,
            })
        }
        FilterNode::And { and } => Ok(FilterExpr::Logical {
            op: LogicalOp::And,
            children: and
                .iter()
                .map(|child| lower_filter(model, child))
                .collect::<PlanResult<Vec<_>>>()?,
        }),
        FilterNode::Or { or } => Ok(FilterExpr::Logical {
            op: LogicalOp::Or,
            children: or
                .iter()
                .map(|child| lower_filter(model, child))
                .collect::<PlanResult<Vec<_>>>()?,
        }),
        FilterNode::Not { not } => Ok(FilterExpr::Logical {
            op: LogicalOp::Not,
            children: vec![lower_filter(model, not)?],
        }),
    }
}

fn lower_pagination(query: &Query) -> Pagination {
    let page = query.pagination.as_ref();
    let limit = page
        .and_then(|p| p.limit)
        .map(|l| l.clamp(0, u32::MAX as i64) as u32)
        .unwrap_or(DEFAULT_LIMIT);
    let offset = page
        .and_then(|p| p.offset)
        .map(|o| o.clamp(0, u32::MAX as i64) as u32)
        .unwrap_or(0);
    Pagination { limit, offset }
}
