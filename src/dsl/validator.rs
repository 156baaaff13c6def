//! DSL validation against the schema registry
//!
//! The validator is pure over a registry snapshot: it never touches a
//! backend, and it completes before any planning. Checks run in a fixed
//! order so that a given malformed query always reports the same error.

use serde_json::Value;

use crate::catalog::{Model, Registry};
use crate::dsl::error::{ValidateError, ValidateResult};
use crate::dsl::{
    AggregateSpec, FilterNode, Operation, Operator, Query, SortSpec, ValueArity,
    AGGREGATE_FUNCTIONS,
};

/// Validate a DSL query against the registry.
///
/// Returns the first violation found; a query that passes is safe to hand to
/// the planner.
pub fn validate(registry: &Registry, query: &Query) -> ValidateResult<()> {
    Validator { registry }.validate(query)
}

struct Validator<'a> {
    registry: &'a Registry,
}

impl<'a> Validator<'a> {
    fn validate(&self, query: &Query) -> ValidateResult<()> {
        let model = self
            .registry
            .get_model(&query.model)
            .ok_or_else(|| ValidateError::UnknownModel(query.model.clone()))?;

        for field in &query.fields {
            self.check_field(model, field)?;
        }

        if let Some(filters) = &query.filters {
            self.check_filter(model, filters)?;
        }

        for agg in &query.aggregates {
            self.check_aggregate(model, agg)?;
        }

        for sort in &query.sort {
            self.check_sort(model, sort, &query.aggregates)?;
        }

        for field in &query.group_by {
            self.check_field(model, field)?;
        }

        if let Some(page) = &query.pagination {
            if let Some(limit) = page.limit.filter(|&l| l < 0) {
                return Err(ValidateError::BadPagination(format!(
                    "limit must be non-negative, got {}",
                    limit
                )));
            }
            if let Some(offset) = page.offset.filter(|&o| o < 0) {
                return Err(ValidateError::BadPagination(format!(
                    "offset must be non-negative, got {}",
                    offset
                )));
            }
        }

        match query.operation {
            Operation::Select => Ok(()),
            Operation::Create => self.check_create(model, query),
            Operation::Update => self.check_update(model, query),
            Operation::Delete => self.check_selector(query),
        }
    }

    fn check_field(&self, model: &Model, field: &str) -> ValidateResult<()> {
        if model.get_field(field).is_none() {
            return Err(ValidateError::UnknownField {
                model: model.name.clone(),
                field: field.to_string(),
            });
        }
        Ok(())
    }

    fn check_filter(&self, model: &Model, node: &FilterNode) -> ValidateResult<()> {
        match node {
            FilterNode::Comparison { field, op, value } => {
                self.check_field(model, field)?;
                let operator = Operator::parse(op)
                    .ok_or_else(|| ValidateError::UnknownOperator(op.clone()))?;
                check_operator_value(operator, value.as_ref())
            }
            FilterNode::And { and } => {
                if and.is_empty() {
                    return Err(ValidateError::BadOperatorUsage(
                        "'and' requires at least one child filter".to_string(),
                    ));
                }
                for child in and {
                    self.check_filter(model, child)?;
                }
                Ok(())
            }
            FilterNode::Or { or } => {
                if or.is_empty() {
                    return Err(ValidateError::BadOperatorUsage(
                        "'or' requires at least one child filter".to_string(),
                    ));
                }
                for child in or {
                    self.check_filter(model, child)?;
                }
                Ok(())
            }
            FilterNode::Not { not } => self.check_filter(model, not),
        }
    }

    fn check_aggregate(&self, model: &Model, agg: &AggregateSpec) -> ValidateResult<()> {
        if !AGGREGATE_FUNCTIONS.contains(&agg.func.as_str()) {
            return Err(ValidateError::UnknownOperator(agg.func.clone()));
        }

        // count over rows takes no target field
        if agg.func == "count" && agg.field.is_empty() {
            return Ok(());
        }

        self.check_field(model, &agg.field)?;

        if agg.func != "count" {
            let field = model.get_field(&agg.field).expect("field checked above");
            if !field.is_aggregatable() {
                return Err(ValidateError::TypeMismatch(format!(
                    "aggregate '{}' requires a numeric field, '{}' is {}",
                    agg.func, agg.field, field.field_type
                )));
            }
        }
        Ok(())
    }

    fn check_sort(
        &self,
        model: &Model,
        sort: &SortSpec,
        aggregates: &[AggregateSpec],
    ) -> ValidateResult<()> {
        if model.get_field(&sort.field).is_some() {
            return Ok(());
        }
        if aggregates.iter().any(|a| a.alias == sort.field) {
            return Ok(());
        }
        Err(ValidateError::UnknownField {
            model: model.name.clone(),
            field: sort.field.clone(),
        })
    }

    fn check_create(&self, model: &Model, query: &Query) -> ValidateResult<()> {
        let data = match &query.data {
            Some(data) if !data.is_empty() => data,
            _ => return Err(ValidateError::MissingData),
        };

        for key in data.keys() {
            self.check_field(model, key)?;
        }

        // Every non-nullable field must be present, except the primary key
        // (assumed backend-generated when omitted).
        for field in &model.fields {
            if field.nullable || field.name == model.primary_key {
                continue;
            }
            if !data.contains_key(&field.name) {
                return Err(ValidateError::MissingRequiredField(field.name.clone()));
            }
        }
        Ok(())
    }

    fn check_update(&self, model: &Model, query: &Query) -> ValidateResult<()> {
        let data = match &query.data {
            Some(data) if !data.is_empty() => data,
            _ => return Err(ValidateError::MissingData),
        };
        for key in data.keys() {
            self.check_field(model, key)?;
        }
        self.check_selector(query)
    }

    fn check_selector(&self, query: &Query) -> ValidateResult<()> {
        if query.id.is_none() && query.filters.is_none() {
            return Err(ValidateError::MissingSelector);
        }
        Ok(())
    }
}

/// Check that a comparison value matches the operator's arity.
fn check_operator_value(op: Operator, value: Option<&Value>) -> ValidateResult<()> {
    match op.arity() {
        ValueArity::None => {
            if value.is_some_and(|v| !v.is_null()) {
                return Err(ValidateError::BadOperatorUsage(format!(
                    "operator '{}' takes no value",
                    op
                )));
            }
            Ok(())
        }
        ValueArity::Single => match value {
            None | Some(Value::Null) => Err(ValidateError::BadOperatorUsage(format!(
                "operator '{}' requires a value",
                op
            ))),
            Some(Value::Array(_)) => Err(ValidateError::BadOperatorUsage(format!(
                "operator '{}' requires a single scalar, got a sequence",
                op
            ))),
            Some(v) => {
                // Pattern operators compile their value into a LIKE/regex
                // pattern, which only works on text.
                let needs_text = matches!(
                    op,
                    Operator::Like
                        | Operator::Ilike
                        | Operator::StartsWith
                        | Operator::EndsWith
                        | Operator::Contains
                );
                if needs_text && !v.is_string() {
                    return Err(ValidateError::BadOperatorUsage(format!(
                        "operator '{}' requires a string value",
                        op
                    )));
                }
                Ok(())
            }
        },
        ValueArity::Many => match value {
            Some(Value::Array(_)) => Ok(()),
            _ => Err(ValidateError::BadOperatorUsage(format!(
                "operator '{}' requires a sequence of scalars",
                op
            ))),
        },
        ValueArity::Pair => match value {
            Some(Value::Array(items)) if items.len() == 2 => Ok(()),
            _ => Err(ValidateError::BadOperatorUsage(format!(
                "operator '{}' requires an ordered pair [low, high]",
                op
            ))),
        },
    }
}
