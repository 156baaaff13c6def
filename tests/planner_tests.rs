//! Planner integration tests

use serde_json::json;

use uniquery::catalog::{Field, FieldType, Model, Registry};
use uniquery::config::ModelConfig;
use uniquery::dsl::{self, Query};
use uniquery::planner::{FilterExpr, Planner, QueryPlan};

fn test_registry() -> Registry {
    let events = Model::new("events", "events")
        .primary_key("id")
        .field(Field::new("id", FieldType::Uuid).nullable(false))
        .field(Field::new("kind", FieldType::String).nullable(false))
        .field(Field::new("count", FieldType::Integer))
        .field(Field::new("at", FieldType::Timestamp));

    Registry::load(ModelConfig {
        models: vec![events],
    })
    .unwrap()
}

fn plan(value: serde_json::Value) -> QueryPlan {
    let registry = test_registry();
    let query: Query = serde_json::from_value(value).unwrap();
    dsl::validate(&registry, &query).unwrap();
    Planner::new(&registry).plan(&query).unwrap()
}

#[test]
fn test_default_fill_idempotence() {
    // Planning without pagination fills limit=100/offset=0; planning again
    // with those values set yields the same plan.
    let bare = plan(json!({ "model": "events" }));
    assert_eq!(bare.pagination.limit, 100);
    assert_eq!(bare.pagination.offset, 0);

    let explicit = plan(json!({
        "model": "events",
        "pagination": { "limit": 100, "offset": 0 }
    }));
    assert_eq!(bare, explicit);
}

#[test]
fn test_deep_filter_tree_lowers_without_recursion_issues() {
    let mut node = json!({ "field": "count", "op": "=", "value": 0 });
    for _ in 0..10 {
        node = json!({ "and": [node, { "field": "kind", "op": "not_null" }] });
    }

    let plan = plan(json!({ "model": "events", "filters": node }));

    // Walk back down and count depth.
    let mut depth = 0;
    let mut current = plan.filters.as_ref().unwrap();
    while let FilterExpr::Logical { children, .. } = current {
        depth += 1;
        current = &children[0];
    }
    assert_eq!(depth, 10);
}

#[test]
fn test_select_all_has_empty_projection() {
    let plan = plan(json!({ "model": "events" }));
    assert!(plan.select.is_empty());
    assert!(plan.filters.is_none());
    assert!(plan.group_by.is_empty());
    assert!(plan.aggregates.is_empty());
    assert!(plan.sort.is_empty());
}

#[test]
fn test_operation_defaults_to_select() {
    let plan = plan(json!({ "model": "events" }));
    assert_eq!(plan.operation, uniquery::dsl::Operation::Select);
}

#[test]
fn test_id_is_carried_for_update() {
    let plan = plan(json!({
        "operation": "update",
        "model": "events",
        "id": "11111111-1111-1111-1111-111111111111",
        "data": { "kind": "click" }
    }));
    assert!(plan.id.is_some());
    assert_eq!(plan.data.len(), 1);
    assert_eq!(plan.root.primary_key.column, "id");
    assert_eq!(plan.root.primary_key.field_type, FieldType::Uuid);
}
