//! Registry integration tests
//!
//! Immutability under repeated pipeline use, and the introspect-then-load
//! round trip at the config level.

use std::sync::Arc;

use serde_json::json;

use uniquery::catalog::{Field, FieldType, Model, Registry};
use uniquery::config::ModelConfig;
use uniquery::dsl::{self, Query};
use uniquery::planner::Planner;

fn test_config() -> ModelConfig {
    ModelConfig {
        models: vec![
            Model::new("users", "users")
                .primary_key("id")
                .field(Field::new("id", FieldType::Uuid).nullable(false))
                .field(Field::new("email", FieldType::String).nullable(false))
                .field(Field::new("age", FieldType::Integer)),
            Model::new("orders", "orders")
                .primary_key("id")
                .field(Field::new("id", FieldType::Uuid).nullable(false))
                .field(Field::new("amount", FieldType::Decimal)),
        ],
    }
}

#[test]
fn test_list_models_keeps_config_order() {
    let registry = Registry::load(test_config()).unwrap();
    assert_eq!(registry.list_models(), vec!["users", "orders"]);
}

#[test]
fn test_registry_unchanged_after_pipeline_runs() {
    let registry = Registry::load(test_config()).unwrap();

    let before: Vec<Model> = registry.models().to_vec();
    let names_before = registry.list_models().join(",");

    let query: Query = serde_json::from_value(json!({
        "model": "users",
        "filters": { "field": "age", "op": ">", "value": 18 }
    }))
    .unwrap();

    for _ in 0..100 {
        dsl::validate(&registry, &query).unwrap();
        Planner::new(&registry).plan(&query).unwrap();
    }

    assert_eq!(registry.list_models().join(","), names_before);
    assert_eq!(registry.models(), before.as_slice());
}

#[tokio::test]
async fn test_registry_unchanged_under_concurrent_readers() {
    let registry = Arc::new(Registry::load(test_config()).unwrap());
    let before: Vec<Model> = registry.models().to_vec();

    let mut handles = Vec::new();
    for i in 0..8 {
        let registry = registry.clone();
        handles.push(tokio::spawn(async move {
            let query: Query = serde_json::from_value(json!({
                "model": if i % 2 == 0 { "users" } else { "orders" },
                "filters": { "field": "id", "op": "not_null" }
            }))
            .unwrap();
            for _ in 0..50 {
                dsl::validate(&registry, &query).unwrap();
                Planner::new(&registry).plan(&query).unwrap();
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(registry.models(), before.as_slice());
}

#[test]
fn test_introspector_output_round_trips_through_registry() {
    // The introspectors emit a ModelConfig; serializing it and loading the
    // parse result must reproduce every model faithfully.
    let config = test_config();
    let text = serde_json::to_string_pretty(&config).unwrap();
    let reparsed: ModelConfig = serde_json::from_str(&text).unwrap();
    assert_eq!(reparsed.models, config.models);

    let registry = Registry::load(reparsed).unwrap();
    assert_eq!(registry.list_models(), vec!["users", "orders"]);

    let users = registry.get_model("users").unwrap();
    assert_eq!(users.table, "users");
    assert_eq!(users.primary_key, "id");
    assert_eq!(users.fields.len(), 3);
    assert_eq!(users.get_field("id").unwrap().field_type, FieldType::Uuid);
    assert!(!users.get_field("email").unwrap().nullable);
    assert!(users.get_field("age").unwrap().nullable);
}

#[test]
fn test_config_wire_shape() {
    // The emitted JSON uses the documented key spellings.
    let config = test_config();
    let value = serde_json::to_value(&config).unwrap();
    let model = &value["models"][0];
    assert_eq!(model["name"], "users");
    assert_eq!(model["table"], "users");
    assert_eq!(model["primaryKey"], "id");
    assert_eq!(model["fields"][0]["type"], "uuid");
    assert_eq!(model["fields"][0]["nullable"], false);
}
