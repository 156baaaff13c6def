//! Route handlers

use axum::extract::State;
use axum::http::{header, Method};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::time::Duration;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::backend::BackendQuery;
use crate::dsl::{self, Query};
use crate::planner::Planner;
use crate::server::{ApiError, AppState};

/// Build the API router with permissive CORS
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::any())
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
            Method::PATCH,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
        .max_age(Duration::from_secs(86400));

    Router::new()
        .route("/health", get(health))
        .route("/info", get(info))
        .route("/models", get(models))
        .route("/query", post(query))
        .with_state(state)
        .layer(cors)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn info(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "database_type": state.database.as_str(),
        "status": "ok"
    }))
}

async fn models(State(state): State<AppState>) -> Json<Value> {
    let models: Vec<Value> = state
        .registry
        .models()
        .iter()
        .map(|model| {
            json!({
                "name": model.name,
                "table": model.table,
                "primary_key": model.primary_key,
                "fields": model.fields.iter().map(|field| {
                    json!({
                        "name": field.name,
                        "type": field.field_type.as_str(),
                        "nullable": field.nullable,
                    })
                }).collect::<Vec<_>>(),
            })
        })
        .collect();

    Json(Value::Array(models))
}

async fn query(
    State(state): State<AppState>,
    Json(query): Json<Query>,
) -> Result<Json<Value>, ApiError> {
    dsl::validate(&state.registry, &query)?;

    let plan = Planner::new(&state.registry).plan(&query)?;
    let built = state.builder.build(&plan)?;

    let mut response = serde_json::Map::new();
    match &built {
        BackendQuery::Sql(sql) => {
            tracing::debug!(sql = %sql.text, params = sql.params.len(), "built SQL");
            response.insert("sql".to_string(), Value::String(sql.text.clone()));
            response.insert(
                "params".to_string(),
                Value::Array(sql.params.iter().map(|p| p.to_json()).collect()),
            );
        }
        BackendQuery::Document(command) => {
            tracing::debug!(collection = %command.collection, "built document command");
            response.insert(
                "command".to_string(),
                serde_json::to_value(command).unwrap_or(Value::Null),
            );
            response.insert("params".to_string(), Value::Array(Vec::new()));
        }
    }

    if let Some(executor) = &state.executor {
        if built.returns_rows() {
            let rows = executor.execute_query(&built).await?;
            response.insert(
                "data".to_string(),
                Value::Array(rows.into_iter().map(Value::Object).collect()),
            );
        } else {
            let outcome = executor.execute_command(&built).await?;
            response.insert(
                "affected_rows".to_string(),
                Value::from(outcome.affected_rows),
            );
        }
    }

    Ok(Json(Value::Object(response)))
}
