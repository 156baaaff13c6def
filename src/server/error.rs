//! API error - maps pipeline failures onto HTTP responses

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::backend::{BuildError, ExecError};
use crate::dsl::ValidateError;
use crate::planner::PlanError;

/// One error per pipeline layer. Validation failures are the client's
/// fault; everything else indicates a bug or a backend failure.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validate(#[from] ValidateError),
    #[error("{0}")]
    Plan(#[from] PlanError),
    #[error("{0}")]
    Build(#[from] BuildError),
    #[error("{0}")]
    Exec(#[from] ExecError),
}

#[derive(Debug, Serialize)]
struct ErrorPayload {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Validate(e) => (
                StatusCode::BAD_REQUEST,
                format!("{}: {}", e.kind(), e),
            ),
            ApiError::Plan(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            ApiError::Build(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            ApiError::Exec(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        };

        if status.is_server_error() {
            tracing::error!(error = %message, "query pipeline failure");
        }

        (status, Json(ErrorPayload { error: message })).into_response()
    }
}
