//! Domain error types for server operations.
//!
//! Internal details are logged; clients only see a user-safe message.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use std::fmt;
use taskmate_tasks::TaskStoreError;

/// Errors returned by HTTP handlers.
#[derive(Debug)]
pub enum ApiError {
    /// The task store failed.
    TaskStore { details: String },
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TaskStore { details } => write!(f, "task store error: {details}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<TaskStoreError> for ApiError {
    fn from(e: TaskStoreError) -> Self {
        Self::TaskStore {
            details: e.to_string(),
        }
    }
}

impl ApiError {
    /// Returns the status code and user-safe message.
    fn public_parts(&self) -> (StatusCode, &'static str) {
        match self {
            Self::TaskStore { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "Failed to load tasks"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "request failed");
        let (status, message) = self.public_parts();
        (status, Json(json!({ "error": message }))).into_response()
    }
}
