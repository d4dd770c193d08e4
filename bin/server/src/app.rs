//! Application state and HTTP routes.

use crate::connections::ConnectionManager;
use crate::error::ApiError;
use crate::ws::ws_handler;
use axum::extract::State;
use axum::http::HeaderValue;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value as JsonValue, json};
use std::sync::Arc;
use taskmate_conversation::Agent;
use taskmate_tasks::TaskStore;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared state for handlers.
#[derive(Clone)]
pub struct AppState {
    /// Task persistence.
    pub store: Arc<dyn TaskStore>,
    /// The agent every connection's session runs turns on.
    pub agent: Arc<Agent>,
    /// Live WebSocket connections.
    pub connections: Arc<ConnectionManager>,
}

impl AppState {
    /// Creates state with no open connections.
    #[must_use]
    pub fn new(store: Arc<dyn TaskStore>, agent: Arc<Agent>) -> Self {
        Self {
            store,
            agent,
            connections: Arc::new(ConnectionManager::new()),
        }
    }
}

/// Builds the router.
pub fn router(state: AppState, cors_origin: HeaderValue) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(cors_origin)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/tasks", get(list_tasks))
        .route("/ws", get(ws_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn root() -> Json<JsonValue> {
    Json(json!({ "message": "Welcome to the AI-Powered Task Management Backend!" }))
}

async fn list_tasks(State(state): State<AppState>) -> Result<Json<JsonValue>, ApiError> {
    let tasks = state.store.list().await?;
    Ok(Json(json!({ "tasks": tasks })))
}
