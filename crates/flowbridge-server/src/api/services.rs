//! Service catalog API - /api/services
//!
//! GET /api/services - Registered providers, services and their functions

use axum::{extract::State, routing::get, Json, Router};
use serde_json::Value;

use flowbridge_core::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(list_services))
}

async fn list_services(State(state): State<AppState>) -> Json<Value> {
    Json(serde_json::json!({ "providers": state.engine.catalog_json().await }))
}
