//! MCP Resources API - /api/mcp/resources
//!
//! GET /api/mcp/resources           - List resources
//! GET /api/mcp/resources/read?uri= - Read one resource

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};

use flowbridge_core::error::ServerError;
use flowbridge_core::rpc::methods::resources::{self, ListResult, ReadParams, ReadResult};
use flowbridge_core::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_resources))
        .route("/read", get(read_resource))
}

async fn list_resources(State(state): State<AppState>) -> Result<Json<ListResult>, ServerError> {
    Ok(Json(resources::list(&state).await?))
}

async fn read_resource(
    State(state): State<AppState>,
    Query(params): Query<ReadParams>,
) -> Result<Json<ReadResult>, ServerError> {
    let uri = params.uri.clone();
    resources::read(&state, params)
        .await
        .map(Json)
        .map_err(|e| {
            tracing::debug!(uri = %uri, error = %e, "[MCP Resources] read failed");
            ServerError::NotFound(format!("Resource {} not found", uri))
        })
}
