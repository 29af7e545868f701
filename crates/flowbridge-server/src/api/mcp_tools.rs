//! MCP Tools API - /api/mcp/tools
//!
//! GET  /api/mcp/tools      - List tool definitions
//! POST /api/mcp/tools/call - Execute a tool by name

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::{get, post},
    Json, Router,
};

use flowbridge_core::error::ServerError;
use flowbridge_core::rpc::methods::tools::{self, CallParams, ListResult};
use flowbridge_core::rpc::types::ToolResult;
use flowbridge_core::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_tools))
        .route("/call", post(call_tool))
}

async fn list_tools(State(state): State<AppState>) -> Result<Json<ListResult>, ServerError> {
    Ok(Json(tools::list(&state).await?))
}

/// Tool failures come back as `isError: true` with 200; only a malformed
/// request is a 400.
async fn call_tool(
    State(state): State<AppState>,
    body: Result<Json<CallParams>, JsonRejection>,
) -> Result<Json<ToolResult>, ServerError> {
    let Json(params) = body.map_err(|e| ServerError::BadRequest(e.body_text()))?;
    Ok(Json(tools::call(&state, params).await?))
}
