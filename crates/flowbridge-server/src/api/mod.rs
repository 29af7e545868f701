pub mod mcp_resources;
pub mod mcp_routes;
pub mod mcp_tools;
pub mod services;
pub mod workflows;

use axum::Router;

use flowbridge_core::state::AppState;

/// Build the complete API router with all sub-routes.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .nest("/api/workflows", workflows::router())
        .nest("/api/services", services::router())
        .nest("/api/mcp", mcp_routes::router())
        .nest("/api/mcp/tools", mcp_tools::router())
        .nest("/api/mcp/resources", mcp_resources::router())
}
