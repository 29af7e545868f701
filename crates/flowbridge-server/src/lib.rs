//! Flowbridge Server: HTTP and WebSocket front door for the workflow engine.
//!
//! Provides:
//! - `POST /api/workflows/execute` to run a step list
//! - `GET /api/services` for the registered service catalog
//! - the MCP bridge over WebSocket (`/api/mcp/ws`) and a stateless HTTP shim
//!
//! The crate can be used standalone or embedded; `start_server_with_state`
//! shares one `AppState` with other consumers such as an in-process RPC
//! router.

pub mod api;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use flowbridge_core::proxy::sandbox::register_sandbox_services;
use flowbridge_core::state::{AppState, AppStateInner, BridgeConfig};
use flowbridge_core::WorkflowEngine;

/// Default log filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "flowbridge_core=info,flowbridge_server=info,tower_http=info";

/// Configuration for the Flowbridge server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Provider that bridge tool calls are routed to.
    pub default_provider: String,
    /// Register the in-memory sandbox services under `default_provider`.
    pub sandbox: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3220,
            default_provider: "workspace".to_string(),
            sandbox: false,
        }
    }
}

/// Build a shared `AppState` with an empty engine, plus the sandbox
/// services when enabled.
pub async fn create_app_state(config: &ServerConfig) -> AppState {
    let engine = Arc::new(WorkflowEngine::new());
    if config.sandbox {
        register_sandbox_services(&engine, &config.default_provider).await;
        tracing::info!(provider = %config.default_provider, "sandbox services registered");
    }

    let bridge = BridgeConfig {
        default_provider: config.default_provider.clone(),
        ..BridgeConfig::default()
    };
    Arc::new(AppStateInner::new(engine, bridge))
}

/// The complete application router, without a bound listener.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(api::api_router())
        .route("/api/health", axum::routing::get(health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Initialise tracing, build the state and start the server.
///
/// Returns the actual address the server is listening on.
pub async fn start_server(config: ServerConfig) -> Result<SocketAddr, String> {
    init_tracing();

    tracing::info!(
        "Starting Flowbridge server on {}:{}",
        config.host,
        config.port
    );

    let state = create_app_state(&config).await;
    start_server_with_state(config, state).await
}

/// Start the HTTP server with a pre-built `AppState`.
///
/// The server stops accepting connections and cancels in-flight executions
/// once `state.shutdown` is cancelled.
pub async fn start_server_with_state(
    config: ServerConfig,
    state: AppState,
) -> Result<SocketAddr, String> {
    let shutdown = state.shutdown.clone();
    let app = build_router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| format!("Invalid address: {}", e))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| format!("Failed to bind to {}: {}", addr, e))?;

    let local_addr = listener
        .local_addr()
        .map_err(|e| format!("Failed to get local address: {}", e))?;

    tracing::info!("Flowbridge server listening on {}", local_addr);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown.cancelled_owned())
            .await
        {
            tracing::error!("Server error: {}", e);
        }
        tracing::info!("Flowbridge server stopped");
    });

    Ok(local_addr)
}

/// Install the global `tracing` subscriber. Safe to call more than once.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "server": "flowbridge-server",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
