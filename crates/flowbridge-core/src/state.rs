//! Shared application state for the bridge and its transports.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::engine::WorkflowEngine;
use crate::rpc::connection::ConnectionRegistry;

/// Static identity and routing settings of the protocol bridge.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Provider that tool calls are routed to.
    pub default_provider: String,
    pub server_name: String,
    pub server_version: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            default_provider: "workspace".to_string(),
            server_name: "flowbridge".to_string(),
            server_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Shared state accessible by all transports and HTTP handlers.
pub struct AppStateInner {
    pub engine: Arc<WorkflowEngine>,
    pub connections: Arc<ConnectionRegistry>,
    pub bridge: BridgeConfig,
    /// Cancelled on shutdown; executions run under child tokens of it.
    pub shutdown: CancellationToken,
}

pub type AppState = Arc<AppStateInner>;

impl AppStateInner {
    pub fn new(engine: Arc<WorkflowEngine>, bridge: BridgeConfig) -> Self {
        Self {
            engine,
            connections: Arc::new(ConnectionRegistry::new()),
            bridge,
            shutdown: CancellationToken::new(),
        }
    }
}
