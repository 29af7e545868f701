//! CLI command implementations.
//!
//! Each submodule corresponds to a top-level CLI command and drives the
//! flowbridge-core engine through `AppState`.

pub mod mcp;
pub mod rpc;
pub mod run;
pub mod server;
pub mod services;

use std::sync::Arc;

use flowbridge_core::proxy::sandbox::register_sandbox_services;
use flowbridge_core::state::{AppState, AppStateInner, BridgeConfig};
use flowbridge_core::WorkflowEngine;

/// Initialize a shared `AppState`, registering the sandbox services under
/// `provider` when requested.
///
/// This mirrors `flowbridge_server::create_app_state` for commands that
/// never bind a listener.
pub async fn init_state(sandbox: bool, provider: &str) -> AppState {
    let engine = Arc::new(WorkflowEngine::new());
    if sandbox {
        register_sandbox_services(&engine, provider).await;
    }

    let bridge = BridgeConfig {
        default_provider: provider.to_string(),
        ..BridgeConfig::default()
    };
    Arc::new(AppStateInner::new(engine, bridge))
}

/// Pretty-print a JSON value to stdout.
pub fn print_json(value: &serde_json::Value) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
    );
}
