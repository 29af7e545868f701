//! `flowbridge mcp`: serve the bridge over stdin/stdout.
//!
//! Each line on stdin is one JSON-RPC message; each response is written
//! as one line on stdout. Logs go to stderr.

use flowbridge_core::rpc::{serve_lines, RpcRouter, Transport};
use flowbridge_core::state::AppState;
use tokio::io::BufReader;

pub async fn run(state: &AppState) -> Result<(), String> {
    let shutdown = state.shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            shutdown.cancel();
        }
    });

    let router = RpcRouter::new(state.clone());
    let guard = state.connections.open(Transport::Stdio, None);
    tracing::info!(connection = guard.id(), "MCP bridge serving on stdio");

    serve_lines(
        &router,
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
        &guard,
    )
    .await
    .map_err(|e| format!("stdio transport failed: {}", e))
}
