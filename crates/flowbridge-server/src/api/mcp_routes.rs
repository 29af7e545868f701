//! MCP bridge API - /api/mcp
//!
//! POST /api/mcp    - One JSON-RPC message (single or batch), answered inline
//! GET  /api/mcp/ws - Persistent connection, one JSON-RPC message per frame

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};

use flowbridge_core::rpc::{RpcRouter, Transport};
use flowbridge_core::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(mcp_post))
        .route("/ws", get(mcp_ws))
}

// ─── POST /api/mcp ────────────────────────────────────────────────────

/// The raw body goes to the router so malformed JSON is answered with a
/// JSON-RPC parse error. Notifications get `202 Accepted` and no body.
async fn mcp_post(State(state): State<AppState>, body: String) -> Response {
    let rpc = RpcRouter::new(state);
    match rpc.handle_request(&body).await {
        Some(response) => ([(header::CONTENT_TYPE, "application/json")], response).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

// ─── GET /api/mcp/ws ──────────────────────────────────────────────────

async fn mcp_ws(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Requests on one socket are handled strictly one after another. Text and
/// binary frames both carry one JSON-RPC message; a binary frame that is not
/// UTF-8 gets a parse error.
async fn handle_socket(mut socket: WebSocket, state: AppState) {
    let guard = state.connections.open(Transport::WebSocket, None);
    let rpc = RpcRouter::new(state.clone());

    loop {
        let message = tokio::select! {
            _ = state.shutdown.cancelled() => break,
            message = socket.recv() => message,
        };

        let reply = match message {
            Some(Ok(Message::Text(text))) => {
                guard.record_request();
                rpc.handle_request(text.as_str()).await
            }
            Some(Ok(Message::Binary(bytes))) => {
                guard.record_request();
                rpc.handle_bytes(&bytes).await
            }
            Some(Ok(Message::Close(_))) | None => break,
            Some(Ok(_)) => continue,
            Some(Err(e)) => {
                tracing::warn!(connection = guard.id(), error = %e, "websocket read error");
                break;
            }
        };

        if let Some(response) = reply {
            if let Err(e) = socket.send(Message::Text(response.into())).await {
                tracing::warn!(connection = guard.id(), error = %e, "websocket write error");
                break;
            }
        }
    }
}
