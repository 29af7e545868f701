//! Transport-agnostic JSON-RPC 2.0 dispatcher.
//!
//! `RpcRouter` takes an `AppState` and dispatches incoming requests to the
//! method handlers. Every transport (stdio, WebSocket, the HTTP shim) goes
//! through this type, so behaviour is identical across them.

use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use serde::Serialize;
use serde_json::Value;

use crate::state::AppState;

use super::error::RpcError;
use super::methods;
use super::types::*;

/// Transport-agnostic JSON-RPC router.
///
/// ```ignore
/// let router = RpcRouter::new(app_state);
///
/// // From a raw line or frame; `None` means nothing to send back.
/// let reply = router.handle_request(raw_json_str).await;
///
/// // From a parsed request:
/// let response = router.dispatch(request).await;
/// ```
#[derive(Clone)]
pub struct RpcRouter {
    state: AppState,
}

impl RpcRouter {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Handle one raw message that may not be valid UTF-8.
    ///
    /// Invalid UTF-8 is answered with a parse error like any other
    /// unparseable message.
    pub async fn handle_bytes(&self, raw: &[u8]) -> Option<String> {
        match std::str::from_utf8(raw) {
            Ok(text) => self.handle_request(text).await,
            Err(e) => {
                tracing::debug!(error = %e, "JSON-RPC message is not valid UTF-8");
                Some(parse_error(e))
            }
        }
    }

    /// Handle one raw message (single request or batch).
    ///
    /// Returns `None` when every request in the message was a notification.
    pub async fn handle_request(&self, raw: &str) -> Option<String> {
        let value: Value = match serde_json::from_str(raw) {
            Ok(value) => value,
            Err(e) => {
                tracing::debug!(error = %e, "unparseable JSON-RPC message");
                return Some(parse_error(e));
            }
        };

        self.handle_value(value).await.map(|response| encode(&response))
    }

    /// Handle a pre-parsed message, e.g. from axum JSON extraction.
    pub async fn handle_value(&self, value: Value) -> Option<Value> {
        match value {
            Value::Array(batch) => {
                if batch.is_empty() {
                    return Some(to_value(JsonRpcResponse::error(
                        None,
                        INVALID_REQUEST,
                        "Invalid request: empty batch",
                    )));
                }
                let mut responses = Vec::with_capacity(batch.len());
                for item in batch {
                    if let Some(response) = self.dispatch_value(item).await {
                        responses.push(to_value(response));
                    }
                }
                (!responses.is_empty()).then_some(Value::Array(responses))
            }
            single => self.dispatch_value(single).await.map(to_value),
        }
    }

    async fn dispatch_value(&self, value: Value) -> Option<JsonRpcResponse> {
        // A request without an `id` member is a notification.
        let (id, is_notification) = match &value {
            Value::Object(map) => (map.get("id").cloned(), !map.contains_key("id")),
            _ => (None, false),
        };

        let request: JsonRpcRequest = match serde_json::from_value(value) {
            Ok(req) => req,
            Err(e) => {
                return Some(JsonRpcResponse::error(
                    id,
                    INVALID_REQUEST,
                    format!("Invalid request: {}", e),
                ))
            }
        };

        let method = request.method.clone();
        let response = self.dispatch(request).await;
        if is_notification {
            tracing::debug!(method = %method, "notification handled");
            return None;
        }
        Some(response)
    }

    /// Dispatch a parsed request. Handler panics become internal errors.
    pub async fn dispatch(&self, req: JsonRpcRequest) -> JsonRpcResponse {
        if req.jsonrpc != "2.0" {
            return JsonRpcResponse::error(
                req.id,
                INVALID_REQUEST,
                "Invalid JSON-RPC version, expected \"2.0\"",
            );
        }

        let id = req.id.clone();
        let params = req.params.unwrap_or(Value::Object(Default::default()));
        tracing::debug!(method = %req.method, "rpc request");

        let outcome = AssertUnwindSafe(self.route(&req.method, params))
            .catch_unwind()
            .await
            .unwrap_or_else(|_| {
                tracing::error!(method = %req.method, "rpc handler panicked");
                Err(RpcError::Internal(format!("handler for {} panicked", req.method)))
            });

        match outcome {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(err) => {
                tracing::debug!(method = %req.method, code = err.code(), error = %err, "rpc error");
                err.to_response(id)
            }
        }
    }

    async fn route(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        match method {
            // ----- Lifecycle -----
            "initialize" => {
                let p = parse_params(params)?;
                let r = methods::lifecycle::initialize(&self.state, p);
                to_json(r)
            }
            "ping" => Ok(Value::Object(Default::default())),
            m if m.starts_with("notifications/") => Ok(Value::Object(Default::default())),

            // ----- Resources -----
            "resources/list" => {
                let r = methods::resources::list(&self.state).await?;
                to_json(r)
            }
            "resources/read" => {
                let p = parse_params(params)?;
                let r = methods::resources::read(&self.state, p).await?;
                to_json(r)
            }

            // ----- Tools -----
            "tools/list" => {
                let r = methods::tools::list(&self.state).await?;
                to_json(r)
            }
            "tools/call" => {
                let p = parse_params(params)?;
                let r = methods::tools::call(&self.state, p).await?;
                to_json(r)
            }

            _ => Err(RpcError::MethodNotFound(method.to_string())),
        }
    }

    /// Supported method names, for discovery endpoints.
    pub fn method_list(&self) -> Vec<&'static str> {
        vec![
            "initialize",
            "ping",
            "resources/list",
            "resources/read",
            "tools/list",
            "tools/call",
        ]
    }
}

/// Deserialize `params` into a typed params struct.
fn parse_params<T: serde::de::DeserializeOwned>(value: Value) -> Result<T, RpcError> {
    serde_json::from_value(value).map_err(|e| RpcError::InvalidParams(e.to_string()))
}

fn to_json<T: Serialize>(result: T) -> Result<Value, RpcError> {
    serde_json::to_value(result).map_err(|e| RpcError::Internal(format!("serialize result: {}", e)))
}

fn to_value(response: JsonRpcResponse) -> Value {
    serde_json::to_value(response).unwrap_or_else(|_| serialization_failure())
}

fn encode<T: Serialize>(response: &T) -> String {
    serde_json::to_string(response).unwrap_or_else(|_| serialization_failure().to_string())
}

fn parse_error(e: impl std::fmt::Display) -> String {
    encode(&JsonRpcResponse::error(None, PARSE_ERROR, format!("Parse error: {}", e)))
}

fn serialization_failure() -> Value {
    serde_json::json!({
        "jsonrpc": "2.0",
        "id": null,
        "error": { "code": INTERNAL_ERROR, "message": "Failed to serialize response" }
    })
}
