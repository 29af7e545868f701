//! Tool methods.
//!
//! Methods:
//! - `tools/list`: one tool per function of the default provider, named `service.function`
//! - `tools/call`: run the named function as a one-step workflow

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::engine::ExecutionContext;
use crate::error::EngineError;
use crate::models::WorkflowStep;
use crate::proxy::FunctionSpec;
use crate::rpc::error::RpcError;
use crate::rpc::types::{ContentItem, Tool, ToolResult};
use crate::state::AppState;

/// Argument carrying the caller's bearer token.
pub const TOKEN_ARGUMENT: &str = "access_token";
const TOKEN_FALLBACK_ARGUMENT: &str = "token";

/// Response fields checked, in order, for the id named in a success message.
const DOMINANT_ID_FIELDS: [&str; 7] = [
    "message_id",
    "document_id",
    "file_id",
    "event_id",
    "thread_id",
    "draft_id",
    "id",
];

/// Split `service.function`. Anything but two non-empty parts is rejected.
pub fn parse_tool_name(name: &str) -> Result<(&str, &str), RpcError> {
    let mut parts = name.split('.');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(service), Some(function), None) if !service.is_empty() && !function.is_empty() => {
            Ok((service, function))
        }
        _ => Err(RpcError::InvalidParams(format!(
            "tool name '{}' must have the form service.function",
            name
        ))),
    }
}

// ---------------------------------------------------------------------------
// tools/list
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct ListResult {
    pub tools: Vec<Tool>,
}

pub async fn list(state: &AppState) -> Result<ListResult, RpcError> {
    let catalog = state.engine.catalog().await;
    let tools = catalog
        .get(&state.bridge.default_provider)
        .map(|services| {
            services
                .iter()
                .flat_map(|(service, descriptor)| {
                    descriptor.functions.iter().map(move |function| Tool {
                        name: format!("{}.{}", service, function.name),
                        description: tool_description(service, function),
                        input_schema: input_schema(function),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(ListResult { tools })
}

fn tool_description(service: &str, function: &FunctionSpec) -> String {
    if function.description.is_empty() {
        format!("Call {} on {}", function.name, service)
    } else {
        function.description.clone()
    }
}

fn input_schema(function: &FunctionSpec) -> Value {
    let mut properties = Map::new();
    properties.insert(
        TOKEN_ARGUMENT.to_string(),
        json!({
            "type": "string",
            "description": "Bearer token for the provider; falls back to the last token set"
        }),
    );
    for field in &function.required_fields {
        properties.insert(field.clone(), json!({ "description": field }));
    }

    json!({
        "type": "object",
        "properties": properties,
        "required": function.required_fields,
    })
}

// ---------------------------------------------------------------------------
// tools/call
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct CallParams {
    pub name: String,
    pub arguments: Map<String, Value>,
}

pub async fn call(state: &AppState, params: CallParams) -> Result<ToolResult, RpcError> {
    let (service, function) = parse_tool_name(&params.name)?;
    let provider = state.bridge.default_provider.as_str();

    let mut payload = params.arguments;
    let mut ctx = ExecutionContext::with_cancel(state.shutdown.child_token());
    if let Some(token) = take_token(&mut payload) {
        state.engine.set_provider_token(provider, token.clone()).await;
        ctx = ctx.with_token(provider, token);
    }

    tracing::info!(tool = %params.name, provider, "tool call");
    let step = WorkflowStep::new(function, provider, service, function).with_payload(Value::Object(payload));

    match state.engine.execute_workflow(&ctx, vec![step], Map::new()).await {
        Ok(execution) => {
            let response = execution.result(function).ok_or_else(|| {
                RpcError::Internal(format!("{} completed without a result", params.name))
            })?;
            Ok(success_result(&params.name, &response.data))
        }
        Err(failure) => Ok(ToolResult::failure(failure_message(&params.name, &failure.error))),
    }
}

/// Remove both token arguments from the payload; `access_token` wins.
fn take_token(payload: &mut Map<String, Value>) -> Option<String> {
    let primary = payload.remove(TOKEN_ARGUMENT);
    let fallback = payload.remove(TOKEN_FALLBACK_ARGUMENT);
    [primary, fallback]
        .into_iter()
        .flatten()
        .find_map(|value| match value {
            Value::String(token) if !token.is_empty() => Some(token),
            _ => None,
        })
}

fn dominant_id(data: &Map<String, Value>) -> Option<(&'static str, String)> {
    DOMINANT_ID_FIELDS.iter().find_map(|&field| {
        let id = match data.get(field)? {
            Value::String(s) if !s.is_empty() => s.clone(),
            Value::Number(n) => n.to_string(),
            _ => return None,
        };
        Some((field, id))
    })
}

fn success_result(tool: &str, data: &Map<String, Value>) -> ToolResult {
    let summary = match dominant_id(data) {
        Some((field, id)) => format!("{} succeeded ({}: {})", tool, field, id),
        None => format!("{} succeeded", tool),
    };
    let detail = serde_json::to_string_pretty(data).unwrap_or_default();
    ToolResult::success(vec![ContentItem::text(summary), ContentItem::text(detail)])
}

fn failure_message(tool: &str, error: &EngineError) -> String {
    match error.proxy_error() {
        Some(cause) => format!("{} failed [{}]: {}", tool, cause.code, cause.message),
        None => format!("{} failed: {}", tool, error),
    }
}
