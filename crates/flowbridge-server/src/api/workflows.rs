//! Workflow execution API - /api/workflows
//!
//! POST /api/workflows/execute - Run a step list and return the execution record

use std::collections::HashMap;

use axum::{extract::rejection::JsonRejection, extract::State, routing::post, Json, Router};
use serde::Deserialize;

use flowbridge_core::error::ServerError;
use flowbridge_core::models::{WorkflowDocument, WorkflowExecution};
use flowbridge_core::state::AppState;
use flowbridge_core::ExecutionContext;

pub fn router() -> Router<AppState> {
    Router::new().route("/execute", post(execute_workflow))
}

#[derive(Debug, Deserialize)]
struct ExecuteRequest {
    #[serde(flatten)]
    document: WorkflowDocument,
    /// Per-call provider tokens; they override the engine's shared map
    /// for this execution only.
    #[serde(default)]
    tokens: HashMap<String, String>,
}

/// Completed and failed executions are both returned with 200; the record's
/// `status` and `error_message` tell them apart.
async fn execute_workflow(
    State(state): State<AppState>,
    body: Result<Json<ExecuteRequest>, JsonRejection>,
) -> Result<Json<WorkflowExecution>, ServerError> {
    let Json(request) = body.map_err(|e| ServerError::BadRequest(e.body_text()))?;

    let (steps, input) = request
        .document
        .into_parts()
        .map_err(|e| ServerError::BadRequest(e.to_string()))?;

    let ctx = request
        .tokens
        .into_iter()
        .fold(ExecutionContext::with_cancel(state.shutdown.child_token()), |ctx, (provider, token)| {
            ctx.with_token(provider, token)
        });

    tracing::info!(steps = steps.len(), "[Workflows] execute");
    let execution = match state.engine.execute_workflow(&ctx, steps, input).await {
        Ok(execution) => execution,
        Err(failure) => failure.into_execution(),
    };
    Ok(Json(execution))
}
