//! `flowbridge run`: execute a workflow file.

use flowbridge_core::models::{ExecutionStatus, WorkflowDocument, WorkflowExecution};
use flowbridge_core::state::AppState;
use flowbridge_core::ExecutionContext;

use super::print_json;

/// Parse a `provider=token` argument.
pub fn parse_token(arg: &str) -> Result<(String, String), String> {
    match arg.split_once('=') {
        Some((provider, token)) if !provider.is_empty() => {
            Ok((provider.to_string(), token.to_string()))
        }
        _ => Err(format!("Invalid --token '{}': expected PROVIDER=TOKEN", arg)),
    }
}

/// Load and execute a workflow file. A failed execution is still returned
/// as `Ok`; only unreadable or invalid documents are errors.
pub async fn execute_file(
    state: &AppState,
    file: &str,
    tokens: &[String],
) -> Result<WorkflowExecution, String> {
    let document = WorkflowDocument::from_file(file)?;
    let name = document.name.clone().unwrap_or_else(|| file.to_string());
    let (steps, input) = document.into_parts().map_err(|e| e.to_string())?;

    let mut ctx = ExecutionContext::with_cancel(state.shutdown.child_token());
    for arg in tokens {
        let (provider, token) = parse_token(arg)?;
        ctx = ctx.with_token(provider, token);
    }

    tracing::info!(workflow = %name, steps = steps.len(), "running workflow");
    Ok(match state.engine.execute_workflow(&ctx, steps, input).await {
        Ok(execution) => execution,
        Err(failure) => failure.into_execution(),
    })
}

pub async fn run(state: &AppState, file: &str, tokens: &[String]) -> Result<(), String> {
    let execution = execute_file(state, file, tokens).await?;
    let value = serde_json::to_value(&execution)
        .map_err(|e| format!("Failed to serialize execution: {}", e))?;
    print_json(&value);

    if execution.status == ExecutionStatus::Completed {
        Ok(())
    } else {
        Err(execution
            .error_message
            .unwrap_or_else(|| format!("Workflow {} failed", execution.id)))
    }
}
