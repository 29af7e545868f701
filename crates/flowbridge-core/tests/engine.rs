//! Integration tests for the workflow engine.
//!
//! Every test builds its own engine with in-memory proxies, so the call log
//! of each proxy shows exactly which steps were invoked.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use flowbridge_core::error::{EngineError, ErrorCode};
use flowbridge_core::models::{ExecutionStatus, RetryPolicy, WorkflowStep};
use flowbridge_core::proxy::{FunctionSpec, InMemoryServiceProxy, Outcome};
use flowbridge_core::{ExecutionContext, WorkflowEngine};
use serde_json::{json, Map, Value};

const PROVIDER: &str = "workspace";

fn gmail() -> Arc<InMemoryServiceProxy> {
    Arc::new(
        InMemoryServiceProxy::new("gmail")
            .function(
                FunctionSpec::new("send_message", "Send").require(["to"]),
                Outcome::echo("message_id", "msg"),
            )
            .function(
                FunctionSpec::new("fixed", "Fixed id"),
                Outcome::data(json!({ "message_id": "abc", "count": 2 })),
            ),
    )
}

fn docs() -> Arc<InMemoryServiceProxy> {
    Arc::new(InMemoryServiceProxy::new("docs").function(
        FunctionSpec::new("create_document", "Create").require(["title"]),
        Outcome::echo("document_id", "doc"),
    ))
}

async fn engine_with(gmail: &Arc<InMemoryServiceProxy>, docs: &Arc<InMemoryServiceProxy>) -> WorkflowEngine {
    let engine = WorkflowEngine::new();
    engine.register_service_proxy(PROVIDER, "gmail", gmail.clone()).await;
    engine.register_service_proxy(PROVIDER, "docs", docs.clone()).await;
    engine.set_provider_token(PROVIDER, "token-1").await;
    engine
}

fn send(id: &str, payload: Value) -> WorkflowStep {
    WorkflowStep::new(id, PROVIDER, "gmail", "send_message").with_payload(payload)
}

#[tokio::test]
async fn test_completed_execution_records_every_step() {
    let (gmail, docs) = (gmail(), docs());
    let engine = engine_with(&gmail, &docs).await;

    let steps = vec![
        WorkflowStep::new("doc", PROVIDER, "docs", "create_document")
            .with_payload(json!({ "title": "Notes" })),
        send("mail", json!({ "to": "a@example.com", "body": "${doc.document_id}" }))
            .depends_on(["doc"]),
    ];
    let execution = engine
        .execute_workflow(&ExecutionContext::new(), steps, Map::new())
        .await
        .unwrap();

    assert_eq!(execution.status, ExecutionStatus::Completed);
    assert!(execution.end_time.is_some());
    assert!(execution.error_message.is_none());
    let order: Vec<&str> = execution.step_results.keys().map(String::as_str).collect();
    assert_eq!(order, vec!["doc", "mail"]);

    let doc_id = execution.result("doc").unwrap().data["document_id"].clone();
    assert_eq!(gmail.calls()[0].payload["body"], doc_id);
    assert_eq!(gmail.calls()[0].token, "token-1");
}

#[tokio::test]
async fn test_fail_fast_keeps_successful_prefix() {
    let (gmail, docs) = (gmail(), docs());
    let engine = engine_with(&gmail, &docs).await;

    let steps = vec![
        send("first", json!({ "to": "a@example.com" })),
        send("broken", json!({})),
        send("never", json!({ "to": "c@example.com" })),
    ];
    let failure = engine
        .execute_workflow(&ExecutionContext::new(), steps, Map::new())
        .await
        .unwrap_err();

    let execution = failure.execution;
    assert_eq!(execution.status, ExecutionStatus::Failed);
    assert!(execution.end_time.is_some());
    let recorded: Vec<&str> = execution.step_results.keys().map(String::as_str).collect();
    assert_eq!(recorded, vec!["first", "broken"]);
    assert!(execution.step_results["first"].success);
    assert!(!execution.step_results["broken"].success);
    assert_eq!(gmail.total_calls(), 2);

    match failure.error {
        EngineError::StepFailed { step, error } => {
            assert_eq!(step, "broken");
            assert_eq!(error.code, ErrorCode::InvalidPayload);
        }
        other => panic!("expected StepFailed, got {:?}", other),
    }
    assert!(execution.error_message.unwrap().contains("broken"));
}

#[tokio::test]
async fn test_dependency_on_missing_or_failed_step_aborts_without_invoking() {
    let (gmail, docs) = (gmail(), docs());
    let engine = engine_with(&gmail, &docs).await;

    let failure = engine
        .execute_workflow(
            &ExecutionContext::new(),
            vec![send("mail", json!({ "to": "a@example.com" })).depends_on(["ghost"])],
            Map::new(),
        )
        .await
        .unwrap_err();
    assert!(matches!(
        failure.error,
        EngineError::DependencyNotSatisfied { ref dependency, .. } if dependency == "ghost"
    ));
    assert!(failure.execution.step_results.is_empty());
    assert_eq!(gmail.total_calls(), 0);
}

#[tokio::test]
async fn test_reference_resolution_preserves_types() {
    let (gmail, docs) = (gmail(), docs());
    let engine = engine_with(&gmail, &docs).await;

    let steps = vec![
        WorkflowStep::new("A", PROVIDER, "gmail", "fixed"),
        send(
            "B",
            json!({ "to": "a@example.com", "ref": "${A.message_id}", "count": "${A.count}" }),
        ),
    ];
    engine
        .execute_workflow(&ExecutionContext::new(), steps, Map::new())
        .await
        .unwrap();

    let sent = &gmail.calls()[1].payload;
    assert_eq!(sent["ref"], "abc");
    assert_eq!(sent["count"], json!(2));
}

#[tokio::test]
async fn test_unresolved_reference_is_sent_downstream() {
    let (gmail, docs) = (gmail(), docs());
    let engine = engine_with(&gmail, &docs).await;

    let steps = vec![
        WorkflowStep::new("A", PROVIDER, "gmail", "fixed"),
        send("B", json!({ "to": "a@example.com", "ref": "${A.missing}" })),
    ];
    let execution = engine
        .execute_workflow(&ExecutionContext::new(), steps, Map::new())
        .await
        .unwrap();

    assert_eq!(execution.status, ExecutionStatus::Completed);
    assert_eq!(gmail.calls()[1].payload["ref"], "[UNRESOLVED: ${A.missing}]");
}

#[tokio::test]
async fn test_input_references() {
    let (gmail, docs) = (gmail(), docs());
    let engine = engine_with(&gmail, &docs).await;

    let input = json!({ "attendee": "bob@example.com" }).as_object().cloned().unwrap();
    engine
        .execute_workflow(
            &ExecutionContext::new(),
            vec![send("mail", json!({ "to": "${input.attendee}" }))],
            input,
        )
        .await
        .unwrap();

    assert_eq!(gmail.calls()[0].payload["to"], "bob@example.com");
}

#[tokio::test]
async fn test_retry_count_and_backoff_timing() {
    let flaky = Arc::new(InMemoryServiceProxy::new("gmail").function(
        FunctionSpec::new("send_message", "Send"),
        Outcome::fail(ErrorCode::ServiceUnavailable, "backend down"),
    ));
    let engine = WorkflowEngine::new();
    engine.register_service_proxy(PROVIDER, "gmail", flaky.clone()).await;
    engine.set_provider_token(PROVIDER, "t").await;

    let step = send("mail", json!({}))
        .with_retry(RetryPolicy::new(2, Duration::from_millis(10), 2.0));
    let started = Instant::now();
    let failure = engine
        .execute_workflow(&ExecutionContext::new(), vec![step], Map::new())
        .await
        .unwrap_err();

    assert_eq!(flaky.total_calls(), 3);
    assert!(started.elapsed() >= Duration::from_millis(30));

    let calls = flaky.calls();
    assert!(calls[1].at.duration_since(calls[0].at) >= Duration::from_millis(10));
    assert!(calls[2].at.duration_since(calls[1].at) >= Duration::from_millis(20));

    assert!(matches!(
        failure.error,
        EngineError::RetriesExhausted { attempts: 3, .. }
    ));
    assert_eq!(failure.execution.status, ExecutionStatus::Failed);
    assert!(!failure.execution.step_results["mail"].success);
}

#[tokio::test]
async fn test_retry_recovers_from_scripted_failures() {
    let proxy = Arc::new(
        InMemoryServiceProxy::new("gmail")
            .function(FunctionSpec::new("send_message", "Send"), Outcome::echo("message_id", "msg"))
            .script(
                "send_message",
                [
                    Outcome::fail(ErrorCode::RateLimited, "slow down"),
                    Outcome::Transport("connection reset".into()),
                ],
            ),
    );
    let engine = WorkflowEngine::new();
    engine.register_service_proxy(PROVIDER, "gmail", proxy.clone()).await;
    engine.set_provider_token(PROVIDER, "t").await;

    let step = send("mail", json!({}))
        .with_retry(RetryPolicy::new(3, Duration::from_millis(1), 1.0));
    let execution = engine
        .execute_workflow(&ExecutionContext::new(), vec![step], Map::new())
        .await
        .unwrap();

    assert_eq!(proxy.total_calls(), 3);
    assert!(execution.step_results["mail"].success);
}

#[tokio::test]
async fn test_non_retryable_failure_is_not_retried() {
    let proxy = Arc::new(InMemoryServiceProxy::new("gmail").function(
        FunctionSpec::new("send_message", "Send"),
        Outcome::fail(ErrorCode::PermissionDenied, "no access"),
    ));
    let engine = WorkflowEngine::new();
    engine.register_service_proxy(PROVIDER, "gmail", proxy.clone()).await;
    engine.set_provider_token(PROVIDER, "t").await;

    let step = send("mail", json!({}))
        .with_retry(RetryPolicy::new(5, Duration::from_millis(1), 1.0));
    let failure = engine
        .execute_workflow(&ExecutionContext::new(), vec![step], Map::new())
        .await
        .unwrap_err();

    assert_eq!(proxy.total_calls(), 1);
    assert!(matches!(failure.error, EngineError::StepFailed { .. }));
}

#[tokio::test]
async fn test_transport_error_without_retry_aborts() {
    let proxy = Arc::new(InMemoryServiceProxy::new("gmail").function(
        FunctionSpec::new("send_message", "Send"),
        Outcome::Transport("dns failure".into()),
    ));
    let engine = WorkflowEngine::new();
    engine.register_service_proxy(PROVIDER, "gmail", proxy).await;
    engine.set_provider_token(PROVIDER, "t").await;

    let failure = engine
        .execute_workflow(&ExecutionContext::new(), vec![send("mail", json!({}))], Map::new())
        .await
        .unwrap_err();

    let stored = &failure.execution.step_results["mail"];
    assert!(!stored.success);
    assert_eq!(stored.error.as_ref().unwrap().code, ErrorCode::InternalError);
    assert!(stored.error.as_ref().unwrap().message.contains("dns failure"));
}

#[tokio::test]
async fn test_registry_derivation() {
    let (gmail, docs) = (gmail(), docs());
    let engine = engine_with(&gmail, &docs).await;

    assert_eq!(
        engine.supported_providers().await,
        HashSet::from(["workspace".to_string()])
    );
    assert_eq!(
        engine.supported_services("workspace").await,
        HashSet::from(["gmail".to_string(), "docs".to_string()])
    );
    assert!(engine.supported_services("other").await.is_empty());

    let catalog = engine.catalog().await;
    assert_eq!(catalog["workspace"]["gmail"].functions.len(), 2);
}

#[tokio::test]
async fn test_configuration_errors_are_fatal() {
    let engine = WorkflowEngine::new();
    let failure = engine
        .execute_workflow(&ExecutionContext::new(), vec![send("mail", json!({}))], Map::new())
        .await
        .unwrap_err();
    assert_eq!(failure.error.code(), "proxy_not_registered");
    assert!(failure.execution.step_results.is_empty());

    let proxy = gmail();
    engine.register_service_proxy(PROVIDER, "gmail", proxy.clone()).await;
    let failure = engine
        .execute_workflow(&ExecutionContext::new(), vec![send("mail", json!({}))], Map::new())
        .await
        .unwrap_err();
    assert_eq!(failure.error.code(), "token_missing");
    assert_eq!(proxy.total_calls(), 0);
}

#[tokio::test]
async fn test_duplicate_step_ids_are_rejected() {
    let (gmail, docs) = (gmail(), docs());
    let engine = engine_with(&gmail, &docs).await;

    let steps = vec![
        send("mail", json!({ "to": "a@example.com" })),
        send("mail", json!({ "to": "b@example.com" })),
    ];
    let failure = engine
        .execute_workflow(&ExecutionContext::new(), steps, Map::new())
        .await
        .unwrap_err();

    assert!(matches!(failure.error, EngineError::InvalidWorkflow(_)));
    assert_eq!(gmail.total_calls(), 0);
}

#[tokio::test]
async fn test_step_timeout_is_retryable_failure() {
    let slow = Arc::new(
        InMemoryServiceProxy::new("gmail")
            .function(FunctionSpec::new("send_message", "Send"), Outcome::echo("message_id", "msg"))
            .with_latency(Duration::from_secs(5)),
    );
    let engine = WorkflowEngine::new();
    engine.register_service_proxy(PROVIDER, "gmail", slow.clone()).await;
    engine.set_provider_token(PROVIDER, "t").await;

    let step = send("mail", json!({}))
        .with_timeout(Duration::from_millis(20))
        .with_retry(RetryPolicy::new(1, Duration::from_millis(1), 1.0));
    let started = Instant::now();
    let failure = engine
        .execute_workflow(&ExecutionContext::new(), vec![step], Map::new())
        .await
        .unwrap_err();

    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(slow.total_calls(), 2);
    let last = failure.error.proxy_error().unwrap();
    assert_eq!(last.code, ErrorCode::ServiceUnavailable);
}

#[tokio::test]
async fn test_cancellation_stops_in_flight_call() {
    let slow = Arc::new(
        InMemoryServiceProxy::new("gmail")
            .function(FunctionSpec::new("send_message", "Send"), Outcome::echo("message_id", "msg"))
            .with_latency(Duration::from_secs(30)),
    );
    let engine = WorkflowEngine::new();
    engine.register_service_proxy(PROVIDER, "gmail", slow.clone()).await;
    engine.set_provider_token(PROVIDER, "t").await;

    let ctx = ExecutionContext::new();
    let trigger = ctx.cancel_token().clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let failure = engine
        .execute_workflow(&ctx, vec![send("a", json!({})), send("b", json!({}))], Map::new())
        .await
        .unwrap_err();

    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(matches!(failure.error, EngineError::Cancelled));
    assert_eq!(slow.total_calls(), 1);
    assert_eq!(failure.execution.status, ExecutionStatus::Failed);
}
