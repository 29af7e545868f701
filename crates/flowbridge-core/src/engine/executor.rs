//! Workflow Engine: runs a step list against registered service proxies.
//!
//! The engine:
//! 1. Checks that every `depends_on` id already succeeded
//! 2. Resolves `${step.field}` references in the payload
//! 3. Looks up the proxy and provider token
//! 4. Invokes the proxy, retrying per the step's policy
//! 5. Stores the response and aborts on the first failed step

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use serde_json::{Map, Value};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::context::ExecutionContext;
use super::ordering::ensure_unique_ids;
use super::resolver::ReferenceResolver;
use super::retry::run_with_retry;
use super::stats::{EngineStats, StatsSnapshot};
use crate::error::{EngineError, ErrorCode, ProxyCallError, ProxyError, WorkflowFailure};
use crate::models::{ProxyResponse, WorkflowExecution, WorkflowStep};
use crate::proxy::{ServiceDescriptor, ServiceProxy};

/// Registry key of one proxy. Displays as `provider_service`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegistryKey {
    pub provider: String,
    pub service: String,
}

impl RegistryKey {
    pub fn new(provider: impl Into<String>, service: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            service: service.into(),
        }
    }
}

impl fmt::Display for RegistryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.provider, self.service)
    }
}

/// Proxy registry, shared token map and the step-by-step executor.
///
/// Both maps sit behind async read/write locks: lookups during execution
/// take read guards, registration and token updates take write guards.
#[derive(Default)]
pub struct WorkflowEngine {
    proxies: RwLock<HashMap<RegistryKey, Arc<dyn ServiceProxy>>>,
    /// Keyed by provider only. Concurrent callers against the same provider
    /// share one slot; pass tokens through `ExecutionContext` to avoid that.
    tokens: RwLock<HashMap<String, String>>,
    stats: EngineStats,
}

impl WorkflowEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the proxy for `provider`/`service`.
    pub async fn register_service_proxy(
        &self,
        provider: impl Into<String>,
        service: impl Into<String>,
        proxy: Arc<dyn ServiceProxy>,
    ) {
        let key = RegistryKey::new(provider, service);
        info!(key = %key, "registered service proxy");
        self.proxies.write().await.insert(key, proxy);
    }

    /// Insert or replace the shared token for `provider`.
    pub async fn set_provider_token(&self, provider: impl Into<String>, token: impl Into<String>) {
        let provider = provider.into();
        debug!(provider = %provider, "provider token updated");
        self.tokens.write().await.insert(provider, token.into());
    }

    pub async fn provider_token(&self, provider: &str) -> Option<String> {
        self.tokens.read().await.get(provider).cloned()
    }

    pub async fn service_proxy(&self, provider: &str, service: &str) -> Option<Arc<dyn ServiceProxy>> {
        self.proxies
            .read()
            .await
            .get(&RegistryKey::new(provider, service))
            .cloned()
    }

    pub async fn supported_providers(&self) -> HashSet<String> {
        self.proxies
            .read()
            .await
            .keys()
            .map(|key| key.provider.clone())
            .collect()
    }

    pub async fn supported_services(&self, provider: &str) -> HashSet<String> {
        self.proxies
            .read()
            .await
            .keys()
            .filter(|key| key.provider == provider)
            .map(|key| key.service.clone())
            .collect()
    }

    /// Descriptors of every registered proxy, grouped by provider.
    pub async fn catalog(&self) -> BTreeMap<String, BTreeMap<String, ServiceDescriptor>> {
        let proxies = self.proxies.read().await;
        let mut catalog: BTreeMap<String, BTreeMap<String, ServiceDescriptor>> = BTreeMap::new();
        for (key, proxy) in proxies.iter() {
            catalog
                .entry(key.provider.clone())
                .or_default()
                .insert(key.service.clone(), proxy.descriptor());
        }
        catalog
    }

    /// `{provider: {service: descriptor}}` as served by `GET /api/services`.
    pub async fn catalog_json(&self) -> Value {
        let providers: Map<String, Value> = self
            .catalog()
            .await
            .into_iter()
            .map(|(provider, services)| {
                let services: Map<String, Value> = services
                    .into_iter()
                    .map(|(service, descriptor)| (service, descriptor.to_catalog_json()))
                    .collect();
                (provider, Value::Object(services))
            })
            .collect();
        Value::Object(providers)
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Execute `steps` in list order.
    ///
    /// Always yields a finalised record. On abort the record carries
    /// `status = failed`, the error message and every result stored so far.
    pub async fn execute_workflow(
        &self,
        ctx: &ExecutionContext,
        steps: Vec<WorkflowStep>,
        input: Map<String, Value>,
    ) -> Result<WorkflowExecution, WorkflowFailure> {
        let mut execution = WorkflowExecution::new(steps, input);
        self.stats.record_start();
        info!(
            execution = %execution.id,
            steps = execution.steps.len(),
            "workflow execution started"
        );

        let outcome = self.run_steps(ctx, &mut execution).await;
        match &outcome {
            Ok(()) => {
                execution.complete();
                info!(execution = %execution.id, "workflow execution completed");
            }
            Err(err) => {
                execution.fail(err.to_string());
                warn!(
                    execution = %execution.id,
                    code = err.code(),
                    error = %err,
                    "workflow execution failed"
                );
            }
        }
        self.stats.record_finish(&execution);

        match outcome {
            Ok(()) => Ok(execution),
            Err(error) => Err(WorkflowFailure {
                execution: Box::new(execution),
                error,
            }),
        }
    }

    async fn run_steps(
        &self,
        ctx: &ExecutionContext,
        execution: &mut WorkflowExecution,
    ) -> Result<(), EngineError> {
        ensure_unique_ids(&execution.steps)?;

        for index in 0..execution.steps.len() {
            if ctx.is_cancelled() {
                return Err(EngineError::Cancelled);
            }
            let step = execution.steps[index].clone();
            debug!(step = %step.id, function = %step.function, "running step");

            if let Some(dependency) = step.depends_on.iter().find(|dep| !execution.succeeded(dep)) {
                return Err(EngineError::DependencyNotSatisfied {
                    step: step.id.clone(),
                    dependency: dependency.clone(),
                });
            }

            let payload = ReferenceResolver::for_execution(execution).resolve_payload(&step.payload);

            let proxy = self
                .service_proxy(&step.provider, &step.service)
                .await
                .ok_or_else(|| EngineError::ProxyNotRegistered {
                    provider: step.provider.clone(),
                    service: step.service.clone(),
                })?;

            let token = match ctx.token_for(&step.provider) {
                Some(token) => token.to_string(),
                None => self.provider_token(&step.provider).await.ok_or_else(|| {
                    EngineError::TokenMissing {
                        provider: step.provider.clone(),
                    }
                })?,
            };

            let run = run_with_retry(
                &step.id,
                step.retry_policy.as_ref(),
                ctx.cancel_token(),
                |attempt| invoke_once(proxy.as_ref(), ctx, &step, &token, &payload, attempt),
            )
            .await;

            if let Some(response) = run.last {
                execution.step_results.insert(step.id.clone(), response);
            }
            run.result?;
            debug!(step = %step.id, attempts = run.attempts, "step succeeded");
        }

        Ok(())
    }
}

/// One proxy call, normalised to `Result<ProxyResponse, EngineError>`.
///
/// Transport errors and elapsed timeouts become failed responses so the
/// retry loop treats them like any other retryable failure. Only
/// cancellation is returned as `Err`.
async fn invoke_once(
    proxy: &dyn ServiceProxy,
    ctx: &ExecutionContext,
    step: &WorkflowStep,
    token: &str,
    payload: &Map<String, Value>,
    attempt: u32,
) -> Result<ProxyResponse, EngineError> {
    let started = Instant::now();
    let call = proxy.execute(ctx, &step.function, token, payload);
    let timed = async {
        match step.timeout {
            Some(limit) => tokio::time::timeout(limit, call).await.ok(),
            None => Some(call.await),
        }
    };

    let outcome = tokio::select! {
        biased;
        _ = ctx.cancel_token().cancelled() => return Err(EngineError::Cancelled),
        outcome = timed => outcome,
    };

    let response = match outcome {
        Some(Ok(response)) => response,
        Some(Err(ProxyCallError::Cancelled)) => return Err(EngineError::Cancelled),
        Some(Err(ProxyCallError::Transport(message))) => {
            warn!(step = %step.id, attempt, error = %message, "proxy transport error");
            ProxyResponse::failure(
                &step.function,
                ProxyError::new(ErrorCode::InternalError, message).with_service_type(&step.service),
            )
        }
        None => {
            let limit_ms = step.timeout.map(|t| t.as_millis() as u64).unwrap_or_default();
            warn!(step = %step.id, attempt, timeout_ms = limit_ms, "proxy call timed out");
            ProxyResponse::failure(
                &step.function,
                ProxyError::new(
                    ErrorCode::ServiceUnavailable,
                    format!("{} timed out after {}ms", step.function, limit_ms),
                )
                .with_service_type(&step.service)
                .with_detail("timeout_ms", Value::from(limit_ms)),
            )
        }
    };

    if response.metadata.execution_time_ms == 0 {
        Ok(response.with_execution_time(started.elapsed()))
    } else {
        Ok(response)
    }
}
