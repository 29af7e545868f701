//! In-memory `ServiceProxy` with scripted outcomes and a call log.
//!
//! ```ignore
//! let gmail = InMemoryServiceProxy::new("gmail")
//!     .with_display("Gmail", "Send and read email")
//!     .function(
//!         FunctionSpec::new("send_message", "Send an email").require(["to", "subject"]),
//!         Outcome::echo("message_id", "msg"),
//!     )
//!     .script("send_message", [Outcome::fail(ErrorCode::RateLimited, "quota")]);
//! ```
//!
//! Scripted outcomes are consumed first (FIFO); afterwards every call gets
//! the function's default outcome.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::{require_fields, FunctionSpec, ServiceDescriptor, ServiceProxy};
use crate::engine::ExecutionContext;
use crate::error::{ErrorCode, ProxyCallError, ProxyError};
use crate::models::ProxyResponse;

/// What a function call returns.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// Succeed with fixed data.
    Data(Map<String, Value>),
    /// Succeed, echoing the payload plus a generated id under `id_field`.
    Echo { id_field: String, prefix: String },
    /// Business failure.
    Fail(ProxyError),
    /// Transport failure (`Err` from `execute`).
    Transport(String),
}

impl Outcome {
    /// Fixed success data; non-object values are wrapped as `{"value": ..}`.
    pub fn data(value: Value) -> Self {
        match value {
            Value::Object(map) => Outcome::Data(map),
            other => {
                let mut map = Map::new();
                map.insert("value".into(), other);
                Outcome::Data(map)
            }
        }
    }

    pub fn echo(id_field: impl Into<String>, prefix: impl Into<String>) -> Self {
        Outcome::Echo {
            id_field: id_field.into(),
            prefix: prefix.into(),
        }
    }

    pub fn fail(code: ErrorCode, message: impl Into<String>) -> Self {
        Outcome::Fail(ProxyError::new(code, message))
    }
}

/// One observed `execute` call.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub function: String,
    pub token: String,
    pub payload: Map<String, Value>,
    pub at: Instant,
}

pub struct InMemoryServiceProxy {
    service_type: String,
    name: String,
    description: String,
    specs: Vec<FunctionSpec>,
    defaults: HashMap<String, Outcome>,
    scripts: Mutex<HashMap<String, VecDeque<Outcome>>>,
    calls: Mutex<Vec<RecordedCall>>,
    latency: Option<Duration>,
}

impl InMemoryServiceProxy {
    pub fn new(service_type: impl Into<String>) -> Self {
        let service_type = service_type.into();
        Self {
            name: service_type.clone(),
            service_type,
            description: String::new(),
            specs: Vec::new(),
            defaults: HashMap::new(),
            scripts: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            latency: None,
        }
    }

    pub fn with_display(mut self, name: impl Into<String>, description: impl Into<String>) -> Self {
        self.name = name.into();
        self.description = description.into();
        self
    }

    /// Declare a function and the outcome it returns once its script is empty.
    pub fn function(mut self, spec: FunctionSpec, outcome: Outcome) -> Self {
        self.defaults.insert(spec.name.clone(), outcome);
        self.specs.retain(|s| s.name != spec.name);
        self.specs.push(spec);
        self
    }

    pub fn script<I>(self, function: &str, outcomes: I) -> Self
    where
        I: IntoIterator<Item = Outcome>,
    {
        for outcome in outcomes {
            self.push_outcome(function, outcome);
        }
        self
    }

    /// Queue an outcome for the next call of `function`.
    pub fn push_outcome(&self, function: &str, outcome: Outcome) {
        self.scripts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(function.to_string())
            .or_default()
            .push_back(outcome);
    }

    /// Delay every call by `latency` (cancellable).
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn call_count(&self, function: &str) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|c| c.function == function)
            .count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn next_outcome(&self, function: &str) -> Option<Outcome> {
        let scripted = self
            .scripts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(function)
            .and_then(VecDeque::pop_front);
        scripted.or_else(|| self.defaults.get(function).cloned())
    }

    fn error(&self, code: ErrorCode, message: impl Into<String>) -> ProxyError {
        ProxyError::new(code, message).with_service_type(&self.service_type)
    }
}

#[async_trait]
impl ServiceProxy for InMemoryServiceProxy {
    async fn execute(
        &self,
        ctx: &ExecutionContext,
        function: &str,
        token: &str,
        payload: &Map<String, Value>,
    ) -> Result<ProxyResponse, ProxyCallError> {
        if ctx.is_cancelled() {
            return Err(ProxyCallError::Cancelled);
        }

        let started = Instant::now();
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedCall {
                function: function.to_string(),
                token: token.to_string(),
                payload: payload.clone(),
                at: started,
            });

        if let Err(err) = self.validate_request(function, payload) {
            return Ok(ProxyResponse::failure(function, err));
        }

        if token.is_empty() {
            return Ok(ProxyResponse::failure(
                function,
                self.error(ErrorCode::AuthenticationFailed, "missing bearer token"),
            ));
        }

        if let Some(latency) = self.latency {
            tokio::select! {
                _ = ctx.cancel_token().cancelled() => return Err(ProxyCallError::Cancelled),
                _ = tokio::time::sleep(latency) => {}
            }
        }

        let response = match self.next_outcome(function) {
            Some(Outcome::Data(data)) => ProxyResponse::ok(function, data),
            Some(Outcome::Echo { id_field, prefix }) => {
                let mut data = payload.clone();
                let id = uuid::Uuid::new_v4().simple().to_string();
                data.insert(id_field, Value::String(format!("{}_{}", prefix, &id[..12])));
                ProxyResponse::ok(function, data)
            }
            Some(Outcome::Fail(mut err)) => {
                if err.service_type.is_empty() {
                    err.service_type = self.service_type.clone();
                }
                ProxyResponse::failure(function, err)
            }
            Some(Outcome::Transport(message)) => return Err(ProxyCallError::Transport(message)),
            None => ProxyResponse::ok(function, Map::new()),
        };

        Ok(response.with_execution_time(started.elapsed()))
    }

    fn supported_functions(&self) -> Vec<String> {
        self.specs.iter().map(|s| s.name.clone()).collect()
    }

    fn service_capabilities(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("name".into(), Value::String(self.name.clone()));
        map.insert("description".into(), Value::String(self.description.clone()));
        map.insert("service_type".into(), Value::String(self.service_type.clone()));
        map.insert("in_memory".into(), Value::Bool(true));
        map.insert(
            "functions".into(),
            serde_json::json!(self.supported_functions()),
        );
        map
    }

    fn validate_request(
        &self,
        function: &str,
        payload: &Map<String, Value>,
    ) -> Result<(), ProxyError> {
        let spec = self.specs.iter().find(|s| s.name == function).ok_or_else(|| {
            self.error(
                ErrorCode::InvalidFunction,
                format!("{} does not support function '{}'", self.service_type, function),
            )
        })?;
        require_fields(&self.service_type, function, payload, &spec.required_fields)
    }

    fn descriptor(&self) -> ServiceDescriptor {
        ServiceDescriptor {
            name: self.name.clone(),
            description: self.description.clone(),
            functions: self.specs.clone(),
        }
    }
}
