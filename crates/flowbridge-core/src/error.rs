//! Error types for the Flowbridge platform.
//!
//! Three layers of failure are modelled here:
//!
//! - `ProxyError`: a business failure reported by a service proxy, carried
//!   as data inside a `ProxyResponse`. Its `ErrorCode` drives retries.
//! - `EngineError`: an abort condition of the workflow engine. Returned
//!   wrapped in `WorkflowFailure` together with the finalised execution.
//! - `ServerError`: errors of the HTTP adapters. When the `axum` feature is
//!   enabled it implements `IntoResponse`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::models::WorkflowExecution;

// ---------------------------------------------------------------------------
// Proxy error taxonomy
// ---------------------------------------------------------------------------

/// Failure category reported by a service proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    InvalidFunction,
    InvalidPayload,
    AuthenticationFailed,
    ServiceUnavailable,
    RateLimited,
    InternalError,
    NotFound,
    PermissionDenied,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InvalidFunction => "invalid_function",
            ErrorCode::InvalidPayload => "invalid_payload",
            ErrorCode::AuthenticationFailed => "authentication_failed",
            ErrorCode::ServiceUnavailable => "service_unavailable",
            ErrorCode::RateLimited => "rate_limited",
            ErrorCode::InternalError => "internal_error",
            ErrorCode::NotFound => "not_found",
            ErrorCode::PermissionDenied => "permission_denied",
        }
    }

    /// Whether a failure with this code is transient by default.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorCode::ServiceUnavailable | ErrorCode::RateLimited | ErrorCode::InternalError
        )
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A structured business failure returned by a service proxy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error("[{code}] {message}")]
pub struct ProxyError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub details: Map<String, Value>,
    #[serde(default)]
    pub service_type: String,
    pub retryable: bool,
}

impl ProxyError {
    /// Create an error whose `retryable` flag follows the code's default.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: Map::new(),
            service_type: String::new(),
            retryable: code.is_retryable(),
        }
    }

    pub fn with_service_type(mut self, service_type: impl Into<String>) -> Self {
        self.service_type = service_type.into();
        self
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: Value) -> Self {
        self.details.insert(key.into(), value);
        self
    }

    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }
}

/// Transport-level failure of a proxy call, as opposed to a business failure.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProxyCallError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("call cancelled")]
    Cancelled,
}

// ---------------------------------------------------------------------------
// Engine errors
// ---------------------------------------------------------------------------

/// Abort conditions of a workflow execution.
#[derive(Debug, Clone, thiserror::Error)]
pub enum EngineError {
    #[error("invalid workflow: {0}")]
    InvalidWorkflow(String),

    #[error("step '{step}' depends on '{dependency}', which has not completed successfully")]
    DependencyNotSatisfied { step: String, dependency: String },

    #[error("no service proxy registered for {provider}/{service}")]
    ProxyNotRegistered { provider: String, service: String },

    #[error("no token configured for provider '{provider}'")]
    TokenMissing { provider: String },

    #[error("step '{step}' failed: {error}")]
    StepFailed { step: String, error: ProxyError },

    #[error("step '{step}' failed after {attempts} attempts: {last}")]
    RetriesExhausted {
        step: String,
        attempts: u32,
        last: ProxyError,
    },

    #[error("execution cancelled")]
    Cancelled,
}

impl EngineError {
    /// Stable machine-readable identifier.
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::InvalidWorkflow(_) => "invalid_workflow",
            EngineError::DependencyNotSatisfied { .. } => "dependency_not_satisfied",
            EngineError::ProxyNotRegistered { .. } => "proxy_not_registered",
            EngineError::TokenMissing { .. } => "token_missing",
            EngineError::StepFailed { .. } => "step_failed",
            EngineError::RetriesExhausted { .. } => "retries_exhausted",
            EngineError::Cancelled => "cancelled",
        }
    }

    /// The proxy error behind a step failure, if any.
    pub fn proxy_error(&self) -> Option<&ProxyError> {
        match self {
            EngineError::StepFailed { error, .. } => Some(error),
            EngineError::RetriesExhausted { last, .. } => Some(last),
            _ => None,
        }
    }
}

/// A failed execution: the finalised record plus the error that aborted it.
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct WorkflowFailure {
    pub execution: Box<WorkflowExecution>,
    #[source]
    pub error: EngineError,
}

impl WorkflowFailure {
    pub fn into_execution(self) -> WorkflowExecution {
        *self.execution
    }
}

// ---------------------------------------------------------------------------
// HTTP adapter errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[cfg(feature = "axum")]
impl axum::response::IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        use axum::http::StatusCode;

        let (status, message) = match &self {
            ServerError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ServerError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ServerError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_retryability() {
        assert!(ErrorCode::ServiceUnavailable.is_retryable());
        assert!(ErrorCode::RateLimited.is_retryable());
        assert!(!ErrorCode::InvalidPayload.is_retryable());
        assert!(!ErrorCode::AuthenticationFailed.is_retryable());

        let err = ProxyError::new(ErrorCode::RateLimited, "slow down");
        assert!(err.retryable);
        assert!(!err.with_retryable(false).retryable);
    }

    #[test]
    fn test_proxy_error_wire_format() {
        let err = ProxyError::new(ErrorCode::NotFound, "no such document")
            .with_service_type("docs");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], "not_found");
        assert_eq!(json["service_type"], "docs");
        assert_eq!(json["retryable"], false);
        assert!(json.get("details").is_none());
    }
}
