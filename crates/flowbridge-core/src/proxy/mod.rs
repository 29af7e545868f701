//! The `ServiceProxy` contract: one adapter per provider + service pair.
//!
//! Concrete adapters for real external APIs live outside this crate. The
//! [`memory`] module ships a configurable in-memory proxy used by tests, and
//! [`sandbox`] registers a ready-made set of those for local runs.

pub mod memory;
pub mod sandbox;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::engine::ExecutionContext;
use crate::error::{ErrorCode, ProxyCallError, ProxyError};
use crate::models::ProxyResponse;

pub use memory::{InMemoryServiceProxy, Outcome, RecordedCall};

/// Adapter executing named functions against one external service.
///
/// Business failures (bad payload, expired token, quota) must be reported as
/// `Ok(ProxyResponse { success: false, .. })`. `Err` is reserved for
/// transport and programming failures. Not every adapter is guaranteed to
/// keep that split, so the engine treats both channels as a failed step.
#[async_trait]
pub trait ServiceProxy: Send + Sync {
    /// Perform `function` with `payload`. Implementations must run
    /// [`ServiceProxy::validate_request`] before any external call.
    async fn execute(
        &self,
        ctx: &ExecutionContext,
        function: &str,
        token: &str,
        payload: &Map<String, Value>,
    ) -> Result<ProxyResponse, ProxyCallError>;

    /// Function names, in declaration order.
    fn supported_functions(&self) -> Vec<String>;

    /// Informational metadata; not authoritative.
    fn service_capabilities(&self) -> Map<String, Value>;

    /// Check that `function` exists and `payload` carries its required fields.
    /// Never touches the network.
    fn validate_request(&self, function: &str, payload: &Map<String, Value>)
        -> Result<(), ProxyError>;

    /// Catalog entry for discovery endpoints and tool listings.
    fn descriptor(&self) -> ServiceDescriptor {
        let capabilities = self.service_capabilities();
        let text = |key: &str| {
            capabilities
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        ServiceDescriptor {
            name: text("name"),
            description: text("description"),
            functions: self
                .supported_functions()
                .into_iter()
                .map(|name| FunctionSpec::new(name, ""))
                .collect(),
        }
    }
}

/// Display metadata of a service and its functions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    pub name: String,
    pub description: String,
    pub functions: Vec<FunctionSpec>,
}

impl ServiceDescriptor {
    pub fn function(&self, name: &str) -> Option<&FunctionSpec> {
        self.functions.iter().find(|f| f.name == name)
    }

    /// Discovery shape with functions keyed by name.
    pub fn to_catalog_json(&self) -> Value {
        let functions: Map<String, Value> = self
            .functions
            .iter()
            .map(|f| {
                (
                    f.name.clone(),
                    serde_json::json!({
                        "description": f.description,
                        "required_fields": f.required_fields,
                    }),
                )
            })
            .collect();
        serde_json::json!({
            "name": self.name,
            "description": self.description,
            "functions": functions,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionSpec {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub required_fields: Vec<String>,
}

impl FunctionSpec {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            required_fields: Vec::new(),
        }
    }

    pub fn require<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_fields.extend(fields.into_iter().map(Into::into));
        self
    }
}

/// Shared required-field check for adapters.
///
/// A field counts as missing when it is absent, `null`, or an empty string.
pub fn require_fields(
    service_type: &str,
    function: &str,
    payload: &Map<String, Value>,
    fields: &[String],
) -> Result<(), ProxyError> {
    let missing: Vec<&str> = fields
        .iter()
        .filter(|field| match payload.get(field.as_str()) {
            None | Some(Value::Null) => true,
            Some(Value::String(s)) => s.is_empty(),
            Some(_) => false,
        })
        .map(String::as_str)
        .collect();

    if missing.is_empty() {
        return Ok(());
    }

    Err(ProxyError::new(
        ErrorCode::InvalidPayload,
        format!("{} requires field(s): {}", function, missing.join(", ")),
    )
    .with_service_type(service_type)
    .with_detail("missing_fields", serde_json::json!(missing)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_fields_reports_missing() {
        let payload = serde_json::json!({ "to": "a@example.com", "subject": "", "body": null });
        let payload = payload.as_object().unwrap();
        let fields = vec!["to".to_string(), "subject".to_string(), "body".to_string()];

        let err = require_fields("gmail", "send_message", payload, &fields).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidPayload);
        assert_eq!(err.service_type, "gmail");
        assert_eq!(err.message, "send_message requires field(s): subject, body");
        assert_eq!(err.details["missing_fields"], serde_json::json!(["subject", "body"]));
        assert!(!err.retryable);
    }

    #[test]
    fn test_require_fields_accepts_complete_payload() {
        let payload = serde_json::json!({ "title": "Notes", "count": 0 });
        let fields = vec!["title".to_string(), "count".to_string()];
        assert!(require_fields("docs", "create_document", payload.as_object().unwrap(), &fields).is_ok());
    }
}
