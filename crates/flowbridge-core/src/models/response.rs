//! The outcome of a single proxy invocation.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ProxyError;

/// Result of executing one function against a service.
///
/// When `success` is true `data` carries the result and `error` is `None`;
/// otherwise `error` describes the failure and `data` is empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProxyResponse {
    pub success: bool,

    #[serde(default)]
    pub data: Map<String, Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ProxyError>,

    #[serde(default)]
    pub metadata: ResponseMetadata,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseMetadata {
    #[serde(default)]
    pub execution_time_ms: u64,

    #[serde(default)]
    pub function: String,

    #[serde(default)]
    pub timestamp: DateTime<Utc>,
}

impl ProxyResponse {
    pub fn ok(function: impl Into<String>, data: Map<String, Value>) -> Self {
        Self {
            success: true,
            data,
            error: None,
            metadata: ResponseMetadata::now(function),
        }
    }

    pub fn failure(function: impl Into<String>, error: ProxyError) -> Self {
        Self {
            success: false,
            data: Map::new(),
            error: Some(error),
            metadata: ResponseMetadata::now(function),
        }
    }

    pub fn with_execution_time(mut self, elapsed: Duration) -> Self {
        self.metadata.execution_time_ms = elapsed.as_millis().min(u64::MAX as u128) as u64;
        self
    }
}

impl ResponseMetadata {
    pub fn now(function: impl Into<String>) -> Self {
        Self {
            execution_time_ms: 0,
            function: function.into(),
            timestamp: Utc::now(),
        }
    }
}
