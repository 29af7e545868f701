//! Workflow step and retry policy types.
//!
//! Durations travel over the wire as integer milliseconds:
//!
//! ```json
//! {
//!   "id": "send",
//!   "provider": "workspace",
//!   "service": "gmail",
//!   "function": "send_message",
//!   "payload": { "to": "a@example.com", "subject": "Hi", "body": "${draft.text}" },
//!   "depends_on": ["draft"],
//!   "retry_policy": { "max_retries": 2, "retry_delay": 500, "backoff_factor": 2.0 },
//!   "timeout": 30000
//! }
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single unit of work bound to a provider/service/function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowStep {
    /// Unique within a workflow; used for `depends_on` and `${id.field}` references.
    pub id: String,

    #[serde(default)]
    pub name: String,

    pub provider: String,

    pub service: String,

    pub function: String,

    #[serde(default)]
    pub payload: Map<String, Value>,

    /// Ids of earlier steps that must have succeeded before this one runs.
    #[serde(default)]
    pub depends_on: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_policy: Option<RetryPolicy>,

    /// Per-attempt time limit.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "option_duration_ms"
    )]
    pub timeout: Option<Duration>,
}

impl WorkflowStep {
    pub fn new(
        id: impl Into<String>,
        provider: impl Into<String>,
        service: impl Into<String>,
        function: impl Into<String>,
    ) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            provider: provider.into(),
            service: service.into(),
            function: function.into(),
            payload: Map::new(),
            depends_on: Vec::new(),
            retry_policy: None,
            timeout: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the payload. Non-object values are ignored.
    pub fn with_payload(mut self, payload: Value) -> Self {
        if let Value::Object(map) = payload {
            self.payload = map;
        }
        self
    }

    pub fn depends_on<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.depends_on.extend(ids.into_iter().map(Into::into));
        self
    }

    pub fn with_retry(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = Some(policy);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// How a failing step is retried.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    #[serde(default)]
    pub max_retries: u32,

    /// Wait before the first retry.
    #[serde(with = "duration_ms")]
    pub retry_delay: Duration,

    /// Multiplier applied to the wait after each failed attempt.
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,
}

fn default_backoff_factor() -> f64 {
    1.0
}

impl RetryPolicy {
    pub fn new(max_retries: u32, retry_delay: Duration, backoff_factor: f64) -> Self {
        Self {
            max_retries,
            retry_delay,
            backoff_factor,
        }
    }

    /// Backoff factor clamped to `>= 1.0`; NaN and infinities become `1.0`.
    pub fn effective_backoff(&self) -> f64 {
        if self.backoff_factor.is_finite() && self.backoff_factor >= 1.0 {
            self.backoff_factor
        } else {
            1.0
        }
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis().min(u64::MAX as u128) as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

mod option_duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => serializer.serialize_u64(d.as_millis().min(u64::MAX as u128) as u64),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Option::<u64>::deserialize(deserializer).map(|ms| ms.map(Duration::from_millis))
    }
}
