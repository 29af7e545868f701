//! Payload reference resolution.
//!
//! Supported patterns inside string values:
//! - `${<stepId>.<field>[.<nested>...]}`: a field of a prior successful step's `data`
//! - `${input.<field>...}`: the execution input (when no step is named `input`)
//!
//! A string that is exactly one reference is replaced by the referenced
//! value with its JSON type intact. References embedded in longer text are
//! interpolated as text. Anything that cannot be resolved becomes
//! `[UNRESOLVED: ${...}]` and execution carries on.

use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::{Captures, Regex};
use serde_json::{Map, Value};

use crate::models::{ProxyResponse, WorkflowExecution};

/// Pseudo step id that addresses the execution input.
pub const INPUT_SCOPE: &str = "input";

static WHOLE_REFERENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\$\{([^{}]+)\}$").expect("valid reference pattern"));

static EMBEDDED_REFERENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^{}]+)\}").expect("valid reference pattern"));

pub struct ReferenceResolver<'a> {
    results: &'a IndexMap<String, ProxyResponse>,
    input: &'a Map<String, Value>,
}

impl<'a> ReferenceResolver<'a> {
    pub fn new(results: &'a IndexMap<String, ProxyResponse>, input: &'a Map<String, Value>) -> Self {
        Self { results, input }
    }

    pub fn for_execution(execution: &'a WorkflowExecution) -> Self {
        Self::new(&execution.step_results, &execution.input)
    }

    pub fn resolve_payload(&self, payload: &Map<String, Value>) -> Map<String, Value> {
        payload
            .iter()
            .map(|(key, value)| (key.clone(), self.resolve_value(value)))
            .collect()
    }

    pub fn resolve_value(&self, value: &Value) -> Value {
        match value {
            Value::String(s) => self.resolve_string(s),
            Value::Array(items) => Value::Array(items.iter().map(|v| self.resolve_value(v)).collect()),
            Value::Object(map) => Value::Object(self.resolve_payload(map)),
            Value::Null | Value::Bool(_) | Value::Number(_) => value.clone(),
        }
    }

    fn resolve_string(&self, s: &str) -> Value {
        if !s.contains("${") {
            return Value::String(s.to_string());
        }

        if let Some(caps) = WHOLE_REFERENCE.captures(s) {
            let reference = &caps[1];
            return match self.lookup(reference) {
                Some(value) => value.clone(),
                None => Value::String(self.unresolved(reference)),
            };
        }

        let interpolated = EMBEDDED_REFERENCE.replace_all(s, |caps: &Captures| {
            match self.lookup(&caps[1]) {
                Some(Value::String(text)) => text.clone(),
                Some(other) => other.to_string(),
                None => self.unresolved(&caps[1]),
            }
        });
        Value::String(interpolated.into_owned())
    }

    /// Look up `stepId.path.to.field`. Numeric segments index arrays.
    pub fn lookup(&self, reference: &str) -> Option<&'a Value> {
        let results = self.results;
        let mut segments = reference.trim().split('.');
        let scope = segments.next()?;

        let root: &'a Map<String, Value> = match results.get(scope) {
            Some(response) if response.success => &response.data,
            Some(_) => return None,
            None if scope == INPUT_SCOPE => self.input,
            None => return None,
        };

        let mut current = root.get(segments.next()?)?;
        for segment in segments {
            current = match current {
                Value::Object(map) => map.get(segment)?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    fn unresolved(&self, reference: &str) -> String {
        tracing::warn!(reference, "unresolved payload reference");
        format!("[UNRESOLVED: ${{{}}}]", reference)
    }
}
