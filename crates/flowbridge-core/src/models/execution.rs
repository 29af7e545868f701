//! Bookkeeping record for one workflow run.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::response::ProxyResponse;
use super::step::WorkflowStep;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Running,
    Completed,
    Failed,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Running => "running",
            ExecutionStatus::Completed => "completed",
            ExecutionStatus::Failed => "failed",
        }
    }
}

/// One execution of a step list. Owned by the engine for the duration of
/// the call, then handed back to the caller; never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowExecution {
    pub id: String,

    pub steps: Vec<WorkflowStep>,

    /// Results keyed by step id, in execution order.
    pub step_results: IndexMap<String, ProxyResponse>,

    #[serde(default)]
    pub input: Map<String, Value>,

    pub status: ExecutionStatus,

    pub start_time: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl WorkflowExecution {
    pub fn new(steps: Vec<WorkflowStep>, input: Map<String, Value>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            steps,
            step_results: IndexMap::new(),
            input,
            status: ExecutionStatus::Running,
            start_time: Utc::now(),
            end_time: None,
            error_message: None,
        }
    }

    pub fn complete(&mut self) {
        self.status = ExecutionStatus::Completed;
        self.end_time = Some(Utc::now());
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        self.status = ExecutionStatus::Failed;
        self.error_message = Some(message.into());
        self.end_time = Some(Utc::now());
    }

    /// True if `step_id` has a recorded result with `success == true`.
    pub fn succeeded(&self, step_id: &str) -> bool {
        self.step_results
            .get(step_id)
            .map(|r| r.success)
            .unwrap_or(false)
    }

    pub fn result(&self, step_id: &str) -> Option<&ProxyResponse> {
        self.step_results.get(step_id)
    }
}
