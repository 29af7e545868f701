//! In-memory execution counters for the status resource.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{ExecutionStatus, WorkflowExecution};

#[derive(Debug, Clone, Serialize)]
pub struct ExecutionSummary {
    pub id: String,
    pub status: ExecutionStatus,
    pub steps: usize,
    pub completed_steps: usize,
    pub start_time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl From<&WorkflowExecution> for ExecutionSummary {
    fn from(execution: &WorkflowExecution) -> Self {
        Self {
            id: execution.id.clone(),
            status: execution.status,
            steps: execution.steps.len(),
            completed_steps: execution.step_results.values().filter(|r| r.success).count(),
            start_time: execution.start_time,
            end_time: execution.end_time,
            error_message: execution.error_message.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    pub started: u64,
    pub completed: u64,
    pub failed: u64,
    pub running: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_execution: Option<ExecutionSummary>,
}

#[derive(Debug, Default)]
pub(crate) struct EngineStats {
    started: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    last: Mutex<Option<ExecutionSummary>>,
}

impl EngineStats {
    pub(crate) fn record_start(&self) {
        self.started.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_finish(&self, execution: &WorkflowExecution) {
        match execution.status {
            ExecutionStatus::Completed => self.completed.fetch_add(1, Ordering::Relaxed),
            ExecutionStatus::Failed => self.failed.fetch_add(1, Ordering::Relaxed),
            ExecutionStatus::Running => return,
        };
        *self.last.lock().unwrap_or_else(PoisonError::into_inner) =
            Some(ExecutionSummary::from(execution));
    }

    pub(crate) fn snapshot(&self) -> StatsSnapshot {
        let started = self.started.load(Ordering::Relaxed);
        let completed = self.completed.load(Ordering::Relaxed);
        let failed = self.failed.load(Ordering::Relaxed);
        StatsSnapshot {
            started,
            completed,
            failed,
            running: started.saturating_sub(completed + failed),
            last_execution: self
                .last
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone(),
        }
    }
}
