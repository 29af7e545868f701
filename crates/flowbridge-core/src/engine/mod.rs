//! Workflow engine: sequential, dependency-checked step execution.
//!
//! # Architecture
//!
//! ```text
//! Vec<WorkflowStep> ──► WorkflowEngine::execute_workflow
//!                            │
//!              for each step │ 1. dependency check   (step_results)
//!                            │ 2. payload resolution (ReferenceResolver)
//!                            │ 3. proxy + token lookup (registry, RwLock)
//!                            │ 4. invoke, retry with backoff (retry)
//!                            ▼
//!                     WorkflowExecution { step_results, status, ... }
//! ```
//!
//! Steps run in list order; [`ordering::topological_order`] is available
//! for callers who want dependency order instead.

pub mod context;
pub mod executor;
pub mod ordering;
pub mod resolver;
pub mod retry;
pub mod stats;

pub use context::ExecutionContext;
pub use executor::{RegistryKey, WorkflowEngine};
pub use ordering::topological_order;
pub use resolver::ReferenceResolver;
pub use stats::{ExecutionSummary, StatsSnapshot};
