pub mod document;
pub mod execution;
pub mod response;
pub mod step;

pub use document::{StepOrder, WorkflowDocument};
pub use execution::{ExecutionStatus, WorkflowExecution};
pub use response::{ProxyResponse, ResponseMetadata};
pub use step::{RetryPolicy, WorkflowStep};
