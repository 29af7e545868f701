//! Flowbridge Core: transport-agnostic workflow engine and protocol bridge.
//!
//! This crate contains the domain types, the `ServiceProxy` contract, the
//! step-by-step workflow engine, and the JSON-RPC bridge that exposes the
//! engine as tools and resources. It has **no HTTP framework dependency** by
//! default, making it suitable for use in:
//!
//! - HTTP/WebSocket servers (via `flowbridge-server`)
//! - CLI tools and stdio protocol servers (via `flowbridge-cli`)
//! - Embedding in other applications
//!
//! # Feature Flags
//!
//! - `axum`: Enables `IntoResponse` impl on `ServerError` for use in axum handlers.

pub mod engine;
pub mod error;
pub mod models;
pub mod proxy;
pub mod rpc;
pub mod state;

// Convenience re-exports
pub use engine::{ExecutionContext, WorkflowEngine};
pub use error::{EngineError, ErrorCode, ProxyError, ServerError, WorkflowFailure};
pub use models::{ProxyResponse, RetryPolicy, WorkflowExecution, WorkflowStep};
pub use proxy::ServiceProxy;
pub use state::{AppState, AppStateInner, BridgeConfig};
