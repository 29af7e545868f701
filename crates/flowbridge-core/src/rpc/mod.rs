//! Transport-agnostic JSON-RPC 2.0 bridge over the workflow engine.
//!
//! Exposes registered service functions as MCP-style tools and resources.
//! It has no HTTP dependency so the same router serves every transport:
//!
//! - **stdio**: newline-delimited JSON via [`transport::serve_lines`]
//! - **WebSocket**: `GET /api/mcp/ws` in `flowbridge-server`
//! - **HTTP shim**: `POST /api/mcp` and the `/api/mcp/tools*` endpoints
//!
//! # Example
//!
//! ```ignore
//! use flowbridge_core::rpc::RpcRouter;
//!
//! let router = RpcRouter::new(app_state);
//! let response = router.handle_request(r#"{
//!     "jsonrpc": "2.0",
//!     "id": 1,
//!     "method": "tools/call",
//!     "params": { "name": "gmail.send_message", "arguments": { "access_token": "t", "to": "a@example.com" } }
//! }"#).await;
//! ```

pub mod connection;
pub mod error;
pub mod methods;
pub mod router;
pub mod transport;
pub mod types;

pub use connection::{ConnectionGuard, ConnectionInfo, ConnectionRegistry, Transport};
pub use error::RpcError;
pub use router::RpcRouter;
pub use transport::serve_lines;
pub use types::{JsonRpcRequest, JsonRpcResponse};
