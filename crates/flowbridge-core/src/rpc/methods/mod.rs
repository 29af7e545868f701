//! JSON-RPC method implementations.
//!
//! Each sub-module exposes typed param/result structs and async handlers
//! that take `AppState` plus params.

pub mod lifecycle;
pub mod resources;
pub mod tools;
