//! Sandbox services: in-memory stand-ins for a workspace suite.
//!
//! Registered by `flowbridge server --sandbox` so the tool catalog and
//! end-to-end workflows can be exercised without real credentials. Every
//! mutating function echoes its payload and returns a generated id.

use std::sync::Arc;

use serde_json::json;

use super::memory::{InMemoryServiceProxy, Outcome};
use super::FunctionSpec;
use crate::engine::WorkflowEngine;

pub fn gmail() -> InMemoryServiceProxy {
    InMemoryServiceProxy::new("gmail")
        .with_display("Gmail", "Send, draft and read email messages")
        .function(
            FunctionSpec::new("send_message", "Send an email message")
                .require(["to", "subject", "body"]),
            Outcome::echo("message_id", "msg"),
        )
        .function(
            FunctionSpec::new("create_draft", "Create a draft without sending it")
                .require(["to", "subject", "body"]),
            Outcome::echo("draft_id", "draft"),
        )
        .function(
            FunctionSpec::new("get_message", "Fetch a message by id").require(["message_id"]),
            Outcome::data(json!({
                "message_id": "msg_sandbox",
                "thread_id": "thread_sandbox",
                "subject": "Welcome to the sandbox",
                "snippet": "This message was generated locally."
            })),
        )
        .function(
            FunctionSpec::new("list_messages", "List recent messages"),
            Outcome::data(json!({ "messages": [], "result_size_estimate": 0 })),
        )
}

pub fn docs() -> InMemoryServiceProxy {
    InMemoryServiceProxy::new("docs")
        .with_display("Docs", "Create and edit documents")
        .function(
            FunctionSpec::new("create_document", "Create a new document").require(["title"]),
            Outcome::echo("document_id", "doc"),
        )
        .function(
            FunctionSpec::new("append_text", "Append text to a document")
                .require(["document_id", "text"]),
            Outcome::echo("revision_id", "rev"),
        )
        .function(
            FunctionSpec::new("get_document", "Fetch a document").require(["document_id"]),
            Outcome::data(json!({
                "document_id": "doc_sandbox",
                "title": "Sandbox document",
                "body": ""
            })),
        )
}

pub fn drive() -> InMemoryServiceProxy {
    InMemoryServiceProxy::new("drive")
        .with_display("Drive", "Store and share files")
        .function(
            FunctionSpec::new("upload_file", "Upload a file").require(["name", "content"]),
            Outcome::echo("file_id", "file"),
        )
        .function(
            FunctionSpec::new("share_file", "Share a file with a user")
                .require(["file_id", "email"]),
            Outcome::echo("permission_id", "perm"),
        )
        .function(
            FunctionSpec::new("list_files", "List files"),
            Outcome::data(json!({ "files": [] })),
        )
}

pub fn calendar() -> InMemoryServiceProxy {
    InMemoryServiceProxy::new("calendar")
        .with_display("Calendar", "Schedule and list events")
        .function(
            FunctionSpec::new("create_event", "Create a calendar event")
                .require(["summary", "start", "end"]),
            Outcome::echo("event_id", "evt"),
        )
        .function(
            FunctionSpec::new("list_events", "List upcoming events"),
            Outcome::data(json!({ "events": [] })),
        )
}

/// Register gmail, docs, drive and calendar sandbox proxies under `provider`.
pub async fn register_sandbox_services(engine: &WorkflowEngine, provider: &str) {
    engine
        .register_service_proxy(provider, "gmail", Arc::new(gmail()))
        .await;
    engine
        .register_service_proxy(provider, "docs", Arc::new(docs()))
        .await;
    engine
        .register_service_proxy(provider, "drive", Arc::new(drive()))
        .await;
    engine
        .register_service_proxy(provider, "calendar", Arc::new(calendar()))
        .await;
    tracing::info!(provider, "registered sandbox services");
}
