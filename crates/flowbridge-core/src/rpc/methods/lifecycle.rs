//! `initialize`: static server descriptor, no side effects.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::rpc::types::PROTOCOL_VERSION;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    #[serde(default)]
    pub protocol_version: Option<String>,
    #[serde(default)]
    pub client_info: Option<Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    pub protocol_version: &'static str,
    pub capabilities: Value,
    pub server_info: ServerInfo,
}

#[derive(Debug, Serialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

pub fn initialize(state: &AppState, params: InitializeParams) -> InitializeResult {
    tracing::info!(
        requested = params.protocol_version.as_deref().unwrap_or("none"),
        client = ?params.client_info,
        "bridge client initializing"
    );

    InitializeResult {
        protocol_version: PROTOCOL_VERSION,
        capabilities: json!({
            "tools": { "listChanged": false },
            "resources": { "subscribe": false, "listChanged": false }
        }),
        server_info: ServerInfo {
            name: state.bridge.server_name.clone(),
            version: state.bridge.server_version.clone(),
        },
    }
}
