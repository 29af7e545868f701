//! Resource methods.
//!
//! - `{provider}://{service}/functions`: function metadata of one service
//! - `flowbridge://executions/status`: engine counters and live connections

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::rpc::error::RpcError;
use crate::rpc::types::{Resource, ResourceContents};
use crate::state::AppState;

pub const EXECUTION_STATUS_URI: &str = "flowbridge://executions/status";

const JSON_MIME: &str = "application/json";

#[derive(Debug, Serialize)]
pub struct ListResult {
    pub resources: Vec<Resource>,
}

pub async fn list(state: &AppState) -> Result<ListResult, RpcError> {
    let catalog = state.engine.catalog().await;
    let mut resources: Vec<Resource> = catalog
        .iter()
        .flat_map(|(provider, services)| {
            services.iter().map(move |(service, descriptor)| {
                let display = if descriptor.name.is_empty() {
                    service.as_str()
                } else {
                    descriptor.name.as_str()
                };
                Resource {
                    uri: functions_uri(provider, service),
                    name: format!("{} functions", display),
                    description: format!("Functions offered by {} ({})", service, provider),
                    mime_type: JSON_MIME.to_string(),
                }
            })
        })
        .collect();

    resources.push(Resource {
        uri: EXECUTION_STATUS_URI.to_string(),
        name: "Execution status".to_string(),
        description: "Workflow execution counters and open bridge connections".to_string(),
        mime_type: JSON_MIME.to_string(),
    });

    Ok(ListResult { resources })
}

pub fn functions_uri(provider: &str, service: &str) -> String {
    format!("{}://{}/functions", provider, service)
}

fn parse_functions_uri(uri: &str) -> Option<(&str, &str)> {
    let (provider, rest) = uri.split_once("://")?;
    let service = rest.strip_suffix("/functions")?;
    (!provider.is_empty() && !service.is_empty() && !service.contains('/')).then_some((provider, service))
}

#[derive(Debug, Deserialize)]
pub struct ReadParams {
    pub uri: String,
}

#[derive(Debug, Serialize)]
pub struct ReadResult {
    pub contents: Vec<ResourceContents>,
}

pub async fn read(state: &AppState, params: ReadParams) -> Result<ReadResult, RpcError> {
    let body = if params.uri == EXECUTION_STATUS_URI {
        execution_status(state).await
    } else {
        let (provider, service) = parse_functions_uri(&params.uri)
            .ok_or_else(|| RpcError::Internal(format!("unknown resource: {}", params.uri)))?;
        let proxy = state
            .engine
            .service_proxy(provider, service)
            .await
            .ok_or_else(|| RpcError::Internal(format!("unknown resource: {}", params.uri)))?;

        let mut body = proxy.descriptor().to_catalog_json();
        body["provider"] = json!(provider);
        body["service"] = json!(service);
        body
    };

    let text = serde_json::to_string_pretty(&body)
        .map_err(|e| RpcError::Internal(format!("serialize resource: {}", e)))?;

    Ok(ReadResult {
        contents: vec![ResourceContents {
            uri: params.uri,
            mime_type: JSON_MIME.to_string(),
            text,
        }],
    })
}

async fn execution_status(state: &AppState) -> serde_json::Value {
    let mut providers: Vec<String> = state.engine.supported_providers().await.into_iter().collect();
    providers.sort();

    json!({
        "executions": state.engine.stats(),
        "connections": {
            "active": state.connections.len(),
            "open": state.connections.snapshot(),
        },
        "providers": providers,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_functions_uri() {
        assert_eq!(parse_functions_uri("workspace://gmail/functions"), Some(("workspace", "gmail")));
        assert_eq!(parse_functions_uri("workspace://gmail"), None);
        assert_eq!(parse_functions_uri("://gmail/functions"), None);
        assert_eq!(parse_functions_uri("workspace://a/b/functions"), None);
        assert_eq!(parse_functions_uri(&functions_uri("p", "s")), Some(("p", "s")));
    }
}
