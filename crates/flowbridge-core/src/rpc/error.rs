//! RPC error type and its JSON-RPC / HTTP mappings.

use super::types;
use crate::error::ServerError;

#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Method not found: {0}")]
    MethodNotFound(String),

    #[error("Invalid params: {0}")]
    InvalidParams(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl RpcError {
    pub fn code(&self) -> i64 {
        match self {
            RpcError::InvalidRequest(_) => types::INVALID_REQUEST,
            RpcError::MethodNotFound(_) => types::METHOD_NOT_FOUND,
            RpcError::InvalidParams(_) => types::INVALID_PARAMS,
            RpcError::Internal(_) => types::INTERNAL_ERROR,
        }
    }

    /// Internal errors carry the underlying message in `data`.
    pub fn to_response(&self, id: Option<serde_json::Value>) -> types::JsonRpcResponse {
        match self {
            RpcError::Internal(msg) => types::JsonRpcResponse::error_with_data(
                id,
                self.code(),
                "Internal error",
                serde_json::Value::String(msg.clone()),
            ),
            _ => types::JsonRpcResponse::error(id, self.code(), self.to_string()),
        }
    }
}

impl From<RpcError> for ServerError {
    fn from(err: RpcError) -> Self {
        match err {
            RpcError::InvalidRequest(msg) | RpcError::InvalidParams(msg) => ServerError::BadRequest(msg),
            RpcError::MethodNotFound(msg) => ServerError::NotFound(msg),
            RpcError::Internal(msg) => ServerError::Internal(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_internal_error_carries_data() {
        let response = RpcError::Internal("unknown resource: x://y".into()).to_response(Some(1.into()));
        let error = response.error.unwrap();
        assert_eq!(error.code, types::INTERNAL_ERROR);
        assert_eq!(error.message, "Internal error");
        assert_eq!(error.data.unwrap(), "unknown resource: x://y");
    }

    #[test]
    fn test_invalid_params_code() {
        let response = RpcError::InvalidParams("missing field `arguments`".into()).to_response(None);
        let error = response.error.unwrap();
        assert_eq!(error.code, -32602);
        assert!(error.data.is_none());
    }
}
