//! Error types shared by the MCP server and client

use crate::jsonrpc::{error_codes, JsonRpcError};
use thiserror::Error;

/// General MCP error type
#[derive(Debug, Error)]
pub enum McpError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("MCP error {code}: {message}")]
    Protocol { code: i64, message: String },

    #[error("Unknown tool: {0}")]
    ToolNotFound(String),

    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    #[error("Unknown prompt: {0}")]
    PromptNotFound(String),

    #[error("Invalid params: {0}")]
    InvalidParams(String),

    #[error("Upstream service error: {0}")]
    Upstream(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl McpError {
    /// JSON-RPC error code for this error
    pub fn code(&self) -> i64 {
        match self {
            McpError::Protocol { code, .. } => *code,
            McpError::ToolNotFound(_) | McpError::PromptNotFound(_) | McpError::InvalidParams(_) => {
                error_codes::INVALID_PARAMS
            }
            McpError::ResourceNotFound(_) => error_codes::RESOURCE_NOT_FOUND,
            _ => error_codes::INTERNAL_ERROR,
        }
    }

    /// Convert into the error object of a JSON-RPC response
    pub fn to_rpc_error(&self) -> JsonRpcError {
        let message = match self {
            McpError::Protocol { message, .. } => message.clone(),
            other => other.to_string(),
        };
        JsonRpcError::new(self.code(), message)
    }
}

impl From<JsonRpcError> for McpError {
    fn from(err: JsonRpcError) -> Self {
        McpError::Protocol {
            code: err.code,
            message: err.message,
        }
    }
}

pub type Result<T> = std::result::Result<T, McpError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_params_code() {
        let err = McpError::InvalidParams("latitude missing".to_string());
        assert_eq!(err.code(), -32602);
        assert!(err.to_rpc_error().message.contains("latitude missing"));
    }

    #[test]
    fn test_resource_not_found_code() {
        let err = McpError::ResourceNotFound("weather://nope".to_string());
        assert_eq!(err.to_rpc_error().code, -32002);
    }

    #[test]
    fn test_protocol_error_keeps_remote_message() {
        let err: McpError = JsonRpcError::new(-32601, "Method not found: foo").into();
        let rpc = err.to_rpc_error();
        assert_eq!(rpc.code, -32601);
        assert_eq!(rpc.message, "Method not found: foo");
    }

    #[test]
    fn test_serialization_failure_is_internal() {
        let err: McpError = serde_json::from_str::<serde_json::Value>("{").unwrap_err().into();
        assert_eq!(err.code(), -32603);
    }

    #[test]
    fn test_upstream_is_internal() {
        let err = McpError::Upstream("timeout".to_string());
        assert_eq!(err.code(), -32603);
        assert_eq!(err.to_string(), "Upstream service error: timeout");
    }
}
