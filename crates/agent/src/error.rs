//! Agent error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("{0} is not set; add it to your .env file")]
    MissingApiKey(&'static str),

    #[error("Unknown provider '{0}' (expected openai, gemini or ollama)")]
    UnknownProvider(String),

    #[error("{provider} request failed: {message}")]
    Provider { provider: String, message: String },

    #[error("{provider} returned an unexpected response: {message}")]
    InvalidResponse { provider: String, message: String },

    #[error("Agent stopped after {0} model calls without a final answer")]
    MaxIterations(usize),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("MCP error: {0}")]
    Mcp(#[from] shared::McpError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AgentError {
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        AgentError::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn invalid_response(provider: impl Into<String>, message: impl Into<String>) -> Self {
        AgentError::InvalidResponse {
            provider: provider.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AgentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_key_message() {
        let err = AgentError::MissingApiKey("OPENAI_API_KEY");
        assert_eq!(err.to_string(), "OPENAI_API_KEY is not set; add it to your .env file");
    }

    #[test]
    fn test_from_mcp_error() {
        let err: AgentError = shared::McpError::ToolNotFound("x".into()).into();
        assert!(matches!(err, AgentError::Mcp(_)));
    }
}
