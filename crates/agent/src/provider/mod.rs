//! Language-model providers

mod gemini;
mod ollama;
mod openai;

pub use gemini::{GeminiModel, DEFAULT_GEMINI_MODEL, GEMINI_BASE_URL};
pub use ollama::{OllamaModel, DEFAULT_OLLAMA_HOST, DEFAULT_OLLAMA_MODEL};
pub use openai::{OpenAiModel, DEFAULT_OPENAI_MODEL, OPENAI_BASE_URL};

use crate::error::{AgentError, Result};
use crate::message::Message;
use crate::tools::ToolSpec;
use async_trait::async_trait;
use reqwest::Response;
use serde_json::Value;
use std::str::FromStr;
use std::time::Duration;

pub(crate) const TEMPERATURE: f64 = 0.3;
pub(crate) const MAX_TOKENS: u32 = 2048;
pub(crate) const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    OpenAi,
    Gemini,
    Ollama,
}

impl ProviderKind {
    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => DEFAULT_OPENAI_MODEL,
            ProviderKind::Gemini => DEFAULT_GEMINI_MODEL,
            ProviderKind::Ollama => DEFAULT_OLLAMA_MODEL,
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderKind::OpenAi => write!(f, "OpenAI"),
            ProviderKind::Gemini => write!(f, "Gemini"),
            ProviderKind::Ollama => write!(f, "Ollama"),
        }
    }
}

impl FromStr for ProviderKind {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAi),
            "gemini" | "google" => Ok(ProviderKind::Gemini),
            "ollama" => Ok(ProviderKind::Ollama),
            _ => Err(AgentError::UnknownProvider(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfig {
    pub provider: ProviderKind,
    pub model_id: String,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
}

#[async_trait]
pub trait ModelProvider: Send + Sync {
    fn config(&self) -> &ModelConfig;

    fn set_model_id(&mut self, model_id: String);

    /// One model turn. The reply is an assistant message that may request tools.
    async fn converse(&self, system: &str, messages: &[Message], tools: &[ToolSpec]) -> Result<Message>;
}

/// Build a provider from environment keys (`OPENAI_API_KEY`, `GOOGLE_API_KEY`, `OLLAMA_HOST`)
pub fn provider_from_env(kind: ProviderKind, model_id: Option<String>) -> Result<Box<dyn ModelProvider>> {
    let mut provider: Box<dyn ModelProvider> = match kind {
        ProviderKind::OpenAi => Box::new(OpenAiModel::new(api_key("OPENAI_API_KEY")?)?),
        ProviderKind::Gemini => Box::new(GeminiModel::new(api_key("GOOGLE_API_KEY")?)?),
        ProviderKind::Ollama => {
            let host = std::env::var("OLLAMA_HOST")
                .ok()
                .filter(|h| !h.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_OLLAMA_HOST.to_string());
            Box::new(OllamaModel::new(host)?)
        }
    };

    if let Some(model_id) = model_id {
        provider.set_model_id(model_id);
    }
    Ok(provider)
}

fn api_key(name: &'static str) -> Result<String> {
    std::env::var(name)
        .ok()
        .filter(|k| !k.trim().is_empty())
        .ok_or(AgentError::MissingApiKey(name))
}

pub(crate) fn http_client() -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?)
}

/// Parse a provider response, turning non-2xx into a provider error with the API's message
pub(crate) async fn read_json(provider: ProviderKind, response: Response) -> Result<Value> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        let detail = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| {
                v["error"]["message"]
                    .as_str()
                    .or_else(|| v["error"].as_str())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| body.trim().to_string());
        return Err(AgentError::provider(provider.to_string(), format!("HTTP {}: {}", status, detail)));
    }

    serde_json::from_str(&body).map_err(|e| AgentError::invalid_response(provider.to_string(), e.to_string()))
}
