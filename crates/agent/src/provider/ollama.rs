//! Ollama chat API (non-streaming)

use super::{http_client, read_json, ModelConfig, ModelProvider, ProviderKind};
use crate::error::{AgentError, Result};
use crate::message::{tool_names_by_id, Block, Message, Role};
use crate::tools::ToolSpec;
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

pub const DEFAULT_OLLAMA_HOST: &str = "http://localhost:11434";
pub const DEFAULT_OLLAMA_MODEL: &str = "gpt-oss:120b";

pub struct OllamaModel {
    http: reqwest::Client,
    host: String,
    config: ModelConfig,
}

impl OllamaModel {
    pub fn new(host: impl Into<String>) -> Result<Self> {
        Ok(Self {
            http: http_client()?,
            host: host.into().trim_end_matches('/').to_string(),
            config: ModelConfig {
                provider: ProviderKind::Ollama,
                model_id: DEFAULT_OLLAMA_MODEL.to_string(),
                temperature: None,
                max_tokens: None,
            },
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub(crate) fn request_body(&self, system: &str, messages: &[Message], tools: &[ToolSpec]) -> Value {
        let mut body = json!({
            "model": self.config.model_id,
            "messages": wire_messages(system, messages),
            "stream": false,
        });

        if !tools.is_empty() {
            body["tools"] = tools
                .iter()
                .map(|t| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": t.name,
                            "description": t.description,
                            "parameters": t.input_schema,
                        }
                    })
                })
                .collect();
        }
        body
    }
}

fn wire_messages(system: &str, messages: &[Message]) -> Vec<Value> {
    let names = tool_names_by_id(messages);
    let mut wire = vec![json!({"role": "system", "content": system})];

    for message in messages {
        match message.role {
            Role::User => {
                let text = message.text();
                if !text.is_empty() {
                    wire.push(json!({"role": "user", "content": text}));
                }
                for block in &message.content {
                    if let Block::ToolResult { tool_use_id, content, .. } = block {
                        wire.push(json!({
                            "role": "tool",
                            "tool_name": names.get(tool_use_id.as_str()).copied().unwrap_or(tool_use_id.as_str()),
                            "content": content.join("\n"),
                        }));
                    }
                }
            }
            Role::Assistant => {
                let mut entry = json!({"role": "assistant", "content": message.text()});
                let calls: Vec<Value> = message
                    .tool_uses()
                    .into_iter()
                    .map(|(_, name, input)| json!({"function": {"name": name, "arguments": input}}))
                    .collect();
                if !calls.is_empty() {
                    entry["tool_calls"] = Value::Array(calls);
                }
                wire.push(entry);
            }
        }
    }

    wire
}

fn parse_reply(body: &Value) -> Result<Message> {
    let message = body
        .get("message")
        .ok_or_else(|| AgentError::invalid_response("Ollama", "response has no message"))?;

    let mut content = Vec::new();
    if let Some(text) = message["content"].as_str().filter(|t| !t.is_empty()) {
        content.push(Block::Text(text.to_string()));
    }
    for call in message["tool_calls"].as_array().into_iter().flatten() {
        let arguments = match &call["function"]["arguments"] {
            // some models return the arguments JSON-encoded
            Value::String(s) => serde_json::from_str(s).unwrap_or_else(|_| json!({})),
            Value::Null => json!({}),
            other => other.clone(),
        };
        content.push(Block::ToolUse {
            id: format!("ollama-{}", Uuid::new_v4().simple()),
            name: call["function"]["name"].as_str().unwrap_or_default().to_string(),
            input: arguments,
        });
    }

    Ok(Message::new(Role::Assistant, content))
}

#[async_trait]
impl ModelProvider for OllamaModel {
    fn config(&self) -> &ModelConfig {
        &self.config
    }

    fn set_model_id(&mut self, model_id: String) {
        self.config.model_id = model_id;
    }

    async fn converse(&self, system: &str, messages: &[Message], tools: &[ToolSpec]) -> Result<Message> {
        let url = format!("{}/api/chat", self.host);
        debug!(model = %self.config.model_id, host = %self.host, "Ollama request");

        let response = self
            .http
            .post(&url)
            .json(&self.request_body(system, messages, tools))
            .send()
            .await
            .map_err(|e| AgentError::provider("Ollama", e.to_string()))?;

        let body = read_json(ProviderKind::Ollama, response).await?;
        parse_reply(&body)
    }
}
