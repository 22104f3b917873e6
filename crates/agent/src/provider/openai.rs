//! OpenAI chat completions

use super::{http_client, read_json, ModelConfig, ModelProvider, ProviderKind, MAX_TOKENS, TEMPERATURE};
use crate::error::{AgentError, Result};
use crate::message::{Block, Message, Role};
use crate::tools::ToolSpec;
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

pub struct OpenAiModel {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    config: ModelConfig,
}

impl OpenAiModel {
    pub fn new(api_key: String) -> Result<Self> {
        Ok(Self {
            http: http_client()?,
            api_key,
            base_url: OPENAI_BASE_URL.to_string(),
            config: ModelConfig {
                provider: ProviderKind::OpenAi,
                model_id: DEFAULT_OPENAI_MODEL.to_string(),
                temperature: Some(TEMPERATURE),
                max_tokens: Some(MAX_TOKENS),
            },
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub(crate) fn request_body(&self, system: &str, messages: &[Message], tools: &[ToolSpec]) -> Value {
        let mut body = json!({
            "model": self.config.model_id,
            "messages": wire_messages(system, messages),
            "temperature": self.config.temperature,
            "max_tokens": self.config.max_tokens,
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
                            "tool_call_id": tool_use_id,
                            "content": content.join("\n"),
                        }));
                    }
                }
            }
            Role::Assistant => {
                let text = message.text();
                let mut entry = json!({
                    "role": "assistant",
                    "content": if text.is_empty() { Value::Null } else { Value::String(text) },
                });
                let calls: Vec<Value> = message
                    .tool_uses()
                    .into_iter()
                    .map(|(id, name, input)| {
                        json!({
                            "id": id,
                            "type": "function",
                            "function": {"name": name, "arguments": input.to_string()},
                        })
                    })
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
    let message = body["choices"]
        .get(0)
        .map(|c| &c["message"])
        .ok_or_else(|| AgentError::invalid_response("OpenAI", "response has no choices"))?;

    let mut content = Vec::new();
    if let Some(text) = message["content"].as_str().filter(|t| !t.is_empty()) {
        content.push(Block::Text(text.to_string()));
    }
    for call in message["tool_calls"].as_array().into_iter().flatten() {
        let arguments = call["function"]["arguments"].as_str().unwrap_or("{}");
        content.push(Block::ToolUse {
            id: call["id"].as_str().unwrap_or_default().to_string(),
            name: call["function"]["name"].as_str().unwrap_or_default().to_string(),
            input: serde_json::from_str(arguments).unwrap_or_else(|_| json!({})),
        });
    }

    Ok(Message::new(Role::Assistant, content))
}

#[async_trait]
impl ModelProvider for OpenAiModel {
    fn config(&self) -> &ModelConfig {
        &self.config
    }

    fn set_model_id(&mut self, model_id: String) {
        self.config.model_id = model_id;
    }

    async fn converse(&self, system: &str, messages: &[Message], tools: &[ToolSpec]) -> Result<Message> {
        let url = format!("{}/chat/completions", self.base_url);
        debug!(model = %self.config.model_id, messages = messages.len(), "OpenAI request");

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&self.request_body(system, messages, tools))
            .send()
            .await
            .map_err(|e| AgentError::provider("OpenAI", e.to_string()))?;

        let body = read_json(ProviderKind::OpenAi, response).await?;
        parse_reply(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::ToolStatus;
    use wiremock::matchers::{bearer_token, body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn calculator_spec() -> ToolSpec {
        ToolSpec::new("calculator", "Evaluate", json!({"type": "object"}))
    }

    #[test]
    fn test_request_body_shape() {
        let model = OpenAiModel::new("sk-test".into()).unwrap();
        let messages = vec![
            Message::user("What is 2+2?"),
            Message::new(
                Role::Assistant,
                vec![Block::ToolUse {
                    id: "call_1".into(),
                    name: "calculator".into(),
                    input: json!({"expression": "2+2"}),
                }],
            ),
            Message::new(
                Role::User,
                vec![Block::ToolResult {
                    tool_use_id: "call_1".into(),
                    status: ToolStatus::Success,
                    content: vec!["Result: 4".into()],
                }],
            ),
        ];

        let body = model.request_body("Be brief", &messages, &[calculator_spec()]);

        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["max_tokens"], 2048);
        assert_eq!(body["messages"][0], json!({"role": "system", "content": "Be brief"}));
        assert_eq!(body["messages"][2]["content"], Value::Null);
        assert_eq!(body["messages"][2]["tool_calls"][0]["function"]["arguments"], "{\"expression\":\"2+2\"}");
        assert_eq!(
            body["messages"][3],
            json!({"role": "tool", "tool_call_id": "call_1", "content": "Result: 4"})
        );
        assert_eq!(body["tools"][0]["function"]["name"], "calculator");
    }

    #[test]
    fn test_no_tools_key_without_tools() {
        let model = OpenAiModel::new("sk-test".into()).unwrap();
        let body = model.request_body("s", &[Message::user("hi")], &[]);
        assert!(body.get("tools").is_none());
    }

    #[tokio::test]
    async fn test_converse_parses_tool_calls() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(bearer_token("sk-test"))
            .and(body_partial_json(json!({"model": "gpt-4o-mini"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_9",
                        "type": "function",
                        "function": {"name": "weather__get_forecast", "arguments": "{\"latitude\":40.7,\"longitude\":-74}"}
                    }]
                }}]
            })))
            .mount(&server)
            .await;

        let model = OpenAiModel::new("sk-test".into()).unwrap().with_base_url(server.uri());
        let reply = model.converse("s", &[Message::user("weather?")], &[]).await.unwrap();

        assert_eq!(reply.role, Role::Assistant);
        let uses = reply.tool_uses();
        assert_eq!(uses[0].0, "call_9");
        assert_eq!(uses[0].1, "weather__get_forecast");
        assert_eq!(uses[0].2["latitude"], 40.7);
    }

    #[tokio::test]
    async fn test_converse_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": {"message": "Incorrect API key provided"}
            })))
            .mount(&server)
            .await;

        let model = OpenAiModel::new("bad".into()).unwrap().with_base_url(server.uri());
        let err = model.converse("s", &[Message::user("hi")], &[]).await.unwrap_err();

        assert!(matches!(err, AgentError::Provider { .. }));
        assert!(err.to_string().contains("Incorrect API key provided"));
    }

    mod edge_cases {
        use super::*;

        #[test]
        fn test_bad_arguments_become_empty_object() {
            let reply = parse_reply(&json!({"choices": [{"message": {
                "content": "ok",
                "tool_calls": [{"id": "c", "function": {"name": "t", "arguments": "not json"}}]
            }}]}))
            .unwrap();

            assert_eq!(reply.text(), "ok");
            assert_eq!(reply.tool_uses()[0].2, &json!({}));
        }

        #[test]
        fn test_no_choices() {
            assert!(parse_reply(&json!({"choices": []})).is_err());
        }
    }
}
