//! Google Gemini generateContent

use super::{http_client, read_json, ModelConfig, ModelProvider, ProviderKind, MAX_TOKENS, TEMPERATURE};
use crate::error::{AgentError, Result};
use crate::message::{tool_names_by_id, Block, Message, Role};
use crate::tools::ToolSpec;
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tracing::debug;
use uuid::Uuid;

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";

/// JSON Schema keywords the function-declaration schema rejects
const UNSUPPORTED_SCHEMA_KEYS: &[&str] = &["$schema", "additionalProperties", "$defs", "default", "title"];

pub struct GeminiModel {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    config: ModelConfig,
}

impl GeminiModel {
    pub fn new(api_key: String) -> Result<Self> {
        Ok(Self {
            http: http_client()?,
            api_key,
            base_url: GEMINI_BASE_URL.to_string(),
            config: ModelConfig {
                provider: ProviderKind::Gemini,
                model_id: DEFAULT_GEMINI_MODEL.to_string(),
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
            "systemInstruction": {"parts": [{"text": system}]},
            "contents": wire_contents(messages),
            "generationConfig": {
                "temperature": self.config.temperature,
                "maxOutputTokens": self.config.max_tokens,
            },
        });

        if !tools.is_empty() {
            let declarations: Vec<Value> = tools
                .iter()
                .map(|t| {
                    let mut declaration = json!({"name": t.name, "description": t.description});
                    if let Some(parameters) = parameters_schema(&t.input_schema) {
                        declaration["parameters"] = parameters;
                    }
                    declaration
                })
                .collect();
            body["tools"] = json!([{ "functionDeclarations": declarations }]);
        }
        body
    }
}

fn wire_contents(messages: &[Message]) -> Vec<Value> {
    let names = tool_names_by_id(messages);

    messages
        .iter()
        .map(|message| {
            let parts: Vec<Value> = message
                .content
                .iter()
                .map(|block| match block {
                    Block::Text(text) => json!({"text": text}),
                    Block::ToolUse { name, input, .. } => json!({"functionCall": {"name": name, "args": input}}),
                    Block::ToolResult {
                        tool_use_id, content, ..
                    } => json!({"functionResponse": {
                        "name": names.get(tool_use_id.as_str()).copied().unwrap_or(tool_use_id.as_str()),
                        "response": {"result": content.join("\n")},
                    }}),
                })
                .collect();
            let role = match message.role {
                Role::User => "user",
                Role::Assistant => "model",
            };
            json!({"role": role, "parts": parts})
        })
        .collect()
}

/// Strip unsupported keywords; objects without properties get no schema at all
fn parameters_schema(schema: &Value) -> Option<Value> {
    let has_properties = schema["properties"].as_object().is_some_and(|p| !p.is_empty());
    if schema["type"] == "object" && !has_properties {
        return None;
    }
    Some(strip_unsupported(schema))
}

fn strip_unsupported(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(k, _)| !UNSUPPORTED_SCHEMA_KEYS.contains(&k.as_str()))
                .map(|(k, v)| {
                    // "properties" maps names to schemas; a property may itself be called "title"
                    let v = if k == "properties" {
                        v.as_object()
                            .map(|props| {
                                Value::Object(
                                    props
                                        .iter()
                                        .map(|(name, s)| (name.clone(), strip_unsupported(s)))
                                        .collect::<Map<_, _>>(),
                                )
                            })
                            .unwrap_or_else(|| v.clone())
                    } else {
                        strip_unsupported(v)
                    };
                    (k.clone(), v)
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(strip_unsupported).collect()),
        other => other.clone(),
    }
}

fn parse_reply(body: &Value) -> Result<Message> {
    let candidate = body["candidates"]
        .get(0)
        .ok_or_else(|| AgentError::invalid_response("Gemini", "response has no candidates"))?;

    let mut content = Vec::new();
    for part in candidate["content"]["parts"].as_array().into_iter().flatten() {
        if let Some(text) = part["text"].as_str().filter(|t| !t.is_empty()) {
            content.push(Block::Text(text.to_string()));
        } else if let Some(call) = part.get("functionCall") {
            content.push(Block::ToolUse {
                id: call["id"]
                    .as_str()
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("gemini-{}", Uuid::new_v4().simple())),
                name: call["name"].as_str().unwrap_or_default().to_string(),
                input: call.get("args").cloned().unwrap_or_else(|| json!({})),
            });
        }
    }

    Ok(Message::new(Role::Assistant, content))
}

#[async_trait]
impl ModelProvider for GeminiModel {
    fn config(&self) -> &ModelConfig {
        &self.config
    }

    fn set_model_id(&mut self, model_id: String) {
        self.config.model_id = model_id;
    }

    async fn converse(&self, system: &str, messages: &[Message], tools: &[ToolSpec]) -> Result<Message> {
        let url = format!("{}/v1beta/models/{}:generateContent", self.base_url, self.config.model_id);
        debug!(model = %self.config.model_id, messages = messages.len(), "Gemini request");

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&self.request_body(system, messages, tools))
            .send()
            .await
            .map_err(|e| AgentError::provider("Gemini", e.to_string()))?;

        let body = read_json(ProviderKind::Gemini, response).await?;
        parse_reply(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::ToolStatus;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_request_body_maps_roles_and_results() {
        let model = GeminiModel::new("g-key".into()).unwrap();
        let messages = vec![
            Message::user("Forecast for NYC"),
            Message::new(
                Role::Assistant,
                vec![Block::ToolUse {
                    id: "gemini-1".into(),
                    name: "weather__get_forecast".into(),
                    input: json!({"latitude": 40.7, "longitude": -74.0}),
                }],
            ),
            Message::new(
                Role::User,
                vec![Block::ToolResult {
                    tool_use_id: "gemini-1".into(),
                    status: ToolStatus::Success,
                    content: vec!["Tonight: clear".into()],
                }],
            ),
        ];

        let body = model.request_body("sys", &messages, &[]);

        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "sys");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 2048);
        assert_eq!(body["contents"][1]["role"], "model");
        assert_eq!(
            body["contents"][2]["parts"][0]["functionResponse"],
            json!({"name": "weather__get_forecast", "response": {"result": "Tonight: clear"}})
        );
        assert!(body.get("tools").is_none());
    }

    #[test]
    fn test_schema_sanitising() {
        let schema = json!({
            "type": "object",
            "$schema": "http://json-schema.org/draft-07/schema#",
            "additionalProperties": false,
            "properties": {
                "title": {"type": "string", "title": "Title"},
                "count": {"type": "integer", "default": 1}
            }
        });

        let cleaned = parameters_schema(&schema).unwrap();
        assert_eq!(
            cleaned,
            json!({
                "type": "object",
                "properties": {
                    "title": {"type": "string"},
                    "count": {"type": "integer"}
                }
            })
        );
    }

    #[test]
    fn test_empty_object_schema_is_omitted() {
        assert!(parameters_schema(&json!({"type": "object", "properties": {}})).is_none());
        assert!(parameters_schema(&json!({"type": "object"})).is_none());
    }

    #[tokio::test]
    async fn test_converse_function_call() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-2.5-flash:generateContent"))
            .and(header("x-goog-api-key", "g-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{"content": {"role": "model", "parts": [
                    {"text": "Let me check."},
                    {"functionCall": {"name": "calculator", "args": {"expression": "6*7"}}}
                ]}}]
            })))
            .mount(&server)
            .await;

        let model = GeminiModel::new("g-key".into()).unwrap().with_base_url(server.uri());
        let reply = model.converse("s", &[Message::user("6*7?")], &[]).await.unwrap();

        assert_eq!(reply.text(), "Let me check.");
        let uses = reply.tool_uses();
        assert_eq!(uses[0].1, "calculator");
        assert!(uses[0].0.starts_with("gemini-"));
    }

    #[tokio::test]
    async fn test_converse_error_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": {"code": 400, "message": "API key not valid", "status": "INVALID_ARGUMENT"}
            })))
            .mount(&server)
            .await;

        let model = GeminiModel::new("nope".into()).unwrap().with_base_url(server.uri());
        let err = model.converse("s", &[Message::user("hi")], &[]).await.unwrap_err();
        assert!(err.to_string().contains("API key not valid"));
    }
}
