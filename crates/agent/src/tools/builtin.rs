//! Built-in tools: clock and HTTP

use super::{AgentTool, ToolOutcome, ToolSpec};
use async_trait::async_trait;
use chrono::{Local, SecondsFormat, Utc};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::time::Duration;
use tracing::debug;

/// Response bodies longer than this are cut
pub const MAX_BODY_CHARS: usize = 10_000;

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

pub struct CurrentTimeTool;

#[async_trait]
impl AgentTool for CurrentTimeTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec::new(
            "current_time",
            "Get the current date and time in ISO 8601 format.",
            json!({
                "type": "object",
                "properties": {
                    "timezone": {
                        "type": "string",
                        "enum": ["UTC", "local"],
                        "description": "UTC (default) or the machine's local time"
                    }
                }
            }),
        )
    }

    async fn invoke(&self, input: Value) -> ToolOutcome {
        let timezone = input.get("timezone").and_then(Value::as_str).unwrap_or("UTC");

        if timezone.eq_ignore_ascii_case("utc") {
            ToolOutcome::success(Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true))
        } else if timezone.eq_ignore_ascii_case("local") {
            ToolOutcome::success(Local::now().to_rfc3339_opts(SecondsFormat::Secs, false))
        } else {
            ToolOutcome::error(format!("Unsupported timezone '{}': use UTC or local", timezone))
        }
    }
}

#[derive(Debug, Deserialize)]
struct HttpRequestInput {
    #[serde(default = "default_method")]
    method: String,
    url: String,
    #[serde(default)]
    headers: Map<String, Value>,
    #[serde(default)]
    body: Option<Value>,
}

fn default_method() -> String {
    "GET".to_string()
}

pub struct HttpRequestTool {
    http: reqwest::Client,
}

impl Default for HttpRequestTool {
    fn default() -> Self {
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self { http }
    }
}

impl HttpRequestTool {
    async fn send(&self, input: HttpRequestInput) -> Result<(u16, String), String> {
        let method = Method::from_bytes(input.method.to_uppercase().as_bytes())
            .map_err(|_| format!("Invalid HTTP method '{}'", input.method))?;

        let mut headers = HeaderMap::new();
        for (key, value) in &input.headers {
            let value = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            let name = HeaderName::from_bytes(key.as_bytes()).map_err(|_| format!("Invalid header name '{}'", key))?;
            let value = HeaderValue::from_str(&value).map_err(|_| format!("Invalid value for header '{}'", key))?;
            headers.insert(name, value);
        }

        let mut request = self.http.request(method, &input.url).headers(headers);
        request = match input.body {
            Some(Value::String(s)) => request.body(s),
            Some(Value::Null) | None => request,
            Some(other) => request.json(&other),
        };

        debug!(url = %input.url, "http_request tool");
        let response = request.send().await.map_err(|e| format!("Request failed: {}", e))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| format!("Failed to read response body: {}", e))?;
        Ok((status, body))
    }
}

/// Cut to `max` characters on a char boundary
pub(crate) fn truncate_chars(text: &str, max: usize) -> (String, bool) {
    match text.char_indices().nth(max) {
        Some((idx, _)) => (text[..idx].to_string(), true),
        None => (text.to_string(), false),
    }
}

#[async_trait]
impl AgentTool for HttpRequestTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec::new(
            "http_request",
            "Make an HTTP request and return the status code and response body.",
            json!({
                "type": "object",
                "properties": {
                    "method": {"type": "string", "description": "HTTP method (default GET)"},
                    "url": {"type": "string", "description": "Absolute URL"},
                    "headers": {"type": "object", "description": "Request headers"},
                    "body": {"type": "string", "description": "Request body"}
                },
                "required": ["url"]
            }),
        )
    }

    async fn invoke(&self, input: Value) -> ToolOutcome {
        let input: HttpRequestInput = match serde_json::from_value(input) {
            Ok(i) => i,
            Err(e) => return ToolOutcome::error(format!("Invalid input: {}", e)),
        };

        match self.send(input).await {
            Ok((status, body)) => {
                let (body, truncated) = truncate_chars(&body, MAX_BODY_CHARS);
                let mut text = format!("Status: {}\n\n{}", status, body);
                if truncated {
                    text.push_str(&format!("\n\n[truncated to {} characters]", MAX_BODY_CHARS));
                }
                if (200..400).contains(&status) {
                    ToolOutcome::success(text)
                } else {
                    ToolOutcome::error(text)
                }
            }
            Err(message) => ToolOutcome::error(message),
        }
    }
}
