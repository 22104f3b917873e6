//! Rhino.Compute HTTP client

use reqwest::RequestBuilder;
use serde::Serialize;
use serde_json::Value;
use shared::{McpError, Result};
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_COMPUTE_URL: &str = "http://localhost:6500/";
pub const API_KEY_HEADER: &str = "RhinoComputeKey";

pub(crate) const QUERY_TIMEOUT: Duration = Duration::from_secs(5);
pub(crate) const IO_TIMEOUT: Duration = Duration::from_secs(10);
pub(crate) const SOLVE_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone)]
pub struct ComputeClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl ComputeClient {
    pub fn new(base_url: &str, api_key: Option<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| McpError::Config(format!("Failed to build HTTP client: {}", e)))?;

        let mut base_url = base_url.to_string();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }

        Ok(Self { http, base_url, api_key })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn get(&self, endpoint: &str, timeout: Duration) -> Result<Value> {
        let request = self.http.get(self.url(endpoint)).timeout(timeout);
        self.send(endpoint, request).await
    }

    pub async fn post<B: Serialize + ?Sized>(&self, endpoint: &str, body: &B, timeout: Duration) -> Result<Value> {
        let request = self.http.post(self.url(endpoint)).timeout(timeout).json(body);
        self.send(endpoint, request).await
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    async fn send(&self, endpoint: &str, mut request: RequestBuilder) -> Result<Value> {
        if let Some(key) = &self.api_key {
            request = request.header(API_KEY_HEADER, key);
        }

        debug!(endpoint = %endpoint, "Rhino.Compute request");
        let response = request.send().await.map_err(upstream)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(McpError::Upstream(format!("HTTP {}: {}", status, body.trim())));
        }
        response.json::<Value>().await.map_err(upstream)
    }
}

fn upstream(e: reqwest::Error) -> McpError {
    McpError::Upstream(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let client = ComputeClient::new("http://localhost:6500", None).unwrap();
        assert_eq!(client.base_url(), "http://localhost:6500/");
    }

    #[tokio::test]
    async fn test_api_key_header() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/version"))
            .and(header(API_KEY_HEADER, "secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"rhino": "8.0"})))
            .mount(&server)
            .await;

        let client = ComputeClient::new(&server.uri(), Some("secret".to_string())).unwrap();
        let body = client.get("version", QUERY_TIMEOUT).await.unwrap();
        assert_eq!(body["rhino"], "8.0");
    }

    #[tokio::test]
    async fn test_http_error_is_upstream() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("solver crashed"))
            .mount(&server)
            .await;

        let client = ComputeClient::new(&server.uri(), None).unwrap();
        let err = client.post("grasshopper", &json!({}), SOLVE_TIMEOUT).await.unwrap_err();
        assert!(matches!(err, McpError::Upstream(ref m) if m.contains("solver crashed")));
    }
}
