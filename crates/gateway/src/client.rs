//! McpHttpClient - streamable HTTP client for one MCP server

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use shared::{
    CallToolResult, GetPromptResult, Implementation, InitializeResult, JsonRpcRequest, JsonRpcResponse,
    ListPromptsResult, ListResourcesResult, ListToolsResult, McpError, McpServerEndpoint, Prompt,
    ReadResourceResult, RequestId, Resource, Result, Tool, LATEST_PROTOCOL_VERSION,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, info, warn};

const SESSION_HEADER: &str = "mcp-session-id";
const PROTOCOL_VERSION_HEADER: &str = "mcp-protocol-version";

/// Tool calls may wait on slow upstream services
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Default)]
struct ConnectionState {
    session_id: Option<String>,
    protocol_version: Option<String>,
    server_info: Option<Implementation>,
    instructions: Option<String>,
}

/// Client for a single MCP server endpoint
#[derive(Debug)]
pub struct McpHttpClient {
    http: reqwest::Client,
    endpoint: McpServerEndpoint,
    client_info: Implementation,
    state: Mutex<ConnectionState>,
    next_id: AtomicI64,
}

struct Exchange {
    session_id: Option<String>,
    response: Option<JsonRpcResponse>,
}

impl McpHttpClient {
    /// Create a client (not yet connected)
    pub fn new(endpoint: McpServerEndpoint) -> Result<Self> {
        Self::with_timeout(endpoint, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(endpoint: McpServerEndpoint, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| McpError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            endpoint,
            client_info: Implementation::new("workshop", env!("CARGO_PKG_VERSION")),
            state: Mutex::new(ConnectionState::default()),
            next_id: AtomicI64::new(0),
        })
    }

    pub fn url(&self) -> &str {
        &self.endpoint.url
    }

    pub fn session_id(&self) -> Option<String> {
        self.state().session_id.clone()
    }

    pub fn server_info(&self) -> Option<Implementation> {
        self.state().server_info.clone()
    }

    pub fn instructions(&self) -> Option<String> {
        self.state().instructions.clone()
    }

    pub fn is_initialized(&self) -> bool {
        self.state().protocol_version.is_some()
    }

    /// Perform the initialize handshake
    pub async fn connect(&self) -> Result<InitializeResult> {
        let request = self.make_request(
            "initialize",
            Some(json!({
                "protocolVersion": LATEST_PROTOCOL_VERSION,
                "capabilities": {},
                "clientInfo": self.client_info,
            })),
        );

        let exchange = self.exchange(&request).await?;
        let response = exchange
            .response
            .ok_or_else(|| McpError::Transport("initialize returned no response".to_string()))?;
        let result: InitializeResult = decode(response.into_result()?)?;

        {
            let mut state = self.state();
            state.session_id = exchange.session_id;
            state.protocol_version = Some(result.protocol_version.clone());
            state.server_info = Some(result.server_info.clone());
            state.instructions = result.instructions.clone();
        }

        info!(
            url = %self.endpoint.url,
            server = %result.server_info.name,
            protocol = %result.protocol_version,
            "connected to MCP server"
        );

        self.notify("notifications/initialized", None).await?;
        Ok(result)
    }

    /// List every tool, following pagination cursors
    pub async fn list_tools(&self) -> Result<Vec<Tool>> {
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let params = cursor.as_ref().map(|c| json!({ "cursor": c }));
            let page: ListToolsResult = decode(self.request("tools/list", params).await?)?;
            tools.extend(page.tools);

            match page.next_cursor {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => break,
            }
        }

        Ok(tools)
    }

    pub async fn call_tool(&self, name: &str, arguments: Value) -> Result<CallToolResult> {
        debug!(url = %self.endpoint.url, tool = %name, "calling remote tool");
        decode(
            self.request("tools/call", Some(json!({ "name": name, "arguments": arguments })))
                .await?,
        )
    }

    pub async fn list_resources(&self) -> Result<Vec<Resource>> {
        let result: ListResourcesResult = decode(self.request("resources/list", None).await?)?;
        Ok(result.resources)
    }

    pub async fn read_resource(&self, uri: &str) -> Result<ReadResourceResult> {
        decode(self.request("resources/read", Some(json!({ "uri": uri }))).await?)
    }

    pub async fn list_prompts(&self) -> Result<Vec<Prompt>> {
        let result: ListPromptsResult = decode(self.request("prompts/list", None).await?)?;
        Ok(result.prompts)
    }

    pub async fn get_prompt(&self, name: &str, arguments: HashMap<String, String>) -> Result<GetPromptResult> {
        decode(
            self.request("prompts/get", Some(json!({ "name": name, "arguments": arguments })))
                .await?,
        )
    }

    pub async fn ping(&self) -> Result<()> {
        self.request("ping", None).await?;
        Ok(())
    }

    /// Terminate the session; servers that refuse DELETE are ignored
    pub async fn close(&self) -> Result<()> {
        let session = {
            let mut state = self.state();
            state.protocol_version = None;
            state.session_id.take()
        };
        let Some(session_id) = session else {
            return Ok(());
        };

        let response = self
            .http
            .delete(&self.endpoint.url)
            .headers(self.extra_headers())
            .header(SESSION_HEADER, &session_id)
            .send()
            .await
            .map_err(|e| McpError::Transport(format!("DELETE {} failed: {}", self.endpoint.url, e)))?;

        match response.status() {
            s if s.is_success() => debug!(session = %session_id, "session closed"),
            StatusCode::METHOD_NOT_ALLOWED | StatusCode::NOT_FOUND => {
                debug!(session = %session_id, status = %response.status(), "server did not close session")
            }
            other => warn!(session = %session_id, status = %other, "unexpected status closing session"),
        }
        Ok(())
    }

    /// Send a request and return its result value
    pub async fn request(&self, method: &str, params: Option<Value>) -> Result<Value> {
        let request = self.make_request(method, params);
        let exchange = self.exchange(&request).await?;
        let response = exchange
            .response
            .ok_or_else(|| McpError::Transport(format!("no response to '{}'", method)))?;
        Ok(response.into_result()?)
    }

    /// Send a notification
    pub async fn notify(&self, method: &str, params: Option<Value>) -> Result<()> {
        self.exchange(&JsonRpcRequest::notification(method, params)).await?;
        Ok(())
    }

    fn make_request(&self, method: &str, params: Option<Value>) -> JsonRpcRequest {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        JsonRpcRequest::new(id, method, params)
    }

    fn state(&self) -> MutexGuard<'_, ConnectionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn extra_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (key, value) in &self.endpoint.headers {
            match (HeaderName::from_bytes(key.as_bytes()), HeaderValue::from_str(value)) {
                (Ok(name), Ok(value)) => {
                    headers.insert(name, value);
                }
                _ => warn!(header = %key, "skipping invalid configured header"),
            }
        }
        headers
    }

    async fn exchange(&self, request: &JsonRpcRequest) -> Result<Exchange> {
        let (session_id, protocol_version) = {
            let state = self.state();
            (state.session_id.clone(), state.protocol_version.clone())
        };

        let mut builder = self
            .http
            .post(&self.endpoint.url)
            .headers(self.extra_headers())
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json, text/event-stream")
            .json(request);
        if let Some(id) = &session_id {
            builder = builder.header(SESSION_HEADER, id);
        }
        if let Some(version) = &protocol_version {
            builder = builder.header(PROTOCOL_VERSION_HEADER, version);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| McpError::Transport(format!("POST {} failed: {}", self.endpoint.url, e)))?;

        let status = response.status();
        let returned_session = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/json")
            .to_string();
        let body = response
            .text()
            .await
            .map_err(|e| McpError::Transport(format!("Failed to read response body: {}", e)))?;

        if status == StatusCode::NOT_FOUND && session_id.is_some() {
            return Err(McpError::Transport(format!(
                "session expired on {} (HTTP 404)",
                self.endpoint.url
            )));
        }

        if !status.is_success() {
            // Servers often put a JSON-RPC error in the body of a 4xx
            if let Ok(rpc) = serde_json::from_str::<JsonRpcResponse>(&body) {
                if let Some(err) = rpc.error {
                    return Err(err.into());
                }
            }
            return Err(McpError::Transport(format!("HTTP {}: {}", status, body.trim())));
        }

        let response = match &request.id {
            None => None,
            Some(id) => Some(parse_response(&content_type, &body, id)?),
        };

        Ok(Exchange {
            session_id: returned_session,
            response,
        })
    }
}

/// Parse a JSON body, or pick the matching message out of an SSE body
pub fn parse_response(content_type: &str, body: &str, id: &RequestId) -> Result<JsonRpcResponse> {
    if content_type.starts_with("text/event-stream") {
        for data in sse_data(body) {
            let Ok(message) = serde_json::from_str::<JsonRpcResponse>(&data) else {
                continue;
            };
            let is_reply = message.result.is_some() || message.error.is_some();
            if is_reply && message.id.as_ref() == Some(id) {
                return Ok(message);
            }
        }
        return Err(McpError::Transport(format!(
            "event stream ended without a response to request {}",
            id
        )));
    }

    Ok(serde_json::from_str(body)?)
}

/// Data payloads of each event in an SSE body
fn sse_data(body: &str) -> Vec<String> {
    let mut events = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in body.lines() {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line.is_empty() {
            if !current.is_empty() {
                events.push(current.join("\n"));
                current.clear();
            }
        } else if let Some(data) = line.strip_prefix("data:") {
            current.push(data.strip_prefix(' ').unwrap_or(data));
        }
    }
    if !current.is_empty() {
        events.push(current.join("\n"));
    }
    events
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| McpError::Protocol {
        code: shared::error_codes::INTERNAL_ERROR,
        message: format!("unexpected result shape: {}", e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn init_result() -> Value {
        json!({
            "jsonrpc": "2.0",
            "id": 0,
            "result": {
                "protocolVersion": "2025-06-18",
                "capabilities": {"tools": {"listChanged": false}},
                "serverInfo": {"name": "mock-weather", "version": "1.0.0"}
            }
        })
    }

    async fn mount_handshake(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/mcp"))
            .and(body_partial_json(json!({"method": "initialize"})))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("mcp-session-id", "session-123")
                    .set_body_json(init_result()),
            )
            .mount(server)
            .await;

        Mock::given(method("POST"))
            .and(path("/mcp"))
            .and(body_partial_json(json!({"method": "notifications/initialized"})))
            .and(header("mcp-session-id", "session-123"))
            .respond_with(ResponseTemplate::new(202))
            .mount(server)
            .await;
    }

    fn client_for(server: &MockServer) -> McpHttpClient {
        McpHttpClient::new(McpServerEndpoint::new(format!("{}/mcp", server.uri()))).unwrap()
    }

    // ============== SSE Parsing Tests ==============

    #[test]
    fn test_sse_data_multiple_events() {
        let body = "event: message\ndata: {\"a\":1}\n\nevent: message\ndata: {\"b\":2}\n\n";
        assert_eq!(sse_data(body), vec!["{\"a\":1}", "{\"b\":2}"]);
    }

    #[test]
    fn test_sse_data_multiline_and_crlf() {
        let body = "data: {\"a\":\r\ndata: 1}\r\n\r\n";
        assert_eq!(sse_data(body), vec!["{\"a\":\n1}"]);
    }

    #[test]
    fn test_parse_response_sse_skips_other_ids() {
        let body = concat!(
            "data: {\"jsonrpc\":\"2.0\",\"method\":\"notifications/progress\",\"params\":{}}\n\n",
            "data: {\"jsonrpc\":\"2.0\",\"id\":3,\"result\":{\"x\":0}}\n\n",
            "data: {\"jsonrpc\":\"2.0\",\"id\":4,\"result\":{\"x\":1}}\n\n"
        );
        let response = parse_response("text/event-stream", body, &RequestId::Number(4)).unwrap();
        assert_eq!(response.result.unwrap()["x"], 1);
    }

    #[test]
    fn test_parse_response_sse_missing_reply() {
        let body = "data: {\"jsonrpc\":\"2.0\",\"id\":9,\"result\":{}}\n\n";
        assert!(parse_response("text/event-stream", body, &RequestId::Number(1)).is_err());
    }

    #[test]
    fn test_parse_response_json() {
        let body = r#"{"jsonrpc":"2.0","id":1,"result":{"tools":[]}}"#;
        let response = parse_response("application/json", body, &RequestId::Number(1)).unwrap();
        assert!(response.result.is_some());
    }

    // ============== Handshake Tests ==============

    #[tokio::test]
    async fn test_connect_stores_session() {
        let server = MockServer::start().await;
        mount_handshake(&server).await;

        let client = client_for(&server);
        assert!(!client.is_initialized());

        let result = client.connect().await.unwrap();
        assert_eq!(result.server_info.name, "mock-weather");
        assert_eq!(client.session_id().as_deref(), Some("session-123"));
        assert!(client.is_initialized());
    }

    #[tokio::test]
    async fn test_connect_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.connect().await.unwrap_err();
        assert!(matches!(err, McpError::Transport(_)));
        assert!(err.to_string().contains("500"));
    }

    #[tokio::test]
    async fn test_connect_unreachable_server() {
        let client = McpHttpClient::new(McpServerEndpoint::new("http://127.0.0.1:1/mcp")).unwrap();
        assert!(matches!(client.connect().await, Err(McpError::Transport(_))));
    }

    // ============== Request Tests ==============

    #[tokio::test]
    async fn test_list_tools_sse_response() {
        let server = MockServer::start().await;
        mount_handshake(&server).await;

        let sse = "event: message\ndata: {\"jsonrpc\":\"2.0\",\"id\":1,\"result\":{\"tools\":[{\"name\":\"get_forecast\",\"inputSchema\":{\"type\":\"object\"}}]}}\n\n";
        Mock::given(method("POST"))
            .and(body_partial_json(json!({"method": "tools/list"})))
            .and(header("mcp-session-id", "session-123"))
            .and(header("mcp-protocol-version", "2025-06-18"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(sse, "text/event-stream"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        client.connect().await.unwrap();
        let tools = client.list_tools().await.unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, "get_forecast");
    }

    #[tokio::test]
    async fn test_list_tools_follows_cursor() {
        let server = MockServer::start().await;
        mount_handshake(&server).await;

        Mock::given(method("POST"))
            .and(body_partial_json(json!({"method": "tools/list", "params": {"cursor": "page2"}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0", "id": 2,
                "result": {"tools": [{"name": "b"}]}
            })))
            .with_priority(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(body_partial_json(json!({"method": "tools/list"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0", "id": 1,
                "result": {"tools": [{"name": "a"}], "nextCursor": "page2"}
            })))
            .with_priority(2)
            .mount(&server)
            .await;

        let client = client_for(&server);
        client.connect().await.unwrap();
        let names: Vec<String> = client.list_tools().await.unwrap().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_rpc_error_is_protocol_error() {
        let server = MockServer::start().await;
        mount_handshake(&server).await;

        Mock::given(method("POST"))
            .and(body_partial_json(json!({"method": "tools/call"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0", "id": 1,
                "error": {"code": -32602, "message": "Unknown tool: nope"}
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        client.connect().await.unwrap();
        let err = client.call_tool("nope", json!({})).await.unwrap_err();
        match err {
            McpError::Protocol { code, message } => {
                assert_eq!(code, -32602);
                assert!(message.contains("nope"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_expired_session() {
        let server = MockServer::start().await;
        mount_handshake(&server).await;

        Mock::given(method("POST"))
            .and(body_partial_json(json!({"method": "ping"})))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = client_for(&server);
        client.connect().await.unwrap();
        let err = client.ping().await.unwrap_err();
        assert!(err.to_string().contains("session expired"));
    }

    #[tokio::test]
    async fn test_configured_headers_are_sent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("authorization", "Bearer secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(init_result()))
            .mount(&server)
            .await;

        let mut endpoint = McpServerEndpoint::new(format!("{}/mcp", server.uri()));
        endpoint
            .headers
            .insert("Authorization".to_string(), "Bearer secret".to_string());
        let client = McpHttpClient::new(endpoint).unwrap();

        client.connect().await.unwrap();
        assert!(client.session_id().is_none());
    }

    // ============== Close Tests ==============

    #[tokio::test]
    async fn test_close_sends_delete() {
        let server = MockServer::start().await;
        mount_handshake(&server).await;

        Mock::given(method("DELETE"))
            .and(header("mcp-session-id", "session-123"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        client.connect().await.unwrap();
        client.close().await.unwrap();
        assert!(client.session_id().is_none());
        assert!(!client.is_initialized());

        // Second close is a no-op
        client.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_close_tolerates_method_not_allowed() {
        let server = MockServer::start().await;
        mount_handshake(&server).await;
        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(405))
            .mount(&server)
            .await;

        let client = client_for(&server);
        client.connect().await.unwrap();
        assert!(client.close().await.is_ok());
    }
}
